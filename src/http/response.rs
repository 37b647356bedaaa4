use std::collections::HashMap;

/// Content type sent with every successful response. It is not derived
/// from the file extension.
pub const CONTENT_TYPE_HTML: &str = "text/html";

/// HTTP status codes the server produces.
///
/// - `Ok` (200): file found and returned
/// - `BadRequest` (400): malformed request head
/// - `Forbidden` (403): path escapes the document root
/// - `NotFound` (404): no regular file at the resolved path
/// - `MethodNotAllowed` (405): anything but GET
/// - `RequestTimeout` (408): client stalled before finishing the head
/// - `RequestHeaderFieldsTooLarge` (431): header section over the cap
/// - `InternalServerError` (500): file vanished or became unreadable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 408 Request Timeout
    RequestTimeout,
    /// 431 Request Header Fields Too Large
    RequestHeaderFieldsTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::RequestTimeout => 408,
            StatusCode::RequestHeaderFieldsTooLarge => 431,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers as key-value pairs
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/html")
///     .body(b"<h1>hi</h1>".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Adds `Content-Length` from the body size unless already present.
    pub fn build(mut self) -> Response {
        self.headers
            .entry("Content-Length".to_string())
            .or_insert_with(|| self.body.len().to_string());

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// 200 OK carrying file contents as `text/html`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", CONTENT_TYPE_HTML)
            .body(body.into())
            .build()
    }

    /// A status line with no body.
    pub fn empty(status: StatusCode) -> Self {
        ResponseBuilder::new(status).build()
    }

    pub fn bad_request() -> Self {
        Self::empty(StatusCode::BadRequest)
    }

    pub fn forbidden() -> Self {
        Self::empty(StatusCode::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::empty(StatusCode::NotFound)
    }

    /// 405 advertising GET as the only served method.
    pub fn method_not_allowed() -> Self {
        ResponseBuilder::new(StatusCode::MethodNotAllowed)
            .header("Allow", "GET")
            .build()
    }

    pub fn internal_error() -> Self {
        Self::empty(StatusCode::InternalServerError)
    }
}
