use std::collections::HashMap;
use std::fmt;

/// HTTP request methods.
///
/// Only the two methods an HTTP/1.0 file server is expected to see are
/// recognized. `GET` is served; `POST` parses but is answered with
/// 405 Method Not Allowed since request bodies are not handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Submit data
    POST,
}

/// A parsed HTTP/1.0 request head.
///
/// Built once per connection from the buffered header section and never
/// mutated afterwards. `path` is the raw request target exactly as sent;
/// decoding and sandboxing happen in the resolver.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method
    pub method: Method,
    /// Raw request target (e.g. "/index.html")
    pub path: String,
    /// Protocol version token (typically "HTTP/1.0")
    pub version: String,
    /// Header map; a repeated key keeps the last value seen
    pub headers: HashMap<String, String>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: HashMap<String, String>,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Matching is case-sensitive, as methods are on the wire.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// assert_eq!(Method::from_str("DELETE"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: None,
            headers: HashMap::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.0".to_string()),
            headers: self.headers,
        })
    }
}

impl Request {
    /// Retrieves a header value by its exact name.
    ///
    /// Returns `None` when the client did not send the header.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(key)
            .map(|v| v.as_str())
    }
}
