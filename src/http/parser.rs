use crate::http::request::{Method, Request};
use std::collections::HashMap;
use std::fmt;

/// Sequence that ends the request header section.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The header terminator has not arrived yet
    Incomplete,
    /// Malformed request line, unknown method or unparseable header
    InvalidRequest,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Incomplete => f.write_str("incomplete request"),
            ParseError::InvalidRequest => f.write_str("invalid request"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse the header section at the start of `buf`.
///
/// Anything after the terminator is ignored; this server accepts no request
/// bodies.
pub fn parse_http_request(buf: &[u8]) -> Result<Request, ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;

    let head = std::str::from_utf8(&buf[..headers_end])
        .map_err(|_| ParseError::InvalidRequest)?;

    // Empty entries are artifacts of the terminator or stray blank lines
    let mut lines = head.split("\r\n").filter(|line| !line.is_empty());

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidRequest)?;

    // Headers
    let mut headers = HashMap::new();

    for line in lines {
        let (key, value) = line
            .split_once(": ")
            .ok_or(ParseError::InvalidRequest)?;

        if key.is_empty() {
            return Err(ParseError::InvalidRequest);
        }

        headers.insert(key.to_string(), value.to_string());
    }

    Ok(Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
    })
}

/// Length of the header section, terminator included, once it has been
/// fully received.
pub fn header_section_len(buf: &[u8]) -> Option<usize> {
    find_headers_end(buf).map(|end| end + HEADER_TERMINATOR.len())
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.0\r\nHost: example.com\r\n\r\n";

        let parsed = parse_http_request(req).unwrap();

        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.headers.get("Host").unwrap(), "example.com");
        assert_eq!(header_section_len(req), Some(req.len()));
    }

    #[test]
    fn section_len_waits_for_terminator() {
        assert_eq!(header_section_len(b"GET / HTTP/1.0\r\n"), None);
        assert_eq!(header_section_len(b"\r\n\r\nleftover"), Some(4));
    }
}
