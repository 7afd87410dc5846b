//! HTTP request header handling implementation.
//!
//! Requests reach handlers without a body: the connection drains any payload
//! before dispatching, so the header is all a handler ever sees.

use http::header::CONNECTION;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// Represents an HTTP request header.
///
/// Wraps a `http::Request<()>` and adds the connection-level questions the
/// server asks about a request (does it carry a body, may the connection be
/// reused afterwards).
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Determines if this request may carry a body based on its HTTP method.
    ///
    /// Returns false for GET, HEAD, DELETE, OPTIONS and CONNECT.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }

    /// Whether the client allows the connection to be reused after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` is sent,
    /// HTTP/1.0 defaults to close unless `Connection: keep-alive` is sent.
    pub fn keep_alive(&self) -> bool {
        let connection = self.headers().get(CONNECTION).map(|value| value.as_bytes());
        let has_token = |token: &[u8]| {
            connection.is_some_and(|value| value.split(|b| *b == b',').any(|t| t.trim_ascii().eq_ignore_ascii_case(token)))
        };

        match self.version() {
            Version::HTTP_11 => !has_token(b"close"),
            _ => has_token(b"keep-alive"),
        }
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: Version, connection: Option<&str>) -> RequestHeader {
        let mut builder = Request::builder().method(Method::GET).uri("/").version(version);
        if let Some(value) = connection {
            builder = builder.header(CONNECTION, value);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn http11_defaults_to_keep_alive() {
        assert!(header(Version::HTTP_11, None).keep_alive());
        assert!(header(Version::HTTP_11, Some("keep-alive")).keep_alive());
        assert!(!header(Version::HTTP_11, Some("close")).keep_alive());
        assert!(!header(Version::HTTP_11, Some("Upgrade, Close")).keep_alive());
    }

    #[test]
    fn http10_defaults_to_close() {
        assert!(!header(Version::HTTP_10, None).keep_alive());
        assert!(header(Version::HTTP_10, Some("Keep-Alive")).keep_alive());
    }

    #[test]
    fn only_body_methods_need_body() {
        let get: RequestHeader = Request::builder().method(Method::GET).body(()).unwrap().into();
        let post: RequestHeader = Request::builder().method(Method::POST).body(()).unwrap().into();
        assert!(!get.need_body());
        assert!(post.need_body());
    }
}
