use std::sync::Arc;

use bytes::Bytes;
use http::{Response, StatusCode};
use mime::Mime;

use crate::body::ResponseBody;
use crate::response;

const NOT_FOUND_BODY: &str = "<html><body><h3>Error 404: the requested page doesn't exist.</h3></body></html>";
const NOT_IMPLEMENTED_BODY: &str =
    "<html><body><h3>Error 501: the uri is mapped, but not for this method. Status: Not implemented!</h3></body></html>";

/// Always answers with the same status, content type and body.
#[derive(Debug, Clone)]
pub struct StaticStringHandler {
    status: StatusCode,
    content_type: Mime,
    body: Bytes,
}

impl StaticStringHandler {
    pub fn new(status: StatusCode, content_type: Mime, body: impl Into<Bytes>) -> Self {
        Self { status, content_type, body: body.into() }
    }

    /// `200 OK` with a `text/plain` body.
    pub fn text(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, mime::TEXT_PLAIN_UTF_8, body)
    }

    /// `200 OK` with a `text/html` body.
    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, mime::TEXT_HTML_UTF_8, body)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn response(&self) -> Response<ResponseBody> {
        response::fixed_length(self.status, &self.content_type, self.body.clone())
    }
}

/// Answers with the host application's version string.
#[derive(Debug, Clone)]
pub struct VersionHandler {
    version: Arc<str>,
}

impl VersionHandler {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: Arc::from(version.into()) }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn response(&self) -> Response<ResponseBody> {
        response::fixed_length(StatusCode::OK, &mime::TEXT_PLAIN, Bytes::copy_from_slice(self.version.as_bytes()))
    }
}

pub(crate) fn not_found() -> Response<ResponseBody> {
    response::fixed_length(StatusCode::NOT_FOUND, &mime::TEXT_HTML, NOT_FOUND_BODY)
}

pub(crate) fn not_implemented() -> Response<ResponseBody> {
    response::fixed_length(StatusCode::NOT_IMPLEMENTED, &mime::TEXT_HTML, NOT_IMPLEMENTED_BODY)
}
