//! Constructors for the responses the built-in handlers send.
//!
//! A fixed-length response carries its whole body in memory and is sent with
//! `Content-Length`; a chunked response streams its body with
//! `Transfer-Encoding: chunked`. The framing headers themselves are written
//! by the encoder, these helpers only pick the body kind.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use mime::Mime;

use crate::body::ResponseBody;

pub fn fixed_length(status: StatusCode, content_type: &Mime, body: impl Into<Bytes>) -> Response<ResponseBody> {
    with_content_type(status, content_type, ResponseBody::once(body.into()))
}

/// `body` should be a streaming [`ResponseBody`], a `once` body is still
/// sent with `Content-Length`.
pub fn chunked(status: StatusCode, content_type: &Mime, body: ResponseBody) -> Response<ResponseBody> {
    with_content_type(status, content_type, body)
}

pub fn empty(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::empty());
    *response.status_mut() = status;
    response
}

fn with_content_type(status: StatusCode, content_type: &Mime, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}
