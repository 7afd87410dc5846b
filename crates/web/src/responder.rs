//! Conversion of handler return values into responses.
//!
//! [`handler_fn`](crate::handler_fn) functions return any [`Responder`]:
//! strings become `200 text/plain` responses, a `(StatusCode, T)` pair
//! overrides the status, and a prebuilt `Response` passes through.

use bytes::Bytes;
use http::{Response, StatusCode};

use crate::body::ResponseBody;
use crate::{RequestContext, response};

pub trait Responder {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody>;
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

impl Responder for () {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        response::empty(StatusCode::OK)
    }
}

impl Responder for &'static str {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        response::fixed_length(StatusCode::OK, &mime::TEXT_PLAIN_UTF_8, self)
    }
}

impl Responder for String {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        response::fixed_length(StatusCode::OK, &mime::TEXT_PLAIN_UTF_8, self)
    }
}

impl Responder for Bytes {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        response::fixed_length(StatusCode::OK, &mime::APPLICATION_OCTET_STREAM, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;
    use http::header::CONTENT_TYPE;
    use http_body::Body;
    use pocket_http::protocol::RequestHeader;

    fn context() -> RequestContext {
        let header: RequestHeader = Request::builder().uri("/").body(()).unwrap().into();
        RequestContext::new(header, "/")
    }

    #[test]
    fn string_is_plain_text() {
        let response = "hi".to_owned().response_to(&context());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
        assert_eq!(response.body().size_hint().exact(), Some(2));
    }

    #[test]
    fn status_pair_overrides_status() {
        let response = (StatusCode::CREATED, "made").response_to(&context());
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
