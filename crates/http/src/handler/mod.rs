//! The seam between the connection driver and the application.
//!
//! The connection drains any request payload before dispatching, so a
//! [`Handler`] receives a body-less `Request<()>`.

use std::error::Error;

use async_trait::async_trait;
use http::{Request, Response};
use http_body::Body;

#[async_trait]
pub trait Handler: Send + Sync {
    type RespBody: Body + Send;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, req: Request<()>) -> Result<Response<Self::RespBody>, Self::Error>;
}

/// A [`Handler`] backed by an async function, see [`make_handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<RespBody, Err, F, Fut> Handler for HandlerFn<F>
where
    RespBody: Body + Send,
    F: Fn(Request<()>) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    type RespBody = RespBody;
    type Error = Err;

    async fn call(&self, req: Request<()>) -> Result<Response<Self::RespBody>, Self::Error> {
        (self.f)(req).await
    }
}

pub fn make_handler<F, RespBody, Err, Ret>(f: F) -> HandlerFn<F>
where
    RespBody: Body,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Ret: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<()>) -> Ret,
{
    HandlerFn { f }
}
