//! Request handlers.
//!
//! Routes are bound to a [`RouteHandler`], a closed set of the handlers the
//! server ships with plus a [`RouteHandler::Custom`] variant for anything
//! implementing [`RequestHandler`]. Async functions become handlers through
//! [`handler_fn`].

mod builtin;
mod static_asset;

pub use builtin::{StaticStringHandler, VersionHandler};
pub use static_asset::{PrefixStrip, StaticAssetHandler, StaticAssetHandlerBuilder};

use std::sync::Arc;

use async_trait::async_trait;
use http::Response;

use crate::body::ResponseBody;
use crate::error::HandlerError;
use crate::responder::Responder;
use crate::RequestContext;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &RequestContext) -> Result<Response<ResponseBody>, HandlerError>;
}

/// A handler bound to a route.
#[derive(Clone)]
pub enum RouteHandler {
    /// A fixed body, see [`StaticStringHandler`].
    Text(StaticStringHandler),
    /// The host application's version as plain text.
    Version(VersionHandler),
    /// Assets from an [`AssetSource`](crate::asset::AssetSource). Cloning
    /// shares the handler, so one pinned asset can back several routes.
    Asset(Arc<StaticAssetHandler>),
    /// `404 Not Found` with a small HTML body.
    NotFound,
    /// `501 Not Implemented` with a small HTML body.
    NotImplemented,
    Custom(Arc<dyn RequestHandler>),
}

impl RouteHandler {
    pub fn custom(handler: impl RequestHandler + 'static) -> Self {
        Self::Custom(Arc::new(handler))
    }

    pub async fn invoke(&self, req: &RequestContext) -> Result<Response<ResponseBody>, HandlerError> {
        match self {
            RouteHandler::Text(handler) => Ok(handler.response()),
            RouteHandler::Version(handler) => Ok(handler.response()),
            RouteHandler::Asset(handler) => handler.get(req).await,
            RouteHandler::NotFound => Ok(builtin::not_found()),
            RouteHandler::NotImplemented => Ok(builtin::not_implemented()),
            RouteHandler::Custom(handler) => handler.invoke(req).await,
        }
    }

    pub fn as_asset(&self) -> Option<&StaticAssetHandler> {
        match self {
            RouteHandler::Asset(handler) => Some(handler),
            _ => None,
        }
    }
}

impl std::fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteHandler::Text(handler) => f.debug_tuple("Text").field(handler).finish(),
            RouteHandler::Version(handler) => f.debug_tuple("Version").field(handler).finish(),
            RouteHandler::Asset(handler) => f.debug_tuple("Asset").field(handler).finish(),
            RouteHandler::NotFound => f.write_str("NotFound"),
            RouteHandler::NotImplemented => f.write_str("NotImplemented"),
            RouteHandler::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl From<StaticStringHandler> for RouteHandler {
    fn from(handler: StaticStringHandler) -> Self {
        RouteHandler::Text(handler)
    }
}

impl From<VersionHandler> for RouteHandler {
    fn from(handler: VersionHandler) -> Self {
        RouteHandler::Version(handler)
    }
}

impl From<StaticAssetHandler> for RouteHandler {
    fn from(handler: StaticAssetHandler) -> Self {
        RouteHandler::Asset(Arc::new(handler))
    }
}

impl From<Arc<StaticAssetHandler>> for RouteHandler {
    fn from(handler: Arc<StaticAssetHandler>) -> Self {
        RouteHandler::Asset(handler)
    }
}

impl<F> From<FnHandler<F>> for RouteHandler
where
    FnHandler<F>: RequestHandler + 'static,
{
    fn from(handler: FnHandler<F>) -> Self {
        RouteHandler::custom(handler)
    }
}

/// An async function used as a [`RequestHandler`], see [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Turns an async function into a handler.
///
/// The function gets its own copy of the request context and returns
/// anything that implements [`Responder`]; an `Err` is answered with `500`.
///
/// ```
/// use pocket_web::router::{get, Router};
/// use pocket_web::{handler_fn, HandlerError, RequestContext};
///
/// async fn hello(req: RequestContext) -> Result<String, HandlerError> {
///     Ok(format!("hello {}", req.path_params().get("name").unwrap_or("world")))
/// }
///
/// let router = Router::builder().route("/hello/:name", get(handler_fn(hello))).build().unwrap();
/// ```
pub fn handler_fn<F, Fut, R, E>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: Responder,
    E: Into<HandlerError>,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut, R, E> RequestHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder + Send,
    E: Into<HandlerError> + Send,
{
    async fn invoke(&self, req: &RequestContext) -> Result<Response<ResponseBody>, HandlerError> {
        let responder = (self.f)(req.clone()).await.map_err(Into::into)?;
        Ok(responder.response_to(req))
    }
}
