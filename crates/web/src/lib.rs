//! An embeddable HTTP/1.1 server for serving an application's assets.
//!
//! `pocket-web` sits on top of [`pocket_http`] and adds what a host
//! application needs to publish a handful of pages and files:
//!
//! - pattern routing with `:name` parameters and a trailing `*` wildcard, see [`router`]
//! - a static asset handler that either serves one pinned asset or maps the
//!   rest of the path onto an [`asset::AssetSource`], with optional directory listings
//! - small built-in handlers for fixed text and the application version
//! - a [`Server`] that can be started, stopped and restarted on any port
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pocket_web::asset::{AssetSource, FsAssetSource};
//! use pocket_web::router::{get, Router};
//! use pocket_web::{Server, StaticAssetHandler, VersionHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let assets: Arc<dyn AssetSource> = Arc::new(FsAssetSource::new("./public"));
//!     let index = Arc::new(StaticAssetHandler::pinned(Arc::clone(&assets), "index.html").build());
//!
//!     let router = Router::builder()
//!         .route("/", get(Arc::clone(&index)))
//!         .route("/index.html", get(index))
//!         .route("/assets/*", get(StaticAssetHandler::prefixed(assets).directory_listing(true).build()))
//!         .route("/version", get(VersionHandler::new(env!("CARGO_PKG_VERSION"))))
//!         .build()?;
//!
//!     let server = Server::builder().router(router).build()?;
//!     server.start(8080).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod debug;
pub mod logging;
pub mod response;
pub mod router;

mod body;
mod config;
mod date;
mod error;
mod handler;
mod request;
mod responder;
mod server;

pub use body::{ASSET_CHUNK_SIZE, ResponseBody};
pub use config::ServerConfig;
pub use error::{HandlerError, RouterError, ServerError};
pub use handler::{
    FnHandler, PrefixStrip, RequestHandler, RouteHandler, StaticAssetHandler, StaticAssetHandlerBuilder,
    StaticStringHandler, VersionHandler, handler_fn,
};
pub use request::{PathParams, QueryParams, RequestContext};
pub use responder::Responder;
pub use router::Router;
pub use server::{Server, ServerBuilder, ServerState};
