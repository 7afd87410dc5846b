//! Serves a directory the way an application would embed the server.
//!
//! ```text
//! cargo run --example asset_server -- ./public 8080 server.json
//! ```
//!
//! `./public/index.html` is served at `/` and `/index.html`, everything under
//! `./public` at `/assets/...` (with directory listings), and the crate
//! version at `/version`. The optional JSON file holds a `ServerConfig`.

use std::error::Error;
use std::sync::Arc;

use pocket_web::asset::{AssetSource, FsAssetSource};
use pocket_web::router::get;
use pocket_web::{Router, Server, ServerConfig, StaticAssetHandler, VersionHandler, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| "./public".to_owned());
    let port = args.next().map_or(Ok(8080), |port| port.parse::<u32>())?;
    let config = match args.next() {
        Some(path) => serde_json::from_str::<ServerConfig>(&std::fs::read_to_string(path)?)?,
        None => ServerConfig::default(),
    };

    logging::init(std::env::var_os("POCKET_DEBUG").is_some());

    let assets: Arc<dyn AssetSource> = Arc::new(FsAssetSource::new(root));
    let index = Arc::new(StaticAssetHandler::pinned(Arc::clone(&assets), "index.html").build());

    let router = Router::builder()
        .route("/", get(Arc::clone(&index)))
        .route("/index.html", get(index))
        .route("/assets/*", get(StaticAssetHandler::prefixed(assets).directory_listing(true).build()))
        .route("/version", get(VersionHandler::new(env!("CARGO_PKG_VERSION"))))
        .build()?;

    let server = Server::builder().router(router).config(config).build()?;
    let addr = server.start(port).await?;
    info!(%addr, "serving, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    Ok(())
}
