//! The HTTP/1.x wire layer of `pocket`.
//!
//! This crate knows how to read requests off a socket and write responses
//! back; routing, assets and server lifecycle live in `pocket-web`.
//!
//! # Example
//!
//! ```no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use pocket_http::connection::HttpConnection;
//! use pocket_http::handler::make_handler;
//! use tokio::net::TcpListener;
//! use tokio_util::sync::CancellationToken;
//! use tracing::{error, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!     let shutdown = CancellationToken::new();
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = Arc::clone(&handler);
//!         let shutdown = shutdown.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if let Err(e) = HttpConnection::new(reader, writer).process(handler, shutdown).await {
//!                 error!(cause = %e, "connection ended with error");
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(_request: Request<()>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     Ok(Response::new(Full::new(Bytes::from_static(b"Hello World!\r\n"))))
//! }
//! ```
//!
//! # Modules
//!
//! - [`connection`]: the per-connection request loop
//! - [`codec`]: request decoding and response encoding
//! - [`handler`]: the [`handler::Handler`] trait the application implements
//! - [`protocol`]: message, payload and error types
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - request bodies must use `Content-Length`; they are drained, never exposed
//! - maximum header size: 8KB
//! - maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
