//! Per-connection request loop.
//!
//! [`HttpConnection`] reads requests off one socket, hands each to a
//! [`Handler`](crate::handler::Handler) and writes the response back, until
//! the peer closes, a request asks for `Connection: close`, something fails,
//! or the owner cancels the connection while it is idle.

mod http_connection;

pub use http_connection::HttpConnection;
