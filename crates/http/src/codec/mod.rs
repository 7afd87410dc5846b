//! Codecs for the HTTP/1.x wire format.
//!
//! - [`RequestDecoder`]: request head via `httparse`, then a
//!   `Content-Length` framed body
//! - [`ResponseEncoder`]: status line and headers, then a fixed-length or
//!   chunked body
//!
//! Both are plugged into `tokio_util::codec::{FramedRead, FramedWrite}` by
//! [`HttpConnection`](crate::connection::HttpConnection).

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
