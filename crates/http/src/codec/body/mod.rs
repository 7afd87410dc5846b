//! Payload framing.
//!
//! Request payloads are only ever framed by `Content-Length` (or absent);
//! response payloads are either fixed length or chunked.

mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
