use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BufMut, BytesMut};

use tokio_util::codec::Encoder;

/// Encodes the payload of one response, in the framing its head announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// content-length payload
    Length(LengthEncoder),

    /// transfer-encoding chunked payload
    Chunked(ChunkedEncoder),

    /// have no body with the response
    NoBody,

    /// raw bytes, the end of the payload is the end of the connection
    UntilClose,
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::new()) }
    }

    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    pub fn is_finish(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finish(),
            Kind::Chunked(encoder) => encoder.is_finish(),
            Kind::NoBody => true,
            Kind::UntilClose => false,
        }
    }
}

impl From<PayloadSize> for PayloadEncoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => PayloadEncoder::fix_length(size),
            PayloadSize::Chunked => PayloadEncoder::chunked(),
            PayloadSize::Empty => PayloadEncoder::empty(),
            PayloadSize::UntilClose => PayloadEncoder::until_close(),
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
            Kind::NoBody => Ok(()),
            Kind::UntilClose => {
                if let PayloadItem::Chunk(bytes) = item {
                    dst.put(bytes);
                }
                Ok(())
            }
        }
    }
}
