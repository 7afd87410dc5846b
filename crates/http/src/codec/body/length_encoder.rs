use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

/// Copies payload chunks through until `length` bytes have been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }

                let remaining = bytes.remaining() as u64;
                if remaining > self.length {
                    warn!(remaining, expected = self.length, "body is longer than its declared length");
                    return Err(SendError::invalid_body("body is longer than its declared length"));
                }

                dst.put(bytes);
                self.length -= remaining;
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                if self.length != 0 {
                    return Err(SendError::invalid_body(format!("body ended {} bytes short of its declared length", self.length)));
                }
                Ok(())
            }
        }
    }
}
