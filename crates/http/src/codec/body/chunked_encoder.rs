use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Write;

use tokio_util::codec::Encoder;

/// Frames payload chunks with `Transfer-Encoding: chunked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                // a zero sized chunk would terminate the body early
                if !bytes.has_remaining() {
                    return Ok(());
                }
                write!(helper::Writer(dst), "{:X}\r\n", bytes.remaining())?;
                dst.reserve(bytes.remaining() + 2);
                dst.put(bytes);
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn frames_chunks_and_terminator() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello world, chunked")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert!(encoder.is_finish());
        assert_eq!(&dst[..], b"14\r\nhello world, chunked\r\n0\r\n\r\n");
    }
}
