//! Decoder for request payloads framed by `Content-Length`.

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Hands out at most `length` bytes, then reports [`PayloadItem::Eof`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// The number of bytes remaining to be read from the payload
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.length, src.len() as u64);
        #[allow(clippy::cast_possible_truncation, reason = "len never exceeds src.len()")]
        let bytes = src.split_to(len as usize).freeze();

        self.length -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_content_length() {
        let mut buffer: BytesMut = BytesMut::from(&b"hello worldGET / HTTP/1.1\r\n\r\n"[..]);

        let mut length_decoder = LengthDecoder::new(11);

        let payload = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(payload.as_bytes().unwrap().as_ref(), b"hello world");

        let eof = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());

        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn waits_for_partial_payload() {
        let mut buffer = BytesMut::from(&b"hel"[..]);
        let mut length_decoder = LengthDecoder::new(5);

        let first = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(first.as_bytes().unwrap().as_ref(), b"hel");
        assert!(length_decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"lo");
        let second = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(second.as_bytes().unwrap().as_ref(), b"lo");
        assert!(length_decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }
}
