//! Streaming request decoder.
//!
//! Alternates between two phases: a [`HeaderDecoder`] pass that yields the
//! request head, then a [`PayloadDecoder`] pass that yields the body chunks
//! and always finishes with [`PayloadItem::Eof`], even for requests without a
//! body. The connection relies on that terminating `Eof` to know where the
//! next request starts.

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Decodes a stream of pipelined HTTP/1.x requests.
///
/// While `payload_decoder` is `None` the decoder is between requests and
/// looks for a header; otherwise it is inside a request body.
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, payload_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some((header, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn expect_header(message: Option<Message<(RequestHeader, PayloadSize)>>) -> (RequestHeader, PayloadSize) {
        match message {
            Some(Message::Header(header)) => header,
            _ => panic!("expected a request header"),
        }
    }

    #[test]
    fn bodyless_request_still_ends_with_eof() {
        let mut buf = BytesMut::from("GET /version HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let mut decoder = RequestDecoder::new();

        let (header, payload_size) = expect_header(decoder.decode(&mut buf).unwrap());
        assert_eq!(header.uri().path(), "/version");
        assert!(payload_size.is_empty());

        let eof = decoder.decode(&mut buf).unwrap();
        assert!(matches!(eof, Some(Message::Payload(PayloadItem::Eof))));
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn pipelined_requests_with_body() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Content-Length: 4

        abcdGET /next HTTP/1.1

        "##};
        let mut buf = BytesMut::from(str);
        let mut decoder = RequestDecoder::new();

        let (_, payload_size) = expect_header(decoder.decode(&mut buf).unwrap());
        assert_eq!(payload_size, PayloadSize::Length(4));

        match decoder.decode(&mut buf).unwrap() {
            Some(Message::Payload(chunk)) => assert_eq!(chunk.as_bytes().unwrap().as_ref(), b"abcd"),
            _ => panic!("expected a body chunk"),
        }
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Payload(PayloadItem::Eof))));

        let (header, _) = expect_header(decoder.decode(&mut buf).unwrap());
        assert_eq!(header.uri().path(), "/next");
    }
}
