//! Response header encoder.
//!
//! Writes the status line and header fields, and sets `Content-Length` or
//! `Transfer-Encoding: chunked` from the [`PayloadSize`] so handlers never
//! have to frame the body themselves.

use crate::protocol::{PayloadSize, ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

const CHUNKED: HeaderValue = HeaderValue::from_static("chunked");
const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");

/// Encoder for HTTP response heads.
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// # Errors
    ///
    /// Fails if the response version is not HTTP/1.1 or the buffer can't be written.
    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        match head.version() {
            Version::HTTP_11 => {
                write!(
                    FastWrite(dst),
                    "HTTP/1.1 {} {}\r\n",
                    head.status().as_str(),
                    head.status().canonical_reason().unwrap_or("Unknown")
                )?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        let headers = head.headers_mut();
        match payload_size {
            PayloadSize::Length(n) => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Chunked => {
                headers.remove(header::CONTENT_LENGTH);
                headers.insert(header::TRANSFER_ENCODING, CHUNKED);
            }
            PayloadSize::Empty => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, ZERO_VALUE);
            }
            PayloadSize::UntilClose => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.remove(header::CONTENT_LENGTH);
            }
        }

        for (header_name, header_value) in head.headers() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` adapter over `BytesMut`, so `write!` can format straight into the buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
