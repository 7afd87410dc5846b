//! Request header decoder.
//!
//! Parses the request line and header fields with `httparse` and decides how
//! the request payload is framed.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - HTTP/1.0 and HTTP/1.1 only
//! - Request bodies must be framed by `Content-Length`; any
//!   `Transfer-Encoding` on a request is reported as unsupported

use std::mem::MaybeUninit;

use bytes::{Buf, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for HTTP request headers.
///
/// Produces a [`RequestHeader`] and the [`PayloadSize`] of the body that
/// follows it. The header bytes are consumed from the buffer; body bytes are
/// left for the payload decoder.
#[derive(Debug)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers: [MaybeUninit<httparse::Header<'_>>; MAX_HEADER_NUM] = [const { MaybeUninit::uninit() }; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut []);

        let parsed = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e),
        })?;

        let body_offset = match parsed {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(header_size = body_offset, "parsed request header");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let header = build_header(&req)?;
        src.advance(body_offset);

        let payload_size = parse_payload(&header)?;
        Ok(Some((header, payload_size)))
    }
}

fn build_header(req: &httparse::Request<'_, '_>) -> Result<RequestHeader, ParseError> {
    let version = match req.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        // Currently HTTP/2 and HTTP/3 not supported
        v => return Err(ParseError::InvalidVersion(v)),
    };

    let method = req.method.ok_or(ParseError::InvalidMethod)?;
    let method = Method::from_bytes(method.as_bytes()).map_err(|_e| ParseError::InvalidMethod)?;

    let uri = req.path.ok_or(ParseError::InvalidUri)?;
    let uri = uri.parse::<Uri>().map_err(|_e| ParseError::InvalidUri)?;

    let mut headers = HeaderMap::with_capacity(req.headers.len());
    for header in req.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
        headers.append(name, value);
    }

    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;
    *request.headers_mut() = headers;
    Ok(request.into())
}

/// Decides how the request payload is framed.
///
/// refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::Empty),

        (Some(te_value), None) => {
            Err(ParseError::unsupported_transfer_encoding(String::from_utf8_lossy(te_value.as_bytes())))
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_e| ParseError::invalid_content_length("value can't to_str"))?;

            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_e| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            match length {
                0 => Ok(PayloadSize::Empty),
                length => Ok(PayloadSize::Length(length)),
            }
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}
