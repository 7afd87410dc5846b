use std::any::Any;
use std::error::Error;
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::{FutureExt, SinkExt, StreamExt};
use http::header::{CONNECTION, EXPECT};
use http::{HeaderValue, Response, StatusCode, Version};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError};

const CLOSE: HeaderValue = HeaderValue::from_static("close");

/// Drives one HTTP/1.x connection.
///
/// Requests are served strictly one after another. Request payloads are
/// drained and discarded before the handler runs; the handler's response body
/// is streamed out frame by frame.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    /// Serves requests until the connection should end.
    ///
    /// `shutdown` is only observed between requests: a request that has
    /// started is always answered, and it is up to the owner to abort the
    /// task if that takes too long.
    ///
    /// # Errors
    ///
    /// Malformed requests are answered with `400` (`501` for a chunked
    /// request body) and then reported as [`HttpError::RequestError`]. Write
    /// failures are reported as [`HttpError::ResponseError`].
    pub async fn process<H>(mut self, handler: Arc<H>, shutdown: CancellationToken) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            let next = select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("shutdown requested, closing idle connection");
                    return Ok(());
                }
                next = self.framed_read.next() => next,
            };

            match next {
                Some(Ok(Message::Header((header, payload_size)))) => {
                    let keep_alive = self.do_process(header, payload_size, handler.as_ref()).await?;
                    if !keep_alive {
                        debug!("connection will not be reused, closing");
                        return Ok(());
                    }
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("receive payload while expecting a request header");
                    self.do_send_error(StatusCode::BAD_REQUEST).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    let status = if e.is_unsupported() { StatusCode::NOT_IMPLEMENTED } else { StatusCode::BAD_REQUEST };
                    warn!(cause = %e, status = status.as_u16(), "can't receive next request");
                    self.do_send_error(status).await?;
                    return Err(e.into());
                }

                None => {
                    debug!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    /// Answers one request. Returns whether the connection may be reused.
    async fn do_process<H>(&mut self, header: RequestHeader, payload_size: PayloadSize, handler: &H) -> Result<bool, HttpError>
    where
        H: Handler,
        H::RespBody: Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        if !payload_size.is_empty() {
            self.send_continue(&header).await?;
        }
        self.skip_body().await?;

        let keep_alive = header.keep_alive();
        let version = header.version();
        let request = header.into_inner();

        match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
            Ok(Ok(response)) => self.do_send_response(response, keep_alive, version).await,
            Ok(Err(e)) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, "handle response error");
                self.do_send_error(StatusCode::INTERNAL_SERVER_ERROR).await?;
                Ok(false)
            }
            Err(panic) => {
                error!(cause = panic_message(panic.as_ref()), "request handler panicked");
                self.do_send_error(StatusCode::INTERNAL_SERVER_ERROR).await?;
                Ok(false)
            }
        }
    }

    async fn send_continue(&mut self, header: &RequestHeader) -> Result<(), HttpError> {
        let Some(value) = header.headers().get(EXPECT) else {
            return Ok(());
        };

        if value.as_bytes().eq_ignore_ascii_case(b"100-continue") {
            let writer = self.framed_write.get_mut();
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
            writer.flush().await.map_err(SendError::io)?;
            info!("receive expect request header, sent continue response");
        }
        Ok(())
    }

    /// Reads and discards the current request payload up to its `Eof`.
    async fn skip_body(&mut self) -> Result<(), HttpError> {
        let mut skipped = 0usize;
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Eof))) => {
                    if skipped > 0 {
                        debug!(skipped, "discarded request body");
                    }
                    return Ok(());
                }
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => skipped += bytes.len(),
                Some(Ok(Message::Header(_))) => {
                    return Err(ParseError::invalid_body("receive request header while reading body").into());
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ParseError::invalid_body("connection closed before request body ended").into()),
            }
        }
    }

    async fn do_send_error(&mut self, status_code: StatusCode) -> Result<(), HttpError> {
        self.do_send_response(build_error_response(status_code), false, Version::HTTP_11).await.map(drop)
    }

    /// Writes a response framed for a peer speaking `version`. Returns whether
    /// the connection may be reused afterwards.
    ///
    /// HTTP/1.0 peers can't decode chunked payloads, so a body of unknown size
    /// is sent to them as raw bytes ended by closing the connection.
    async fn do_send_response<T>(&mut self, response: Response<T>, keep_alive: bool, version: Version) -> Result<bool, HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let (mut header_parts, mut body) = response.into_parts();

        let payload_size = match body.size_hint().exact() {
            Some(0) => PayloadSize::Empty,
            Some(length) => PayloadSize::Length(length),
            None if version == Version::HTTP_10 => PayloadSize::UntilClose,
            None => PayloadSize::Chunked,
        };

        let keep_alive = keep_alive && payload_size != PayloadSize::UntilClose;
        if !keep_alive {
            header_parts.headers.insert(CONNECTION, CLOSE);
        }

        let header = Message::<_, T::Data>::Header((ResponseHead::from_parts(header_parts, ()), payload_size));
        if payload_size.is_empty() {
            // nothing else follows, so flush the head right away
            self.framed_write.send(header).await?;
        } else {
            self.framed_write.feed(header).await?;
        }

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    // trailers are not forwarded
                    let Ok(data) = frame.into_data() else {
                        continue;
                    };
                    self.framed_write.send(Message::Payload(PayloadItem::Chunk(data))).await?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    self.framed_write.send(Message::Payload(PayloadItem::<T::Data>::Eof)).await?;
                    return Ok(keep_alive);
                }
            }
        }
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::<Bytes>::new());
    *response.status_mut() = status_code;
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use http::Request;
    use http_body::Frame;
    use http_body_util::{Full, StreamBody};
    use indoc::indoc;
    use std::io;
    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio::task::JoinHandle;

    async fn echo_path(request: Request<()>) -> Result<Response<Full<Bytes>>, io::Error> {
        match request.uri().path() {
            "/fail" => Err(io::Error::other("handler failed")),
            "/panic" => panic!("handler blew up"),
            path => Ok(Response::new(Full::new(Bytes::from(path.to_owned())))),
        }
    }

    fn serve(shutdown: CancellationToken) -> (DuplexStream, JoinHandle<Result<(), HttpError>>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let handler = Arc::new(make_handler(echo_path));
        let task = tokio::spawn(async move {
            let (reader, writer) = tokio::io::split(server);
            HttpConnection::new(reader, writer).process(handler, shutdown).await
        });
        (client, task)
    }

    async fn exchange(raw: &str) -> (String, Result<(), HttpError>) {
        let (mut client, task) = serve(CancellationToken::new());
        client.write_all(raw.as_bytes()).await.unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        (response, task.await.unwrap())
    }

    type ChunkStream = StreamBody<futures::stream::Iter<std::vec::IntoIter<Result<Frame<Bytes>, io::Error>>>>;

    async fn two_chunks(_request: Request<()>) -> Result<Response<ChunkStream>, io::Error> {
        let frames = vec![Ok(Frame::data(Bytes::from_static(b"body"))), Ok(Frame::data(Bytes::from_static(b"{}")))];
        Ok(Response::new(StreamBody::new(futures::stream::iter(frames))))
    }

    async fn exchange_streamed(raw: &str) -> (String, Result<(), HttpError>) {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(async move {
            let (reader, writer) = tokio::io::split(server);
            HttpConnection::new(reader, writer).process(Arc::new(make_handler(two_chunks)), CancellationToken::new()).await
        });
        client.write_all(raw.as_bytes()).await.unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        (response, task.await.unwrap())
    }

    #[tokio::test]
    async fn keep_alive_serves_several_requests() {
        let raw = indoc! {r##"
        GET /first HTTP/1.1
        Host: localhost

        GET /second HTTP/1.1
        Host: localhost
        Connection: close

        "##};

        let (response, result) = exchange(raw).await;

        assert!(result.is_ok());
        let first = response.find("/first").unwrap();
        let second = response.find("/second").unwrap();
        assert!(first < second);
        assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(response.contains("connection: close"));
    }

    #[tokio::test]
    async fn http_1_0_closes_by_default() {
        let (response, result) = exchange("GET /old HTTP/1.0\r\n\r\nGET /ignored HTTP/1.0\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.ends_with("/old"));
        assert!(!response.contains("/ignored"));
    }

    #[tokio::test]
    async fn request_body_is_drained() {
        let raw = indoc! {r##"
        POST /upload HTTP/1.1
        Content-Length: 5

        helloGET /after HTTP/1.1
        Connection: close

        "##};

        let (response, result) = exchange(raw).await;

        assert!(result.is_ok());
        assert!(response.contains("/upload"));
        assert!(response.ends_with("/after"));
        assert!(!response.contains("HTTP/1.1 400"));
    }

    #[tokio::test]
    async fn malformed_request_gets_bad_request() {
        let (response, result) = exchange("NOT A REQUEST\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(matches!(result, Err(HttpError::RequestError { .. })));
    }

    #[tokio::test]
    async fn chunked_request_body_gets_not_implemented() {
        let raw = "POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";

        let (response, result) = exchange(raw).await;

        assert!(response.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        assert!(response.contains("connection: close"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn handler_error_becomes_internal_server_error() {
        let (response, result) = exchange("GET /fail HTTP/1.1\r\n\r\nGET /ignored HTTP/1.1\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(response.contains("connection: close"));
        assert!(!response.contains("/ignored"));
    }

    #[tokio::test]
    async fn handler_panic_becomes_internal_server_error() {
        let (response, result) = exchange("GET /panic HTTP/1.1\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn idle_connection_stops_on_shutdown() {
        let shutdown = CancellationToken::new();
        let (mut client, task) = serve(shutdown.clone());

        client.write_all(b"GET /one HTTP/1.1\r\n\r\n").await.unwrap();
        let mut buf = vec![0u8; 1024];
        let n = client.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200 OK"));

        shutdown.cancel();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn http_1_0_streamed_body_is_close_delimited() {
        let raw = "GET /stream HTTP/1.0\r\nConnection: keep-alive\r\n\r\nGET /again HTTP/1.0\r\n\r\n";

        let (response, result) = exchange_streamed(raw).await;

        assert!(result.is_ok());
        let (head, body) = response.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("connection: close"));
        assert!(!head.contains("transfer-encoding"));
        assert!(!head.contains("content-length"));
        assert_eq!(body, "body{}");
    }

    #[tokio::test]
    async fn http_1_1_streamed_body_is_chunked() {
        let (response, result) = exchange_streamed("GET /stream HTTP/1.1\r\nConnection: close\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.contains("transfer-encoding: chunked\r\n"));
        assert!(response.ends_with("\r\n\r\n4\r\nbody\r\n2\r\n{}\r\n0\r\n\r\n"));
    }
}
