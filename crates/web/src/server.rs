//! Server lifecycle: binding, the accept loop and graceful shutdown.
//!
//! A [`Server`] owns a [`Router`] and can be started and stopped any number
//! of times. Each start binds a fresh listener and spawns an accept task;
//! every accepted connection runs on its own task and is driven by
//! [`HttpConnection`]. Stopping cancels a shared token: idle connections
//! close right away, connections in the middle of a response get
//! [`ServerConfig::shutdown_grace`] to finish before they are aborted.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::header::DATE;
use http::{Request, Response, StatusCode};
use pocket_http::connection::HttpConnection;
use pocket_http::handler::Handler;
use pocket_http::protocol::RequestHeader;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::date::DateService;
use crate::error::{HandlerError, ServerError};
use crate::router::Router;
use crate::{RequestContext, ResponseBody, debug as debug_flag, response};

/// Where a [`Server`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug)]
pub struct ServerBuilder {
    router: Option<Router>,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, config: ServerConfig::default() }
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.config.max_connections = max_connections;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// # Errors
    ///
    /// [`ServerError::Configuration`] when no router was set or
    /// `max_connections` is zero.
    pub fn build(self) -> Result<Server, ServerError> {
        let router = self.router.ok_or_else(|| ServerError::configuration("router must be set"))?;
        if self.config.max_connections == 0 {
            return Err(ServerError::configuration("max_connections must be greater than 0"));
        }

        Ok(Server {
            router: Arc::new(router),
            config: self.config,
            state: AtomicU8::new(ServerState::Stopped as u8),
            running: Mutex::new(None),
        })
    }
}

/// An embeddable HTTP server.
///
/// All lifecycle calls take `&self`, so a server can be shared behind an
/// `Arc` between the task that starts it and the one that stops it.
#[derive(Debug)]
pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
    state: AtomicU8,
    running: Mutex<Option<Running>>,
}

#[derive(Debug)]
struct Running {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    accept_task: JoinHandle<()>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|running| running.local_addr)
    }

    /// Binds `port` on the configured host and starts serving.
    ///
    /// Pinned assets are opened once before binding, so a route pointing at a
    /// missing asset fails here instead of on the first request.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidPort`] for `0` or anything above `65535`
    /// - [`ServerError::AlreadyRunning`] if the server was started before and not stopped
    /// - [`ServerError::Configuration`] if a pinned asset can't be opened
    /// - [`ServerError::Bind`] if the address can't be bound
    pub async fn start(&self, port: u32) -> Result<SocketAddr, ServerError> {
        let port = u16::try_from(port).ok().filter(|port| *port != 0).ok_or(ServerError::InvalidPort { port })?;

        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        self.set_state(ServerState::Starting);
        match self.do_start(port).await {
            Ok(started) => {
                let local_addr = started.local_addr;
                *running = Some(started);
                self.set_state(ServerState::Running);
                info!(%local_addr, "server started");
                Ok(local_addr)
            }
            Err(e) => {
                self.set_state(ServerState::Stopped);
                warn!(port, cause = %e, "server failed to start");
                Err(e)
            }
        }
    }

    /// Stops serving and waits until the listener is closed and every
    /// connection task has ended. Does nothing if the server is not running.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(Running { local_addr, shutdown, accept_task }) = running.take() else {
            return;
        };

        self.set_state(ServerState::Stopping);
        shutdown.cancel();
        if let Err(e) = accept_task.await {
            warn!(%local_addr, cause = %e, "accept task ended abnormally");
        }
        self.set_state(ServerState::Stopped);
        info!(%local_addr, "server stopped");
    }

    async fn do_start(&self, port: u16) -> Result<Running, ServerError> {
        for handler in self.router.handlers() {
            if let Some(asset_handler) = handler.as_asset() {
                asset_handler.verify().await.map_err(|e| match e {
                    HandlerError::Configuration { reason } => ServerError::Configuration { reason },
                    e => ServerError::configuration(e),
                })?;
            }
        }

        let host = self.config.host.as_str();
        let bind_error = |source| ServerError::Bind { address: format!("{host}:{port}"), source };
        let listener = TcpListener::bind((host, port)).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let shutdown = CancellationToken::new();
        let dispatcher = Arc::new(Dispatcher { router: Arc::clone(&self.router), date_service: DateService::new() });
        let accept_task = tokio::spawn(accept_loop(
            listener,
            dispatcher,
            shutdown.clone(),
            self.config.max_connections,
            self.config.shutdown_grace(),
        ));

        Ok(Running { local_addr, shutdown, accept_task })
    }

    fn set_state(&self, state: ServerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.shutdown.cancel();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
    max_connections: usize,
    grace: Duration,
) {
    let semaphore = Arc::new(Semaphore::new(max_connections));
    let mut connections = JoinSet::new();

    loop {
        let permit = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_closed) => break,
            },
        };

        let (tcp_stream, remote_addr) = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            },
        };

        while connections.try_join_next().is_some() {}

        let dispatcher = Arc::clone(&dispatcher);
        let shutdown = shutdown.clone();
        connections.spawn(async move {
            let _permit = permit;
            let (reader, writer) = tcp_stream.into_split();
            match HttpConnection::new(reader, writer).process(dispatcher, shutdown).await {
                Ok(()) => debug!(%remote_addr, "connection closed"),
                Err(e) => warn!(%remote_addr, cause = %e, "connection closed with error"),
            }
        });
    }

    drop(listener);

    let drained = tokio::time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(remaining = connections.len(), "shutdown grace elapsed, aborting connections");
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }
}

/// Glue between a connection and the router.
#[derive(Debug)]
struct Dispatcher {
    router: Arc<Router>,
    date_service: DateService,
}

#[async_trait]
impl Handler for Dispatcher {
    type RespBody = ResponseBody;
    type Error = HandlerError;

    async fn call(&self, req: Request<()>) -> Result<Response<Self::RespBody>, Self::Error> {
        let header = RequestHeader::from(req);
        let decoded = urlencoding::decode(header.uri().path()).map(Cow::into_owned);

        let mut response = match decoded {
            Ok(path) => {
                let (handler, context) = self.router.resolve(RequestContext::new(header, path));
                if debug_flag::enabled() {
                    debug!(method = %context.method(), path = context.path(), ?handler, "dispatching request");
                }
                handler.invoke(&context).await?
            }
            Err(e) => {
                debug!(cause = %e, "request path is not valid percent-encoded utf-8");
                response::empty(StatusCode::BAD_REQUEST)
            }
        };

        if let Some(date) = self.date_service.http_date() {
            response.headers_mut().insert(DATE, date);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetSource, MemoryAssetSource};
    use crate::body::ASSET_CHUNK_SIZE;
    use crate::handler::{StaticAssetHandler, StaticStringHandler, VersionHandler, handler_fn};
    use crate::router::{any, get};
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    const INDEX: &str = "<html><body>pocket</body></html>";
    const STYLE: &str = "body { color: red; }";

    fn assets() -> Arc<MemoryAssetSource> {
        Arc::new(
            MemoryAssetSource::new()
                .with_asset("index.html", Bytes::from_static(INDEX.as_bytes()))
                .with_asset("css/site.css", Bytes::from_static(STYLE.as_bytes())),
        )
    }

    fn router() -> Router {
        let source: Arc<dyn AssetSource> = assets();
        let index = Arc::new(StaticAssetHandler::pinned(Arc::clone(&source), "index.html").build());

        Router::builder()
            .route("/", get(Arc::clone(&index)))
            .route("/index.html", get(index))
            .route("/assets/*", get(StaticAssetHandler::prefixed(source).directory_listing(true).build()))
            .route("/version", get(VersionHandler::new("1.2.3")))
            .route("/hello", any(StaticStringHandler::text("hello")))
            .route(
                "/echo/:id",
                get(handler_fn(|req: RequestContext| async move {
                    Ok::<_, HandlerError>(req.path_params().get("id").unwrap_or_default().to_owned())
                })),
            )
            .route(
                "/panic",
                get(handler_fn(|_req: RequestContext| async move {
                    if true {
                        panic!("handler blew up");
                    }
                    Ok::<_, HandlerError>("unreachable")
                })),
            )
            .build()
            .unwrap()
    }

    fn server(router: Router) -> Server {
        Server::builder().router(router).host("127.0.0.1").shutdown_grace(Duration::from_millis(200)).build().unwrap()
    }

    fn free_port() -> u32 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        u32::from(listener.local_addr().unwrap().port())
    }

    struct Reply {
        status: u16,
        head: String,
        body: String,
    }

    async fn send(addr: SocketAddr, raw: &str) -> Reply {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        parse_reply(&String::from_utf8(buf).unwrap())
    }

    async fn get_path(addr: SocketAddr, path: &str) -> Reply {
        send(addr, &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")).await
    }

    fn parse_reply(raw: &str) -> Reply {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        let status = head.split(' ').nth(1).unwrap().parse().unwrap();
        let head = head.to_ascii_lowercase();
        let body = if head.contains("transfer-encoding: chunked") { dechunk(body) } else { body.to_owned() };
        Reply { status, head, body }
    }

    fn dechunk(mut rest: &str) -> String {
        let mut out = String::new();
        loop {
            let (size, after) = rest.split_once("\r\n").unwrap();
            let size = usize::from_str_radix(size, 16).unwrap();
            if size == 0 {
                return out;
            }
            out.push_str(&after[..size]);
            rest = &after[size + 2..];
        }
    }

    #[tokio::test]
    async fn rejects_invalid_ports() {
        let server = server(router());

        assert!(matches!(server.start(0).await, Err(ServerError::InvalidPort { port: 0 })));
        assert!(matches!(server.start(70_000).await, Err(ServerError::InvalidPort { port: 70_000 })));
        assert!(!server.is_running());
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn serves_index_for_root_and_index_html() {
        let server = server(router());
        let addr = server.start(free_port()).await.unwrap();

        let root = get_path(addr, "/").await;
        let index = get_path(addr, "/index.html").await;

        assert_eq!(root.status, 200);
        assert_eq!(root.body, INDEX);
        assert_eq!(index.body, root.body);
        assert!(root.head.contains("content-type: text/html"));
        assert!(root.head.contains("date: "));

        server.stop().await;
    }

    #[tokio::test]
    async fn serves_version_assets_and_fallbacks() {
        let server = server(router());
        let addr = server.start(free_port()).await.unwrap();

        let version = get_path(addr, "/version").await;
        assert_eq!(version.status, 200);
        assert_eq!(version.body, "1.2.3");

        let style = get_path(addr, "/assets/css/site%2Ecss").await;
        assert_eq!(style.status, 200);
        assert!(style.head.contains("content-type: text/css"));
        assert_eq!(style.body, STYLE);

        let listing = get_path(addr, "/assets/css").await;
        assert_eq!(listing.status, 200);
        assert!(listing.body.contains("site.css"));

        let missing = get_path(addr, "/nowhere").await;
        assert_eq!(missing.status, 404);

        let post = send(addr, "POST /version HTTP/1.1\r\nConnection: close\r\n\r\n").await;
        assert_eq!(post.status, 501);

        let hello = send(addr, "DELETE /hello HTTP/1.1\r\nConnection: close\r\n\r\n").await;
        assert_eq!(hello.body, "hello");

        server.stop().await;
    }

    #[tokio::test]
    async fn bad_requests_do_not_stop_the_server() {
        let server = server(router());
        let addr = server.start(free_port()).await.unwrap();

        let malformed = send(addr, "NOT HTTP AT ALL\r\n\r\n").await;
        assert_eq!(malformed.status, 400);

        let undecodable = get_path(addr, "/assets/%FF").await;
        assert_eq!(undecodable.status, 400);

        let panicked = get_path(addr, "/panic").await;
        assert_eq!(panicked.status, 500);

        let version = get_path(addr, "/version").await;
        assert_eq!(version.status, 200);

        server.stop().await;
    }

    #[tokio::test]
    async fn concurrent_requests_get_their_own_responses() {
        let server = server(router());
        let addr = server.start(free_port()).await.unwrap();

        let mut tasks = JoinSet::new();
        for id in 0..16 {
            tasks.spawn(async move { (id, get_path(addr, &format!("/echo/{id}")).await) });
        }
        while let Some(result) = tasks.join_next().await {
            let (id, reply) = result.unwrap();
            assert_eq!(reply.status, 200);
            assert_eq!(reply.body, id.to_string());
        }

        server.stop().await;
    }

    fn patterned(len: usize, alphabet: &[u8]) -> String {
        (0..len).map(|i| char::from(alphabet[i % alphabet.len()])).collect()
    }

    #[tokio::test]
    async fn concurrent_large_assets_are_not_mixed() {
        let page = patterned(3 * ASSET_CHUNK_SIZE + 123, b"0123456789");
        let blob = patterned(2 * ASSET_CHUNK_SIZE + 77, b"abcdefghijklmnopqrstuvwxyz");
        let source: Arc<dyn AssetSource> = Arc::new(
            MemoryAssetSource::new()
                .with_asset("index.html", Bytes::from(page.clone()))
                .with_asset("data/blob.txt", Bytes::from(blob.clone())),
        );
        let router = Router::builder()
            .route("/", get(StaticAssetHandler::pinned(Arc::clone(&source), "index.html").build()))
            .route("/assets/*", get(StaticAssetHandler::prefixed(source).build()))
            .build()
            .unwrap();
        let server = server(router);
        let addr = server.start(free_port()).await.unwrap();

        let mut tasks = JoinSet::new();
        for i in 0..16 {
            let path = if i % 2 == 0 { "/" } else { "/assets/data/blob.txt" };
            tasks.spawn(async move { (path, get_path(addr, path).await) });
        }
        while let Some(result) = tasks.join_next().await {
            let (path, reply) = result.unwrap();
            let expected = if path == "/" { &page } else { &blob };
            assert_eq!(reply.status, 200);
            assert!(reply.head.contains("transfer-encoding: chunked"));
            assert_eq!(reply.body.len(), expected.len());
            assert!(reply.body == *expected, "body of {path} differs from its asset");
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn http_1_0_client_gets_raw_asset_bytes() {
        let server = server(router());
        let addr = server.start(free_port()).await.unwrap();

        let reply = send(addr, "GET /assets/css/site.css HTTP/1.0\r\nHost: localhost\r\n\r\n").await;

        assert_eq!(reply.status, 200);
        assert!(reply.head.contains("connection: close"));
        assert!(!reply.head.contains("transfer-encoding"));
        assert_eq!(reply.body, STYLE);

        server.stop().await;
    }

    #[tokio::test]
    async fn can_restart_on_the_same_port() {
        let server = server(router());
        let port = free_port();

        let addr = server.start(port).await.unwrap();
        assert!(server.is_running());
        assert_eq!(server.local_addr().await, Some(addr));
        assert!(matches!(server.start(port).await, Err(ServerError::AlreadyRunning)));

        server.stop().await;
        assert!(!server.is_running());
        assert_eq!(server.local_addr().await, None);
        server.stop().await;

        let addr = server.start(port).await.unwrap();
        assert_eq!(get_path(addr, "/version").await.status, 200);
        server.stop().await;
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn stop_closes_idle_keep_alive_connections() {
        let server = server(router());
        let addr = server.start(free_port()).await.unwrap();

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /version HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        let mut buf = vec![0; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200 OK"));

        server.stop().await;

        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn missing_pinned_asset_fails_start() {
        let source = Arc::new(MemoryAssetSource::new());
        let router = Router::builder()
            .route("/", get(StaticAssetHandler::pinned(source, "index.html").build()))
            .build()
            .unwrap();
        let server = server(router);

        let error = server.start(free_port()).await.unwrap_err();

        assert!(matches!(error, ServerError::Configuration { .. }));
        let message = error.to_string();
        assert!(message.starts_with("invalid configuration: pinned asset 'index.html'"));
        assert!(!message.contains("configuration error"));
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = u32::from(occupied.local_addr().unwrap().port());
        let server = server(router());

        let result = server.start(port).await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
        assert_eq!(server.state(), ServerState::Stopped);
    }
}
