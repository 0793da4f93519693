//! The socket transport: a hyper HTTP/1.x accept loop in front of a router.
//!
//! [`Server::listen`] resolves a port (probing when the configured port is
//! `0`), binds a reuse-enabled listener, and spawns the accept loop. Each
//! connection is served on its own task with optional TLS, keep-alive and a
//! per-connection timeout. Shutdown is a watch channel flip: `close` stops
//! accepting, `wait` parks until the loop exits.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::error::Error;
use crate::http::{text, Request};
use crate::logger::AccessLogEntry;
use crate::routing::{Env, Router};
use crate::server::config::ServerConfig;
use crate::server::{listener, port, tls};

struct Shared {
    router: Router,
    env: Env,
    config: ServerConfig,
    acceptor: Option<TlsAcceptor>,
}

/// A running socket server bound to a port.
pub struct Server {
    port: u16,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Server {
    /// Bind and start serving `router` with `config`.
    ///
    /// A configured port of `0` probes forward from
    /// [`ServerConfig::PROBE_START`]; a fixed port is verified first so a
    /// busy port fails with a free-port suggestion instead of a bare bind
    /// error.
    pub async fn listen(router: Router, config: ServerConfig) -> Result<Self, Error> {
        Self::listen_with_env(router, config, Env::default()).await
    }

    /// [`Server::listen`] with state handed to every callback.
    pub async fn listen_with_env(
        router: Router,
        config: ServerConfig,
        env: Env,
    ) -> Result<Self, Error> {
        let port = if config.port == 0 {
            port::next_free(&config.host, ServerConfig::PROBE_START, config.port_probe_span)
                .await
                .ok_or(Error::NoAvailablePort {
                    start: ServerConfig::PROBE_START,
                    end: ServerConfig::PROBE_START.saturating_add(config.port_probe_span),
                })?
        } else {
            port::check(&config.host, config.port, config.port_probe_span).await?;
            config.port
        };

        let addr: SocketAddr = format!("{}:{port}", config.host)
            .parse()
            .map_err(|err: std::net::AddrParseError| Error::InvalidAddress {
                addr: format!("{}:{port}", config.host),
                reason: err.to_string(),
            })?;
        let listener = listener::bind_reusable(addr).map_err(|source| Error::Bind { addr, source })?;

        let acceptor = config.tls.as_ref().map(tls::acceptor).transpose()?;
        let shared = Arc::new(Shared {
            router,
            env,
            config,
            acceptor,
        });

        let (shutdown, watcher) = watch::channel(false);
        log::info!("listening for requests on {addr}");
        let handle = tokio::spawn(accept_loop(listener, shared, watcher));

        Ok(Self {
            port,
            shutdown,
            handle,
        })
    }

    /// The bound port, useful after an automatic probe.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting connections. In-flight connections finish on their own
    /// tasks.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Park until the accept loop exits.
    pub async fn wait(self) {
        let _ = self.handle.await;
    }
}

async fn accept_loop(
    listener: tokio::net::TcpListener,
    shared: Arc<Shared>,
    mut watcher: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let shared = Arc::clone(&shared);
                        tokio::spawn(async move {
                            serve_connection(stream, peer_addr, shared).await;
                        });
                    }
                    Err(err) => log::error!("failed to accept connection: {err}"),
                }
            }
            changed = watcher.changed() => {
                if changed.is_err() || *watcher.borrow() {
                    log::info!("shutting down listener");
                    break;
                }
            }
        }
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    shared: Arc<Shared>,
) {
    match shared.acceptor.clone() {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => drive(tls_stream, peer_addr, shared).await,
            Err(err) => log::warn!("TLS handshake with {peer_addr} failed: {err}"),
        },
        None => drive(stream, peer_addr, shared).await,
    }
}

async fn drive<S>(stream: S, peer_addr: SocketAddr, shared: Arc<Shared>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let service_shared = Arc::clone(&shared);
    let service = service_fn(move |req| {
        let shared = Arc::clone(&service_shared);
        async move { respond(req, peer_addr, &shared).await }
    });

    let mut builder = http1::Builder::new();
    builder.keep_alive(shared.config.keep_alive);
    let conn = builder.serve_connection(io, service);

    if shared.config.request_timeout == 0 {
        if let Err(err) = conn.await {
            log::debug!("connection from {peer_addr} ended with error: {err}");
        }
        return;
    }

    let timeout = Duration::from_secs(shared.config.request_timeout);
    match tokio::time::timeout(timeout, conn).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::debug!("connection from {peer_addr} ended with error: {err}"),
        Err(_) => log::warn!(
            "connection from {peer_addr} timed out after {} seconds",
            timeout.as_secs()
        ),
    }
}

async fn respond(
    req: hyper::Request<Incoming>,
    peer_addr: SocketAddr,
    shared: &Shared,
) -> Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let collected = body.collect().await?;
    let trailers = collected.trailers().cloned();
    let request = Request::from_parts(&parts, collected.to_bytes(), trailers.as_ref());

    let mut entry = shared.config.access_log.then(|| {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            request.method().to_string(),
            request.url(),
        );
        entry.user_agent = request.header("user-agent").map(str::to_string);
        entry
    });

    let response = shared
        .router
        .handle_with_env(request, shared.env.clone())
        .await
        // An unrouted request in pass-through mode still needs an answer on
        // this transport.
        .unwrap_or_else(|| text("Not Found").status(404));

    if let Some(entry) = entry.as_mut() {
        entry.status = response.code();
        entry.body_bytes = response.body_ref().len();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        entry.emit(&shared.config.access_log_format);
    }
    Ok(response.into_hyper())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::json;
    use crate::routing::RouteResult;

    async fn hello(_req: Arc<Request>, _env: Env) -> RouteResult {
        Ok(Some(json(&serde_json::json!({ "message": "test" }))?.into()))
    }

    async fn echo_body(req: Arc<Request>, _env: Env) -> RouteResult {
        Ok(Some(req.body_text().into()))
    }

    // Each test gets its own OS-assigned port so parallel tests never share
    // a listener through SO_REUSEPORT.
    async fn free_port() -> u16 {
        let probe = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        probe.local_addr().unwrap().port()
    }

    async fn start(router: Router) -> Server {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = ServerConfig {
            port: free_port().await,
            access_log: false,
            ..ServerConfig::default()
        };
        Server::listen(router, config).await.unwrap()
    }

    #[tokio::test]
    async fn probes_a_port_and_serves_a_routed_request() {
        let mut router = Router::new();
        router.route("GET /hello", hello);
        let config = ServerConfig {
            access_log: false,
            ..ServerConfig::default()
        };
        let server = Server::listen(router, config).await.unwrap();
        assert!(server.port() >= ServerConfig::PROBE_START);

        let url = format!("http://127.0.0.1:{}/hello", server.port());
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["message"], "test");

        server.close();
        server.wait().await;
    }

    #[tokio::test]
    async fn unknown_route_is_a_404() {
        let mut router = Router::new();
        router.route("GET /hello", hello);
        let server = start(router).await;

        let url = format!("http://127.0.0.1:{}/nope", server.port());
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.text().await.unwrap(), "Not Found");

        server.close();
        server.wait().await;
    }

    #[tokio::test]
    async fn request_body_reaches_the_callback() {
        let mut router = Router::new();
        router.route("POST /echo", echo_body);
        let server = start(router).await;

        let url = format!("http://127.0.0.1:{}/echo", server.port());
        let client = reqwest::Client::new();
        let response = client.post(&url).body("ping").send().await.unwrap();
        assert_eq!(response.text().await.unwrap(), "ping");

        server.close();
        server.wait().await;
    }

    #[tokio::test]
    async fn fixed_busy_port_fails_with_suggestion() {
        let holder = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let busy = holder.local_addr().unwrap().port();

        let err = Server::listen(Router::new(), ServerConfig::with_port(busy))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::PortUnavailable { .. }));
    }

    #[tokio::test]
    async fn close_stops_accepting() {
        let server = start(Router::new()).await;
        let port = server.port();
        server.close();
        server.wait().await;

        let url = format!("http://127.0.0.1:{port}/");
        assert!(reqwest::get(&url).await.is_err());
    }
}
