//! Accept loop and per-connection serving.
//!
//! # Responsibilities
//! - Accept until shutdown, one task per connection
//! - Optional TLS handshake before HTTP
//! - Serve HTTP/1.1 with upgrade support so WebSocket handshakes complete
//! - On shutdown, let each connection finish its in-flight request and
//!   close idle keep-alive connections
//!
//! # Design Decisions
//! - The loop exits on the shutdown signal, never on an accept error;
//!   transient accept errors (e.g. fd exhaustion) back off briefly
//! - The listener is dropped when the loop returns, closing the socket

use std::time::Duration;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::Instrument;

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::connection::{ConnectionId, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};

const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Everything one accept loop needs.
pub struct AcceptLoop {
    pub listener: Listener,
    pub app: Router,
    pub tls: Option<TlsAcceptor>,
    pub shutdown: ShutdownSignal,
    pub tracker: ConnectionTracker,
}

impl AcceptLoop {
    /// Run until shutdown is signalled.
    pub async fn run(self) {
        let AcceptLoop {
            listener,
            app,
            tls,
            mut shutdown,
            tracker,
        } = self;
        let scheme = if tls.is_some() { "https" } else { "http" };
        let address = listener.local_addr();
        tracing::info!(address = %address, scheme, "Accepting connections");

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer, permit)) => {
                    let guard = tracker.track();
                    let id = guard.id();
                    let span = tracing::debug_span!("connection", id = %id, peer = %peer, scheme);
                    let app = app.clone();
                    let tls = tls.clone();
                    let shutdown = shutdown.clone();

                    tokio::spawn(
                        async move {
                            let _permit = permit;
                            let _guard = guard;
                            match tls {
                                Some(acceptor) => {
                                    let handshake =
                                        tokio::time::timeout(TLS_HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await;
                                    match handshake {
                                        Ok(Ok(stream)) => serve_connection(stream, app, shutdown, id).await,
                                        Ok(Err(e)) => tracing::debug!(error = %e, "TLS handshake failed"),
                                        Err(_) => tracing::debug!("TLS handshake timed out"),
                                    }
                                }
                                None => serve_connection(stream, app, shutdown, id).await,
                            }
                        }
                        .instrument(span),
                    );
                }
                Err(ListenerError::Closed) => break,
                Err(e) => {
                    tracing::warn!(address = %address, error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }

        drop(listener);
        tracing::info!(address = %address, scheme, "Stopped accepting connections");
    }
}

/// Serve HTTP/1.1 on one established stream until the client goes away or
/// shutdown drains it.
pub async fn serve_connection<I>(io: I, app: Router, mut shutdown: ShutdownSignal, id: ConnectionId)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |request: Request<Incoming>| app.clone().oneshot(request));

    let connection = http1::Builder::new()
        .timer(TokioTimer::new())
        .keep_alive(true)
        .serve_connection(TokioIo::new(io), service)
        .with_upgrades();
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown.wait() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(connection_id = %id, error = %e, "Connection ended with error");
    }
}
