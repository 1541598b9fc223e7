//! Handoff from a completed upgrade to the registered handler.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use axum::extract::ws::WebSocket;
use futures_util::FutureExt;
use tracing::Instrument;

use crate::error::{panic_message, HandlerFault};
use crate::http::handler::BoxFuture;
use crate::observability::metrics;
use crate::websocket::session::WsSession;

/// A WebSocket route handler. It owns the session for the whole
/// connection lifetime.
pub trait SocketHandler: Send + Sync + 'static {
    fn call(&self, session: WsSession) -> BoxFuture<'static, Result<(), HandlerFault>>;
}

impl<F, Fut> SocketHandler for F
where
    F: Fn(WsSession) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerFault>> + Send + 'static,
{
    fn call(&self, session: WsSession) -> BoxFuture<'static, Result<(), HandlerFault>> {
        Box::pin(self(session))
    }
}

/// Shared, type-erased socket handler as stored in the route table.
pub type SharedSocketHandler = Arc<dyn SocketHandler>;

/// Run `handler` on an upgraded socket until it returns. Faults and panics
/// are contained here.
pub(crate) async fn run_session(
    handler: SharedSocketHandler,
    socket: WebSocket,
    host: String,
    path: String,
) {
    let session = WsSession::open(socket, host, path);
    let span = tracing::info_span!(
        "websocket",
        session = %session.id(),
        host = %session.host(),
        path = %session.path()
    );

    async move {
        tracing::info!("WebSocket session opened");
        metrics::websocket_opened();

        let outcome = AssertUnwindSafe(async move { handler.call(session).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => tracing::info!("WebSocket session closed"),
            Ok(Err(fault)) => {
                tracing::error!(error = %fault, "WebSocket handler failed");
                metrics::record_handler_fault("websocket");
            }
            Err(panic) => {
                tracing::error!(panic = %panic_message(panic.as_ref()), "WebSocket handler panicked");
                metrics::record_handler_fault("websocket");
            }
        }
        metrics::websocket_closed();
    }
    .instrument(span)
    .await
}
