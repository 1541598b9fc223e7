//! Request dispatcher.
//!
//! # Responsibilities
//! - Build the axum application: one fallback handler plus tower-http
//!   layers for request IDs and tracing
//! - Apply the resolution order to every request
//! - Contain handler faults and panics, turning them into 500s
//!
//! # Resolution Order
//! ```text
//! 1. WebSocket upgrade   → WsRouteKey(host, path) → WsRouteKey(*, path) → 404
//! 2. Dynamic route       → RouteKey(method, host, path) → RouteKey(method, *, path)
//! 3. Host document root  → exact host → wildcard host
//! 4. Static mount        → longest matching prefix
//! 5. 404
//! ```
//! The first branch that matches commits; there is no fallthrough.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use axum::body::Body;
use axum::extract::{FromRequestParts, State, WebSocketUpgrade};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures_util::FutureExt;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::panic_message;
use crate::http::handler::SharedHandler;
use crate::http::request::{is_websocket_upgrade, RequestTarget};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::{Registry, RouteTable};
use crate::static_files::{self, StaticRequest};
use crate::websocket::upgrade::run_session;

/// Application state injected into the dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

/// Build the application serving everything registered in `registry`.
pub fn build_router(registry: Arc<Registry>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(AppState { registry })
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let table = state.registry.snapshot();
    let target = RequestTarget::from_request(&request);

    let (branch, response) = route(&table, target, request).await;
    metrics::record_request(branch, response.status().as_u16(), start);
    response
}

async fn route(
    table: &RouteTable,
    target: RequestTarget,
    request: Request<Body>,
) -> (&'static str, Response) {
    if is_websocket_upgrade(request.headers()) {
        return ("websocket", upgrade(table, target, request).await);
    }

    if let Some(handler) = table.route(request.method(), &target.host, &target.path) {
        return ("route", invoke(handler, &target, request).await);
    }

    let static_request = StaticRequest {
        method: request.method(),
        headers: request.headers(),
        path: &target.path,
    };

    if let Some(document) = table.host_root(&target.host) {
        let response = static_files::serve(&document, target.relative_path(), static_request).await;
        return ("host_root", response);
    }

    if let Some((document, rest)) = table.static_mount(&target.host, &target.path) {
        let response = static_files::serve(&document, rest, static_request).await;
        return ("mount", response);
    }

    tracing::debug!(
        request_id = %target.request_id,
        method = %request.method(),
        host = %target.host,
        path = %target.path,
        "No registration matched"
    );
    ("not_found", response::not_found())
}

async fn upgrade(table: &RouteTable, target: RequestTarget, request: Request<Body>) -> Response {
    let Some(handler) = table.websocket(&target.host, &target.path) else {
        tracing::debug!(
            request_id = %target.request_id,
            host = %target.host,
            path = %target.path,
            "No WebSocket route matched"
        );
        return response::not_found();
    };

    let (mut parts, _body) = request.into_parts();
    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::debug!(
                request_id = %target.request_id,
                path = %target.path,
                reason = %rejection.body_text(),
                "WebSocket handshake rejected"
            );
            return rejection.into_response();
        }
    };

    let RequestTarget { host, path, .. } = target;
    ws.on_upgrade(move |socket| run_session(handler, socket, host, path))
}

async fn invoke(handler: SharedHandler, target: &RequestTarget, request: Request<Body>) -> Response {
    let method = request.method().clone();
    let outcome = AssertUnwindSafe(async move { handler.call(request).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(fault)) => {
            tracing::error!(
                request_id = %target.request_id,
                method = %method,
                host = %target.host,
                path = %target.path,
                error = %fault,
                "Handler failed"
            );
            metrics::record_handler_fault("route");
            response::handler_fault()
        }
        Err(panic) => {
            tracing::error!(
                request_id = %target.request_id,
                method = %method,
                host = %target.host,
                path = %target.path,
                panic = %panic_message(panic.as_ref()),
                "Handler panicked"
            );
            metrics::record_handler_fault("route");
            response::handler_fault()
        }
    }
}
