//! Dynamic route handlers.
//!
//! Any `async fn(Request<Body>) -> HandlerResult` (or equivalent closure) is
//! a handler. Handlers are stored type-erased behind `Arc<dyn Handler>`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::error::HandlerFault;

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a dynamic handler.
pub type HandlerResult = Result<Response, HandlerFault>;

/// A dynamic route handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: Request<Body>) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, request: Request<Body>) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(request))
    }
}

/// Shared, type-erased handler as stored in the route table.
pub type SharedHandler = Arc<dyn Handler>;
