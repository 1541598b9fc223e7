//! Terminal responses produced by the dispatcher itself.
//!
//! # Design Decisions
//! - Error bodies are short plain text; `Content-Length` comes from the
//!   fixed body

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// 404 for a request nothing is registered for.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}

/// 500 for a handler that failed or panicked.
pub fn handler_fault() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn fixed_responses_are_plain_text() {
        for (response, status) in [
            (not_found(), StatusCode::NOT_FOUND),
            (handler_fault(), StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            assert_eq!(response.status(), status);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "text/plain; charset=utf-8"
            );
        }
    }
}
