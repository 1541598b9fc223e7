//! Serving one request from a document root.
//!
//! # Responsibilities
//! - Resolve the decoded relative path inside the root (403 on escape)
//! - Directories: default document, listing, or 403
//! - Files: validators, 304, range selection, streamed body
//!
//! # Design Decisions
//! - Every outcome, including every error, becomes exactly one `Response`
//! - Bodies stream through a fixed 64 KiB buffer; file size is unbounded
//! - HEAD gets the GET headers and no body; the file is never opened

use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderValue, InvalidHeaderValue};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::routing::DocumentRoot;
use crate::static_files::listing;
use crate::static_files::mime;
use crate::static_files::range::ByteRange;
use crate::static_files::resolve::contained_path;
use crate::static_files::validators::Validators;

/// Default documents probed in a directory, in order.
pub const DEFAULT_DOCUMENTS: [&str; 2] = ["index.html", "default.htm"];

const CHUNK_SIZE: usize = 64 * 1024;

/// The parts of an inbound request static serving looks at.
#[derive(Debug, Clone, Copy)]
pub struct StaticRequest<'a> {
    pub method: &'a Method,
    pub headers: &'a HeaderMap,
    /// Path as received, used as the base for listing links.
    pub path: &'a str,
}

/// Failures that end static serving with an error status.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("path escapes the document root")]
    Traversal,

    #[error("directory browsing is disabled")]
    BrowsingDisabled,

    #[error("access denied")]
    AccessDenied,

    #[error("not found")]
    NotFound,

    #[error("requested range not satisfiable")]
    RangeNotSatisfiable { size: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::Traversal | ServeError::BrowsingDisabled | ServeError::AccessDenied => {
                StatusCode::FORBIDDEN
            }
            ServeError::NotFound => StatusCode::NOT_FOUND,
            ServeError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            ServeError::Io(_) | ServeError::Header(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_lookup(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ServeError::AccessDenied,
            // Missing files, `file.txt/child`, invalid names: all "no such file".
            _ => ServeError::NotFound,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ServeError::RangeNotSatisfiable { size } => {
                let mut response = status.into_response();
                let headers = response.headers_mut();
                headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
                if let Ok(value) = HeaderValue::try_from(format!("bytes */{size}")) {
                    headers.insert(header::CONTENT_RANGE, value);
                }
                response
            }
            ServeError::Io(ref e) => {
                tracing::error!(error = %e, "Static file I/O failed");
                (status, "500 Internal Server Error").into_response()
            }
            ServeError::Header(ref e) => {
                tracing::error!(error = %e, "Static response header invalid");
                (status, "500 Internal Server Error").into_response()
            }
            other => (status, format!("{} {}", status.as_u16(), other)).into_response(),
        }
    }
}

/// Serve `relative` (percent-encoded, as taken from the URL) from `document`.
pub async fn serve(document: &DocumentRoot, relative: &str, request: StaticRequest<'_>) -> Response {
    match try_serve(document, relative, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(path = %request.path, status = e.status().as_u16(), reason = %e, "Static request refused");
            e.into_response()
        }
    }
}

async fn try_serve(
    document: &DocumentRoot,
    relative: &str,
    request: StaticRequest<'_>,
) -> Result<Response, ServeError> {
    let decoded = urlencoding::decode(relative).map_err(|_| ServeError::NotFound)?;
    let absolute = contained_path(document.root(), &decoded).ok_or(ServeError::Traversal)?;

    let metadata = tokio::fs::metadata(&absolute)
        .await
        .map_err(ServeError::from_lookup)?;

    if !metadata.is_dir() {
        return send_file(&absolute, &metadata, request).await;
    }

    if let Some((path, metadata)) = default_document(&absolute).await {
        return send_file(&path, &metadata, request).await;
    }

    if !document.browsable() {
        return Err(ServeError::BrowsingDisabled);
    }

    let entries = listing::read_entries(&absolute)
        .await
        .map_err(ServeError::from_lookup)?;
    let html = listing::render(request.path, &entries);
    let length = html.len() as u64;
    let body = if request.method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(html)
    };

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    Ok(response)
}

async fn default_document(dir: &Path) -> Option<(PathBuf, Metadata)> {
    for name in DEFAULT_DOCUMENTS {
        let candidate = dir.join(name);
        if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
            if metadata.is_file() {
                return Some((candidate, metadata));
            }
        }
    }
    None
}

async fn send_file(
    path: &Path,
    metadata: &Metadata,
    request: StaticRequest<'_>,
) -> Result<Response, ServeError> {
    let validators = Validators::from_metadata(metadata);
    let etag = HeaderValue::try_from(validators.etag.as_str())?;
    let last_modified = HeaderValue::try_from(validators.last_modified.as_str())?;

    if validators.not_modified(request.headers) {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        set_validators(response.headers_mut(), etag, last_modified);
        return Ok(response);
    }

    let size = metadata.len();
    let (status, start, length, content_range) =
        match ByteRange::parse(request.headers.get(header::RANGE), size) {
            ByteRange::Full => (StatusCode::OK, 0, size, None),
            ByteRange::Partial { start, end } => (
                StatusCode::PARTIAL_CONTENT,
                start,
                end - start + 1,
                Some(HeaderValue::try_from(format!("bytes {start}-{end}/{size}"))?),
            ),
            ByteRange::Unsatisfiable => return Err(ServeError::RangeNotSatisfiable { size }),
        };

    let body = if request.method == Method::HEAD || length == 0 {
        Body::empty()
    } else {
        let mut file = File::open(path).await.map_err(ServeError::from_lookup)?;
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        stream_body(file, length)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime::content_type(path)));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    set_validators(headers, etag, last_modified);
    if let Some(range) = content_range {
        headers.insert(header::CONTENT_RANGE, range);
    }
    Ok(response)
}

fn set_validators(headers: &mut HeaderMap, etag: HeaderValue, last_modified: HeaderValue) {
    headers.insert(header::ETAG, etag);
    headers.insert(header::LAST_MODIFIED, last_modified);
}

/// Stream `length` bytes from the current position of `file`.
fn stream_body(file: File, length: u64) -> Body {
    let reader = file.take(length);
    let buffer = vec![0u8; CHUNK_SIZE];

    let chunks = futures_util::stream::try_unfold((reader, buffer), |(mut reader, mut buffer)| async move {
        match reader.read(&mut buffer).await {
            Ok(0) => Ok::<_, io::Error>(None),
            Ok(read) => {
                let chunk = Bytes::copy_from_slice(&buffer[..read]);
                Ok(Some((chunk, (reader, buffer))))
            }
            Err(e) => Err(e),
        }
    });

    Body::from_stream(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn root(dir: &tempfile::TempDir, browsable: bool) -> DocumentRoot {
        DocumentRoot::resolve(dir.path(), browsable).unwrap()
    }

    async fn get(document: &DocumentRoot, relative: &str, headers: &HeaderMap) -> Response {
        let request = StaticRequest {
            method: &Method::GET,
            headers,
            path: relative,
        };
        serve(document, relative, request).await
    }

    #[tokio::test]
    async fn streams_large_files_across_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.path().join("big.bin"), &data).unwrap();

        let response = get(&root(&dir, false), "/big.bin", &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            data.len().to_string().as_str()
        );
        assert_eq!(body_bytes(response).await, data);
    }

    #[tokio::test]
    async fn range_crossing_a_chunk_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0..(CHUNK_SIZE * 2)).map(|i| (i % 253) as u8).collect();
        std::fs::write(dir.path().join("big.bin"), &data).unwrap();

        let start = CHUNK_SIZE - 10;
        let end = CHUNK_SIZE + 10;
        let mut headers = HeaderMap::new();
        headers.insert(
            header::RANGE,
            HeaderValue::try_from(format!("bytes={start}-{end}")).unwrap(),
        );
        let response = get(&root(&dir, false), "/big.bin", &headers).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_bytes(response).await, &data[start..=end]);
    }

    #[tokio::test]
    async fn head_has_headers_but_no_body() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let headers = HeaderMap::new();
        let request = StaticRequest {
            method: &Method::HEAD,
            headers: &headers,
            path: "/a.txt",
        };
        let response = serve(&root(&dir, false), "/a.txt", request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
        assert!(response.headers().contains_key(header::ETAG));
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn default_document_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.htm"), "default").unwrap();
        let document = root(&dir, true);

        let response = get(&document, "/", &HeaderMap::new()).await;
        assert_eq!(body_bytes(response).await, b"default");

        std::fs::write(dir.path().join("index.html"), "index").unwrap();
        let response = get(&document, "/", &HeaderMap::new()).await;
        assert_eq!(body_bytes(response).await, b"index");
    }

    #[tokio::test]
    async fn directory_without_default_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/file.txt"), "x").unwrap();

        let closed = get(&root(&dir, false), "/sub", &HeaderMap::new()).await;
        assert_eq!(closed.status(), StatusCode::FORBIDDEN);

        let open = get(&root(&dir, true), "/sub", &HeaderMap::new()).await;
        assert_eq!(open.status(), StatusCode::OK);
        assert_eq!(open.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        let html = String::from_utf8(body_bytes(open).await).unwrap();
        assert!(html.contains("href=\"/sub/file.txt\""));
    }

    #[tokio::test]
    async fn encoded_traversal_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let response = get(&root(&dir, false), "/%2e%2e/%2e%2e/etc/passwd", &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_file_is_plain_text_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = get(&root(&dir, false), "/nope.txt", &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn unsatisfiable_range_names_the_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "0123456789").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=7-3"));

        let response = get(&root(&dir, false), "/a.txt", &headers).await;
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */10");
        assert!(body_bytes(response).await.is_empty());
    }
}
