//! Cache validators: ETag, Last-Modified and conditional GET.
//!
//! # Design Decisions
//! - ETag is `"<size>-<ticks>"` with ticks in 100 ns units since the Unix
//!   epoch; clients must treat it as opaque
//! - A request is "not modified" when `If-None-Match` equals the ETag
//!   exactly, or `If-Modified-Since` is within one second of the mtime

use std::fs::Metadata;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};

const TICKS_PER_NANO_DIVISOR: u128 = 100;
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Validators {
    pub etag: String,
    pub last_modified: String,
    modified: SystemTime,
}

impl Validators {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        Self::new(metadata.len(), modified)
    }

    pub fn new(size: u64, modified: SystemTime) -> Self {
        let ticks = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            / TICKS_PER_NANO_DIVISOR;
        let last_modified = DateTime::<Utc>::from(modified).format(HTTP_DATE).to_string();

        Self {
            etag: format!("\"{size}-{ticks}\""),
            last_modified,
            modified,
        }
    }

    /// Whether the request's conditional headers allow a 304.
    pub fn not_modified(&self, headers: &HeaderMap) -> bool {
        let etag_matches = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == self.etag);
        if etag_matches {
            return true;
        }

        headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date)
            .is_some_and(|since| within_one_second(self.modified, since))
    }
}

fn parse_http_date(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| SystemTime::from(dt.with_timezone(&Utc)))
}

fn within_one_second(a: SystemTime, b: SystemTime) -> bool {
    let delta = a
        .duration_since(b)
        .or_else(|_| b.duration_since(a))
        .unwrap_or_default();
    delta < Duration::from_secs(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn at(secs: u64, nanos: u32) -> SystemTime {
        UNIX_EPOCH + Duration::new(secs, nanos)
    }

    #[test]
    fn etag_combines_size_and_ticks() {
        let v = Validators::new(1234, at(1, 500));
        assert_eq!(v.etag, "\"1234-10000005\"");
    }

    #[test]
    fn last_modified_is_rfc1123_utc() {
        let v = Validators::new(0, at(784_111_777, 0));
        assert_eq!(v.last_modified, "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn matching_etag_is_not_modified() {
        let v = Validators::new(10, at(100, 0));
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_str(&v.etag).unwrap());
        assert!(v.not_modified(&headers));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"10-1\""));
        assert!(!v.not_modified(&headers));
    }

    #[test]
    fn if_modified_since_tolerates_subsecond_mtime() {
        let v = Validators::new(10, at(784_111_777, 900_000_000));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"),
        );
        assert!(v.not_modified(&headers));

        headers.insert(
            header::IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 06 Nov 1994 08:49:35 GMT"),
        );
        assert!(!v.not_modified(&headers));
    }

    #[test]
    fn unparseable_date_is_ignored() {
        let v = Validators::new(10, at(100, 0));
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_MODIFIED_SINCE, HeaderValue::from_static("yesterday"));
        assert!(!v.not_modified(&headers));
    }
}
