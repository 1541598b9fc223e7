//! Single `Range: bytes=` header parsing.

use axum::http::HeaderValue;

/// What part of a file to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteRange {
    /// No usable range header: the whole file with 200.
    Full,
    /// Inclusive byte span with 206.
    Partial { start: u64, end: u64 },
    /// 416.
    Unsatisfiable,
}

impl ByteRange {
    /// Parse the header against a file of `size` bytes.
    ///
    /// Malformed, multi-range and non-`bytes` headers yield `Full`.
    pub fn parse(header: Option<&HeaderValue>, size: u64) -> Self {
        let Some(ranges) = header
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().strip_prefix("bytes="))
        else {
            return ByteRange::Full;
        };
        if ranges.contains(',') {
            return ByteRange::Full;
        }
        let Some((start, end)) = ranges.split_once('-') else {
            return ByteRange::Full;
        };
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            return match end.parse::<u64>() {
                Ok(0) => ByteRange::Unsatisfiable,
                Ok(_) if size == 0 => ByteRange::Unsatisfiable,
                Ok(suffix) => ByteRange::Partial {
                    start: size.saturating_sub(suffix),
                    end: size - 1,
                },
                Err(_) => ByteRange::Full,
            };
        }

        let Ok(start) = start.parse::<u64>() else {
            return ByteRange::Full;
        };
        let end = if end.is_empty() {
            None
        } else {
            match end.parse::<u64>() {
                Ok(end) => Some(end),
                Err(_) => return ByteRange::Full,
            }
        };

        if end.is_some_and(|end| start > end) || start >= size {
            return ByteRange::Unsatisfiable;
        }
        let last = size - 1;
        ByteRange::Partial {
            start,
            end: end.map_or(last, |end| end.min(last)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: &str, size: u64) -> ByteRange {
        ByteRange::parse(Some(&HeaderValue::from_str(value).unwrap()), size)
    }

    #[test]
    fn absent_header_is_full() {
        assert_eq!(ByteRange::parse(None, 10), ByteRange::Full);
    }

    #[test]
    fn closed_and_open_ended_ranges() {
        assert_eq!(parse("bytes=2-5", 10), ByteRange::Partial { start: 2, end: 5 });
        assert_eq!(parse("bytes=4-", 10), ByteRange::Partial { start: 4, end: 9 });
        assert_eq!(parse("bytes=0-0", 10), ByteRange::Partial { start: 0, end: 0 });
    }

    #[test]
    fn end_is_clamped_to_file() {
        assert_eq!(parse("bytes=5-100", 10), ByteRange::Partial { start: 5, end: 9 });
    }

    #[test]
    fn suffix_range_counts_from_the_end() {
        assert_eq!(parse("bytes=-3", 10), ByteRange::Partial { start: 7, end: 9 });
        assert_eq!(parse("bytes=-30", 10), ByteRange::Partial { start: 0, end: 9 });
        assert_eq!(parse("bytes=-0", 10), ByteRange::Unsatisfiable);
    }

    #[test]
    fn inverted_or_out_of_file_ranges_are_unsatisfiable() {
        assert_eq!(parse("bytes=5-2", 10), ByteRange::Unsatisfiable);
        assert_eq!(parse("bytes=10-", 10), ByteRange::Unsatisfiable);
        assert_eq!(parse("bytes=0-", 0), ByteRange::Unsatisfiable);
    }

    #[test]
    fn malformed_headers_are_ignored() {
        assert_eq!(parse("bytes=a-b", 10), ByteRange::Full);
        assert_eq!(parse("bytes=1-2,4-5", 10), ByteRange::Full);
        assert_eq!(parse("items=1-2", 10), ByteRange::Full);
        assert_eq!(parse("bytes=5", 10), ByteRange::Full);
    }
}
