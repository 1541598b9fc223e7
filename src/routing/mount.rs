//! Physical document roots and URL-prefix mounts.
//!
//! # Responsibilities
//! - Resolve root directories to absolute paths at registration time
//! - Match request paths against mount prefixes
//! - Keep mounts ordered for longest-prefix resolution
//!
//! # Design Decisions
//! - Prefixes compare ASCII case-insensitively and respect segment
//!   boundaries (`/static` does not match `/staticx`)
//! - Order: longest prefix first, then exact host before wildcard host,
//!   then registration order

use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::config::WILDCARD_HOST;
use crate::error::ConfigurationError;

/// A resolved physical directory served as static content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRoot {
    root: PathBuf,
    browsable: bool,
}

impl DocumentRoot {
    /// Resolve `root` to an absolute directory, failing fast when it does
    /// not exist.
    pub fn resolve(root: impl AsRef<Path>, browsable: bool) -> Result<Self, ConfigurationError> {
        let given = root.as_ref();
        let root = std::fs::canonicalize(given).map_err(|source| {
            ConfigurationError::UnresolvableRoot {
                path: given.to_path_buf(),
                source,
            }
        })?;
        if !root.is_dir() {
            return Err(ConfigurationError::NotADirectory(root));
        }
        Ok(Self { root, browsable })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn browsable(&self) -> bool {
        self.browsable
    }
}

/// A document root mounted under a URL prefix on one host (or all hosts).
#[derive(Debug, Clone)]
pub struct StaticMount {
    host: String,
    prefix: String,
    document: Arc<DocumentRoot>,
}

impl StaticMount {
    /// `host` must already be normalized; `prefix` must start with `/`.
    pub(crate) fn new(host: String, prefix: &str, document: DocumentRoot) -> Self {
        Self {
            host,
            prefix: prefix.trim_end_matches('/').to_string(),
            document: Arc::new(document),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Prefix without trailing slash; the root mount has an empty prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn document(&self) -> &Arc<DocumentRoot> {
        &self.document
    }

    fn is_wildcard(&self) -> bool {
        self.host == WILDCARD_HOST
    }

    fn same_slot(&self, other: &StaticMount) -> bool {
        self.host == other.host && self.prefix.eq_ignore_ascii_case(&other.prefix)
    }

    /// If this mount serves `path` on `host`, return the remainder of the
    /// path after the prefix.
    pub fn strip<'a>(&self, host: &str, path: &'a str) -> Option<&'a str> {
        if !self.is_wildcard() && !self.host.eq_ignore_ascii_case(host) {
            return None;
        }
        let head = path.get(..self.prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }
        let rest = &path[self.prefix.len()..];
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// Insert `mount`, replacing any mount on the same (host, prefix), and
/// restore resolution order.
pub(crate) fn insert_mount(mounts: &mut Vec<StaticMount>, mount: StaticMount) {
    mounts.retain(|m| !m.same_slot(&mount));
    mounts.push(mount);
    // Stable: equal keys keep registration order.
    mounts.sort_by_key(|m| (Reverse(m.prefix.len()), m.is_wildcard()));
}
