//! Virtual path to physical path resolution.
//!
//! # Design Decisions
//! - Normalization is lexical: `.` segments vanish, `..` pops a segment,
//!   and popping past the root is a traversal attempt
//! - `/` and `\` are both separators so a client cannot smuggle a
//!   platform separator through a single segment
//! - After normalization the result must still start with the root
//!   (ASCII case-insensitive, on a component boundary) before any I/O

use std::path::{Path, PathBuf};

/// Join `relative` onto `root` and normalize. `None` means the result would
/// escape `root`.
pub(crate) fn contained_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if s.contains('\0') || is_drive_prefix(s) => return None,
            s => segments.push(s),
        }
    }

    let mut absolute = root.to_path_buf();
    absolute.extend(segments);

    is_within(root, &absolute).then_some(absolute)
}

/// `C:` style segments would replace the root when joined on Windows.
fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

/// Case-insensitive string prefix check on a component boundary.
pub(crate) fn is_within(root: &Path, candidate: &Path) -> bool {
    let root = root.to_string_lossy();
    let candidate = candidate.to_string_lossy();
    let root = root.trim_end_matches(['/', '\\']);

    if candidate.len() < root.len() || !candidate.is_char_boundary(root.len()) {
        return false;
    }
    let (head, tail) = candidate.split_at(root.len());
    head.eq_ignore_ascii_case(root) && (tail.is_empty() || tail.starts_with(['/', '\\']))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/site")
    }

    #[test]
    fn plain_paths_resolve_under_root() {
        assert_eq!(
            contained_path(&root(), "css/app.css"),
            Some(PathBuf::from("/srv/site/css/app.css"))
        );
        assert_eq!(contained_path(&root(), ""), Some(root()));
        assert_eq!(
            contained_path(&root(), "/a//./b/"),
            Some(PathBuf::from("/srv/site/a/b"))
        );
    }

    #[test]
    fn dot_dot_inside_root_is_allowed() {
        assert_eq!(
            contained_path(&root(), "a/../b.txt"),
            Some(PathBuf::from("/srv/site/b.txt"))
        );
    }

    #[test]
    fn escaping_the_root_is_rejected() {
        assert_eq!(contained_path(&root(), "../etc/passwd"), None);
        assert_eq!(contained_path(&root(), "a/../../etc/passwd"), None);
        assert_eq!(contained_path(&root(), "..\\..\\etc\\passwd"), None);
        assert_eq!(contained_path(&root(), "a\\..\\..\\secret"), None);
    }

    #[test]
    fn drive_and_nul_segments_are_rejected() {
        assert_eq!(contained_path(&root(), "C:/Windows"), None);
        assert_eq!(contained_path(&root(), "a\0b"), None);
    }

    #[test]
    fn containment_is_case_insensitive_on_boundaries() {
        assert!(is_within(Path::new("/srv/Site"), Path::new("/SRV/site/x")));
        assert!(is_within(Path::new("/srv/site/"), Path::new("/srv/site")));
        assert!(!is_within(Path::new("/srv/site"), Path::new("/srv/sitex/y")));
        assert!(!is_within(Path::new("/srv/site"), Path::new("/srv")));
    }
}
