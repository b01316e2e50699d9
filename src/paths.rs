//! Build-context path canonicalization.
//!
//! Copy sources and mount selectors in the build graph are rooted at the
//! context root (`/foo/bar`, sometimes `foo/./bar` or `/a/../b`). Callers
//! compare them against repository-relative file lists, so every path is
//! cleaned lexically and re-expressed relative to `/`.

/// Canonicalize a context path into context-relative form.
///
/// The path is cleaned as if rooted at `/`: empty and `.` segments are
/// dropped, `..` removes the previous segment and never climbs above the
/// root. The result has no leading separator; the root itself is `.`.
///
/// This is purely lexical and cannot fail.
///
/// # Examples
///
/// ```rust
/// use buildinputs::paths::canonicalize;
///
/// assert_eq!(canonicalize("/foo/../bar"), "bar");
/// assert_eq!(canonicalize("codeserver//ubi9-python-3.12/./test"), "codeserver/ubi9-python-3.12/test");
/// assert_eq!(canonicalize("/"), ".");
/// ```
pub fn canonicalize(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() { ".".to_string() } else { segments.join("/") }
}

/// Whether `path` equals `ancestor` or lies underneath it.
///
/// Both arguments must already be canonical. The context root `.` is an
/// ancestor of everything.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == "." || path == ancestor {
        return true;
    }
    path.strip_prefix(ancestor).is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_resolves_dot_segments() {
        assert_eq!(canonicalize("/a/b/../c"), "a/c");
        assert_eq!(canonicalize("/./a"), "a");
        assert_eq!(canonicalize("/foo/../bar"), "bar");
    }

    #[test]
    fn test_canonicalize_relative_and_repeated_separators() {
        assert_eq!(canonicalize("foo"), "foo");
        assert_eq!(canonicalize("foo//bar/"), "foo/bar");
        assert_eq!(canonicalize("./foo/./bar/."), "foo/bar");
    }

    #[test]
    fn test_canonicalize_never_escapes_root() {
        assert_eq!(canonicalize("/../../etc/passwd"), "etc/passwd");
        assert_eq!(canonicalize(".."), ".");
        assert_eq!(canonicalize(""), ".");
        assert_eq!(canonicalize("/"), ".");
    }

    #[test]
    fn test_canonicalize_keeps_wildcards() {
        assert_eq!(canonicalize("/patches/*.patch"), "patches/*.patch");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("foo/bar", "foo"));
        assert!(is_within("foo", "foo"));
        assert!(is_within("anything/at/all", "."));
        assert!(!is_within("foobar", "foo"));
        assert!(!is_within("foo", "foo/bar"));
    }
}
