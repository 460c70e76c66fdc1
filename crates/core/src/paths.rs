//! Repository path helpers.
//!
//! A repository path is always relative to the configured base URL: no scheme, no host,
//! no leading or trailing slash. These helpers convert between that form, request URLs
//! and the hrefs a WebDAV server reports.

use crate::constants::COLLECTION_ROOT_MARKER;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// Everything outside RFC 3986 unreserved, except the segment separator.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Joins `relative` onto `base` with exactly one separating slash.
///
/// An empty `relative` yields the base itself followed by a slash, which addresses the
/// repository root collection.
pub fn join(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// Converts a URL-decoded href from a WebDAV response into a repository path.
///
/// If the href contains the collection root marker only the suffix after its first
/// occurrence is kept; otherwise the href is used unchanged. Leading and trailing
/// slashes are stripped either way. An empty result denotes the collection root.
pub fn normalize_href(href: &str) -> String {
    let rel = match href.find(COLLECTION_ROOT_MARKER) {
        Some(idx) => &href[idx + COLLECTION_ROOT_MARKER.len()..],
        None => href,
    };
    rel.trim_matches('/').to_owned()
}

/// Normalizes a caller supplied repository path (slashes stripped).
pub fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Percent-decodes `raw`, replacing invalid UTF-8 sequences.
pub fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Percent-encodes a repository path for use in a request URL, keeping `/`.
///
/// Names decoded from a listing may contain `#`, `?` or `%`; sent raw they would be
/// read as a fragment, a query or a broken escape.
pub fn encode(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// Returns `path` relative to `root`.
///
/// The `root` prefix and one separating slash are removed. Paths outside `root` are
/// returned unchanged; an empty `root` leaves every path as is.
pub fn relative_to<'a>(root: &str, path: &'a str) -> &'a str {
    let root = normalize(root);
    if root.is_empty() {
        return path;
    }
    path.strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

/// Every proper directory prefix of `path`, shortest first.
///
/// `docs/new/file.dita` yields `docs` then `docs/new`.
pub fn ancestors(path: &str) -> Vec<String> {
    let parts: Vec<&str> = normalize(path).split('/').collect();
    (1..parts.len()).map(|n| parts[..n].join("/")).collect()
}

/// Last segment of a repository path, or `None` for the root.
pub fn file_name(path: &str) -> Option<&str> {
    normalize(path).rsplit('/').next().filter(|s| !s.is_empty())
}
