//! Path canonicalization and segment splitting.
//!
//! Resource routers peel one segment off the request path at a time. Every
//! path is first brought into a canonical form that starts and ends with `/`,
//! so that `/orders/cus_1`, `/orders/cus_1/` and `/orders/./cus_1//` all reach
//! the same handler.

/// Normalize `path` into a rooted path that also ends with `/`.
///
/// Empty and `.` segments are dropped and `..` removes the previous segment.
/// A `..` at the root stays at the root.
///
/// ```
/// use swag_storefront::urlpath::clean;
///
/// assert_eq!(clean(""), "/");
/// assert_eq!(clean("orders/cus_1"), "/orders/cus_1/");
/// assert_eq!(clean("/a/./b/../c//"), "/a/c/");
/// ```
#[must_use]
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return "/".to_owned();
    }

    let mut cleaned = String::with_capacity(path.len() + 2);
    for segment in segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    cleaned.push('/');
    cleaned
}

/// Split the first segment off `path`.
///
/// Returns `(head, tail)` where `head` is the first segment of the cleaned
/// path and `tail` is the cleaned remainder. `tail` is `"/"` when no segments
/// remain; `head` is empty only for the root path.
///
/// ```
/// use swag_storefront::urlpath::split;
///
/// assert_eq!(split("/cus_abc123/id/here"), ("cus_abc123".to_owned(), "/id/here/".to_owned()));
/// assert_eq!(split("/42"), ("42".to_owned(), "/".to_owned()));
/// ```
#[must_use]
pub fn split(path: &str) -> (String, String) {
    let cleaned = clean(path);
    let rest = cleaned.strip_prefix('/').unwrap_or(&cleaned);
    match rest.split_once('/') {
        Some((head, tail)) => (head.to_owned(), clean(tail)),
        None => (rest.to_owned(), "/".to_owned()),
    }
}
