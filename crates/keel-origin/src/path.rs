//! Request path normalization and classification.

/// Decode percent-escapes in a path, keeping malformed escapes literal.
///
/// The output is still a path, so decoding never fails: a stray `%` or a
/// non-hex escape passes through as-is and classification sees a stable
/// string.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = hex_value(bytes[i + 1]);
            let lo = hex_value(bytes[i + 2]);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Normalize a raw request target into a safe site-root-relative path.
///
/// URL-decodes, strips query and fragment, collapses `.` and `..` segments.
/// Any path that would escape the site root collapses to `/`, so traversal
/// never reaches the static file server.
pub fn normalize_request_path(raw: &str) -> String {
    let target = raw.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_decode(target);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return "/".to_string();
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// File extension of the last path segment, if any.
pub fn file_extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Whether a normalized path should be treated as a static asset.
///
/// A static asset is any path that is not `/` and carries a file extension
/// other than `.html`; extensionless paths are navigable pages.
pub fn is_asset_path(path: &str) -> bool {
    if path == "/" {
        return false;
    }
    match file_extension(path) {
        Some(ext) => !ext.eq_ignore_ascii_case("html"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_paths() {
        assert_eq!(normalize_request_path("/"), "/");
        assert_eq!(normalize_request_path("/pricing"), "/pricing");
        assert_eq!(normalize_request_path("/blog/post-1"), "/blog/post-1");
        assert_eq!(normalize_request_path("/blog/"), "/blog");
    }

    #[test]
    fn test_normalize_strips_query_and_fragment() {
        assert_eq!(normalize_request_path("/pricing?plan=pro"), "/pricing");
        assert_eq!(normalize_request_path("/docs#install"), "/docs");
    }

    #[test]
    fn test_normalize_collapses_dot_segments() {
        assert_eq!(normalize_request_path("/a/./b"), "/a/b");
        assert_eq!(normalize_request_path("/a/b/../c"), "/a/c");
        assert_eq!(normalize_request_path("/a//b"), "/a/b");
    }

    #[test]
    fn test_traversal_collapses_to_root() {
        assert_eq!(normalize_request_path("/../etc/passwd"), "/");
        assert_eq!(normalize_request_path("/a/../../etc/passwd"), "/");
        assert_eq!(normalize_request_path("/.."), "/");
    }

    #[test]
    fn test_encoded_traversal_collapses_to_root() {
        assert_eq!(normalize_request_path("/%2e%2e/etc/passwd"), "/");
        assert_eq!(normalize_request_path("/a/%2E%2E/%2e%2e/secret"), "/");
    }

    #[test]
    fn test_malformed_escape_kept_literal() {
        assert_eq!(normalize_request_path("/a%zz"), "/a%zz");
        assert_eq!(normalize_request_path("/trailing%"), "/trailing%");
    }

    #[test]
    fn test_asset_classification() {
        assert!(is_asset_path("/logo.svg"));
        assert!(is_asset_path("/assets/app-abc123.js"));
        assert!(is_asset_path("/robots.txt"));
        assert!(!is_asset_path("/"));
        assert!(!is_asset_path("/pricing"));
        assert!(!is_asset_path("/page.html"));
        assert!(!is_asset_path("/page.HTML"));
        assert!(!is_asset_path("/.well-known"));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("/a/b.css"), Some("css"));
        assert_eq!(file_extension("/a/b"), None);
        assert_eq!(file_extension("/a/.hidden"), None);
    }
}
