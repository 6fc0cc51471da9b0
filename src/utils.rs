//! Href helpers shared by the STAC and dataset modules.

use std::path::{Component, Path, PathBuf};

use url::Url;

/// Returns true if `href` is a network location: an `http*` scheme followed
/// by a non-empty authority.
///
/// Anything that does not parse as a URL is treated as a local path.
pub fn is_url(href: &str) -> bool {
    let Ok(url) = Url::parse(href) else {
        return false;
    };

    if !url.scheme().starts_with("http") {
        return false;
    }

    // The url crate is lenient with special schemes ("http:host", "http:///x"),
    // so check the raw authority as written.
    let Some(authority) = href
        .get(url.scheme().len() + 1..)
        .and_then(|rest| rest.strip_prefix("//"))
    else {
        return false;
    };
    let authority = authority
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    !authority.is_empty() && url.host_str().is_some_and(|h| !h.is_empty())
}

/// Returns true if `href` can be used without a base: any URL with a scheme,
/// or an absolute filesystem path.
pub fn is_absolute_href(href: &str) -> bool {
    match Url::parse(href) {
        // Single-letter schemes are Windows drive letters, not URLs
        Ok(url) if url.scheme().len() > 1 => true,
        _ => Path::new(href).is_absolute(),
    }
}

/// Resolve `href` against the location of the document that declared it.
///
/// Returns `None` when `href` is relative and there is no base to resolve it
/// against.
pub fn make_absolute_href(href: &str, base: Option<&str>) -> Option<String> {
    if is_absolute_href(href) {
        return Some(href.to_string());
    }

    let base = base?;
    if is_absolute_href(base) && !Path::new(base).is_absolute() {
        let base = Url::parse(base).ok()?;
        return base.join(href).ok().map(|u| u.to_string());
    }

    let parent = Path::new(base).parent().unwrap_or(Path::new(""));
    Some(normalize_path(&parent.join(href)).to_string_lossy().into_owned())
}

/// Convert an absolute local href (plain path or `file://` URL) to a path.
pub fn local_path(href: &str) -> PathBuf {
    match Url::parse(href) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .unwrap_or_else(|()| PathBuf::from(href)),
        _ => PathBuf::from(href),
    }
}

/// Lexically collapse `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if last_is_normal {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url_accepts_http_family() {
        assert!(is_url("http://example.com"));
        assert!(is_url("https://example.com/path/item.json"));
        assert!(is_url("HTTPS://EXAMPLE.COM/a"));
        assert!(is_url("http://localhost:8080/x?y=1"));
        assert!(is_url("https://user:pw@example.com/"));
    }

    #[test]
    fn test_is_url_rejects_everything_else() {
        assert!(!is_url(""));
        assert!(!is_url("catalog.json"));
        assert!(!is_url("/data/catalog.json"));
        assert!(!is_url("./relative/dir"));
        assert!(!is_url("s3://bucket/key"));
        assert!(!is_url("file:///tmp/a.tif"));
        assert!(!is_url("ftp://example.com/file"));
        assert!(!is_url("mailto:someone@example.com"));
        assert!(!is_url("http:example.com"));
        assert!(!is_url("http:///nohost"));
        assert!(!is_url("https://"));
    }

    #[test]
    fn test_is_absolute_href() {
        assert!(is_absolute_href("https://example.com/a.tif"));
        assert!(is_absolute_href("s3://bucket/a.tif"));
        assert!(is_absolute_href("/data/a.tif"));
        assert!(!is_absolute_href("a.tif"));
        assert!(!is_absolute_href("./a.tif"));
        assert!(!is_absolute_href("../a.tif"));
    }

    #[test]
    fn test_make_absolute_href_against_url() {
        assert_eq!(
            make_absolute_href("band1.tif", Some("https://example.com/items/item.json")),
            Some("https://example.com/items/band1.tif".to_string())
        );
        assert_eq!(
            make_absolute_href("../shared/dem.tif", Some("https://example.com/items/item.json")),
            Some("https://example.com/shared/dem.tif".to_string())
        );
    }

    #[test]
    fn test_make_absolute_href_against_path() {
        assert_eq!(
            make_absolute_href("./image.tif", Some("/data/catalog/output/output.json")),
            Some("/data/catalog/output/image.tif".to_string())
        );
        assert_eq!(
            make_absolute_href("../other/a.tif", Some("/data/catalog/output/output.json")),
            Some("/data/catalog/other/a.tif".to_string())
        );
    }

    #[test]
    fn test_make_absolute_href_keeps_absolute_and_needs_base() {
        assert_eq!(
            make_absolute_href("/abs/a.tif", None),
            Some("/abs/a.tif".to_string())
        );
        assert_eq!(
            make_absolute_href("https://h/a.tif", Some("/data/item.json")),
            Some("https://h/a.tif".to_string())
        );
        assert_eq!(make_absolute_href("a.tif", None), None);
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("/tmp/a.tif"), PathBuf::from("/tmp/a.tif"));
        assert_eq!(local_path("file:///tmp/a.tif"), PathBuf::from("/tmp/a.tif"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }
}
