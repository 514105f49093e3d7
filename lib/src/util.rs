//! URL helpers shared by the persistence and access-control layers.

use anyhow::Result;
use url::Url;

/// Drops the fragment so that `https://pod/doc#me` and `https://pod/doc` compare equal.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split('#').next().unwrap_or(url).to_string(),
    }
}

/// `https://pod/a/b.ttl#x` -> `https://pod/a/b.ttl`, without reformatting the rest.
pub fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

pub fn is_container_url(url: &str) -> bool {
    strip_fragment(url).ends_with('/')
}

/// Returns the URL of the Container holding `url`, or `None` at the origin root.
pub fn get_parent_container_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_fragment(None);
    parsed.set_query(None);
    let path = parsed.path().to_string();
    if path == "/" || path.is_empty() {
        return None;
    }
    let trimmed = path.strip_suffix('/').unwrap_or(&path);
    let idx = trimmed.rfind('/')?;
    parsed.set_path(&trimmed[..=idx]);
    Some(parsed.to_string())
}

/// The root of the origin hosting `url`, e.g. `https://pod.example/`.
pub fn get_origin_root(url: &str) -> Result<String> {
    let mut parsed = Url::parse(url)?;
    parsed.set_fragment(None);
    parsed.set_query(None);
    parsed.set_path("/");
    Ok(parsed.to_string())
}

pub fn resolve_relative(base: &str, candidate: &str) -> String {
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return candidate.to_string();
    }
    match Url::parse(base) {
        Ok(base_url) => base_url
            .join(candidate)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| candidate.to_string()),
        Err(_) => candidate.to_string(),
    }
}

/// Appends a trailing slash when missing.
pub fn as_container_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_ignores_fragments() {
        assert_eq!(
            normalize_url("https://pod.example/doc#me"),
            normalize_url("https://pod.example/doc")
        );
        assert_eq!(strip_fragment("https://pod.example/c/#it"), "https://pod.example/c/");
        assert!(is_container_url("https://pod.example/c/#it"));
    }

    #[test]
    fn parent_containers() {
        assert_eq!(
            get_parent_container_url("https://pod.example/a/b/c.ttl").as_deref(),
            Some("https://pod.example/a/b/")
        );
        assert_eq!(
            get_parent_container_url("https://pod.example/a/b/").as_deref(),
            Some("https://pod.example/a/")
        );
        assert_eq!(
            get_parent_container_url("https://pod.example/a").as_deref(),
            Some("https://pod.example/")
        );
        assert_eq!(get_parent_container_url("https://pod.example/"), None);
    }

    #[test]
    fn relative_links_resolve_against_the_base() {
        assert_eq!(
            resolve_relative("https://pod.example/a/doc", "doc.acl"),
            "https://pod.example/a/doc.acl"
        );
        assert_eq!(
            resolve_relative("https://pod.example/a/doc", "https://other.example/x"),
            "https://other.example/x"
        );
        assert_eq!(get_origin_root("https://pod.example/a/b?q#f").unwrap(), "https://pod.example/");
    }
}
