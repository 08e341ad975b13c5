// src/mirror/links.rs
// =============================================================================
// This module turns a directory listing into the urls of its children.
//
// How it works:
// 1. Find every href="..." value in the listing with a loose pattern match
//    (not an HTML parser: listings from Apache, nginx, lighttpd, python's
//    http.server etc. are simple, and malformed markup must not stop us)
// 2. Unescape HTML entities so "a&amp;b" becomes the literal "a&b"
// 3. Resolve each href against the listing url (RFC 3986, like a browser)
// 4. Keep only links that point BELOW the listing, so "Parent Directory"
//    links and absolute links to elsewhere are never followed
//
// It also computes local names from url path segments (percent-decoded).
// =============================================================================

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // The pattern is a constant and known to be valid
    PATTERN.get_or_init(|| Regex::new(r#"href=['"]?([^'" >]+)"#).unwrap())
}

// Extracts every href value from a listing, in document order
//
// Example:
//   html = r#"<a href="sub/">sub</a><a href='a&amp;b.txt'>x</a>"#
//   result = ["sub/", "a&b.txt"]
pub fn extract_hrefs(html: &str) -> Vec<String> {
    href_pattern()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_entities(m.as_str()))
        .collect()
}

// Resolves an href found on `listing` to the absolute url of a child
//
// Returns None for links we never follow:
//   "#top", "?C=N;O=D" (sort links), mailto:, javascript:, tel:, data:,
//   anything that is not http(s), on another origin, or not below the
//   listing's own path (this includes "../" and the listing itself).
pub fn resolve_child(listing: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with('?')
        || href.starts_with("mailto:")
        || href.starts_with("javascript:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut child = listing.join(href).ok()?;
    child.set_fragment(None);

    if !is_http(&child) || child.origin() != listing.origin() {
        return None;
    }

    let parent_path = listing_path(listing);
    if child.path() == parent_path || !child.path().starts_with(&parent_path) {
        return None;
    }

    Some(child)
}

// Key used to recognise a url we have already seen
pub fn canonical_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

// Local name for a url: its last non-empty path segment, percent-decoded
//
//   http://x/data/         -> "data"
//   http://x/data/a%20b.txt -> "a b.txt"
//   http://x/               -> "x"   (no segment: fall back to the host)
pub fn segment_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last());

    match segment {
        Some(segment) => percent_decode(segment),
        None => url.host_str().unwrap_or_default().to_string(),
    }
}

fn percent_decode(segment: &str) -> String {
    let bytes = urlencoding::decode_binary(segment.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

// The path children must start with: the listing path, with a trailing slash
fn listing_path(listing: &Url) -> String {
    let path = listing.path();
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

fn is_http(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}

fn unescape_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is OnceLock?
//    - A cell written at most once, safe to share between threads
//    - The regex is compiled on first use and reused for every listing
//
// 2. Url::join vs string concatenation
//    - join follows RFC 3986, the same rules a browser uses
//    - "http://x/data/" joined with "../" is "http://x/", not
//      "http://x/data//../"
//
// 3. Why Cow from decode_binary?
//    - When nothing needs decoding the original bytes are borrowed, not copied
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Url {
        Url::parse("http://x/data/").unwrap()
    }

    #[test]
    fn test_extract_quoted_and_bare_hrefs() {
        let html = r#"<a href="sub/">sub</a><a href='file.txt'>file</a><a href=bare.bin>b</a>"#;
        assert_eq!(extract_hrefs(html), vec!["sub/", "file.txt", "bare.bin"]);
    }

    #[test]
    fn test_extract_tolerates_malformed_markup() {
        let html = r#"<pre><a href="one.txt">one</a><a href="two.txt"<a href="three/">"#;
        assert_eq!(extract_hrefs(html), vec!["one.txt", "two.txt", "three/"]);
    }

    #[test]
    fn test_extract_unescapes_entities() {
        let html = r#"<a href="rock&amp;roll.mp3">x</a>"#;
        assert_eq!(extract_hrefs(html), vec!["rock&roll.mp3"]);
    }

    #[test]
    fn test_resolve_relative_child() {
        let child = resolve_child(&listing(), "sub/").unwrap();
        assert_eq!(child.as_str(), "http://x/data/sub/");

        let child = resolve_child(&listing(), "file.txt#frag").unwrap();
        assert_eq!(child.as_str(), "http://x/data/file.txt");
    }

    #[test]
    fn test_resolve_absolute_child_inside_tree() {
        let child = resolve_child(&listing(), "/data/deep/f.bin").unwrap();
        assert_eq!(child.as_str(), "http://x/data/deep/f.bin");

        let child = resolve_child(&listing(), "http://x/data/g.bin").unwrap();
        assert_eq!(child.as_str(), "http://x/data/g.bin");
    }

    #[test]
    fn test_resolve_skips_links_leaving_the_tree() {
        assert_eq!(resolve_child(&listing(), "../"), None);
        assert_eq!(resolve_child(&listing(), "/"), None);
        assert_eq!(resolve_child(&listing(), "./"), None);
        assert_eq!(resolve_child(&listing(), "/database/"), None);
        assert_eq!(resolve_child(&listing(), "http://other/data/f.bin"), None);
        assert_eq!(resolve_child(&listing(), "https://x/data/f.bin"), None);
    }

    #[test]
    fn test_resolve_skips_special_links() {
        assert_eq!(resolve_child(&listing(), "?C=N;O=D"), None);
        assert_eq!(resolve_child(&listing(), "#top"), None);
        assert_eq!(resolve_child(&listing(), "mailto:a@x"), None);
        assert_eq!(resolve_child(&listing(), "javascript:void(0)"), None);
        assert_eq!(resolve_child(&listing(), "ftp://x/data/f"), None);
    }

    #[test]
    fn test_resolve_against_listing_without_slash() {
        // A listing served without its trailing slash still scopes to itself
        let listing = Url::parse("http://x/data").unwrap();
        assert_eq!(resolve_child(&listing, "/data/f.bin").unwrap().as_str(), "http://x/data/f.bin");
        assert_eq!(resolve_child(&listing, "/database"), None);
    }

    #[test]
    fn test_segment_name_is_percent_decoded() {
        let url = Url::parse("http://x/data/a%20b.txt").unwrap();
        assert_eq!(segment_name(&url), "a b.txt");

        let url = Url::parse("http://x/data/my%20dir/").unwrap();
        assert_eq!(segment_name(&url), "my dir");
    }

    #[test]
    fn test_segment_name_falls_back_to_host() {
        let url = Url::parse("http://mirror.example.org/").unwrap();
        assert_eq!(segment_name(&url), "mirror.example.org");
    }

    #[test]
    fn test_canonical_key_ignores_fragment() {
        let a = Url::parse("http://x/data/f.bin#part").unwrap();
        let b = Url::parse("http://x/data/f.bin").unwrap();
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }
}
