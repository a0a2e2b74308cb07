//! Shared helpers for provider modules: static regexes, landing-URL matching and API URLs.

use regex::Regex;
use url::Url;

use super::ResolveError;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Returns true if the DOI is absent or whitespace only.
#[must_use]
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Matches a landing URL against a provider pattern.
///
/// The pattern must capture the server base URL in group 1 and the record
/// identifier in group 2. Returns `None` unless both are present and the
/// server part parses as an absolute URL, so a match never yields partial
/// addressing.
#[must_use]
pub fn match_landing_url(pattern: &Regex, landing_url: &str) -> Option<(Url, String)> {
    let caps = pattern.captures(landing_url.trim())?;
    let server = caps.get(1)?.as_str();
    let record_id = clean_record_id(caps.get(2)?.as_str())?;
    let server = Url::parse(server).ok()?;
    server.host_str()?;
    Some((server, record_id))
}

/// Strips query, fragment and trailing slashes from a captured record id.
fn clean_record_id(raw: &str) -> Option<String> {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let id = raw[..end].trim().trim_end_matches('/');
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Builds `{server}/{segments...}`, percent-encoding each segment.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidConfig`] when `server` cannot carry a path.
pub fn api_url(provider: &str, server: &Url, segments: &[&str]) -> Result<Url, ResolveError> {
    let mut url = server.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut path = url.path_segments_mut().map_err(|()| {
            ResolveError::invalid_config(provider, format!("'{server}' cannot be used as an API base"))
        })?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        compile_static_regex(r"(?i)^(https?://[^/:]*example[^/:]*:?\d*)/records/(.+)")
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\n"));
        assert!(!is_blank("10.1/x"));
    }

    #[test]
    fn test_match_landing_url_extracts_server_and_record() {
        let (server, id) =
            match_landing_url(&pattern(), "https://repo.example.org:8443/records/abc123").unwrap();
        assert_eq!(server.as_str(), "https://repo.example.org:8443/");
        assert_eq!(id, "abc123");
    }

    #[test]
    fn test_match_landing_url_strips_query_and_trailing_slash() {
        let (_, id) =
            match_landing_url(&pattern(), "https://repo.example.org/records/abc/?tab=files").unwrap();
        assert_eq!(id, "abc");
    }

    #[test]
    fn test_match_landing_url_rejects_empty_record() {
        assert!(match_landing_url(&pattern(), "https://repo.example.org/records/?q=1").is_none());
    }

    #[test]
    fn test_match_landing_url_rejects_other_hosts() {
        assert!(match_landing_url(&pattern(), "https://other.org/records/abc").is_none());
    }

    #[test]
    fn test_match_landing_url_rejects_malformed_server() {
        // Matches the pattern but the port is out of range
        assert!(match_landing_url(&pattern(), "https://repo.example.org:99999/records/abc").is_none());
    }

    #[test]
    fn test_api_url_appends_encoded_segments() {
        let server = Url::parse("https://repo.example.org").unwrap();
        let url = api_url("p", &server, &["api", "records", "a b"]).unwrap();
        assert_eq!(url.as_str(), "https://repo.example.org/api/records/a%20b");
    }

    #[test]
    fn test_api_url_keeps_base_path() {
        let server = Url::parse("https://repo.example.org/mirror/").unwrap();
        let url = api_url("p", &server, &["api", "files", "bucket"]).unwrap();
        assert_eq!(url.as_str(), "https://repo.example.org/mirror/api/files/bucket");
    }

    #[test]
    fn test_api_url_rejects_cannot_be_base() {
        let server = Url::parse("mailto:someone@example.org").unwrap();
        let err = api_url("p", &server, &["api"]).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidConfig { .. }));
    }
}
