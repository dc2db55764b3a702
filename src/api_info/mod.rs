//! Response metadata extracted from API response headers.

use reqwest::header::HeaderMap;
use std::collections::HashMap;

/// Link relations captured from the `Link` header. Closed set; any other
/// relation is never captured.
const LINK_RELATIONS: [&str; 4] = ["next", "prev", "first", "last"];

/// Extra information returned as part of each API response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiInfo {
    links: HashMap<String, String>,
    oauth_scopes: Vec<String>,
    accepted_oauth_scopes: Vec<String>,
    etag: Option<String>,
}

impl ApiInfo {
    /// Parses response metadata from raw response headers.
    ///
    /// Absent headers are the normal case and never an error: links default
    /// to an empty map, scope lists to empty vecs, the etag to `None`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let oauth_scopes = parse_scopes(headers, "x-oauth-scopes");
        let accepted_oauth_scopes = parse_scopes(headers, "x-accepted-oauth-scopes");

        let etag = headers
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let links = headers
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(parse_links)
            .unwrap_or_default();

        Self {
            links,
            oauth_scopes,
            accepted_oauth_scopes,
            etag,
        }
    }

    /// Links to things like the next and previous pages, keyed by relation
    /// name.
    pub fn links(&self) -> &HashMap<String, String> {
        &self.links
    }

    /// OAuth scopes that were included in the token used to make the request.
    pub fn oauth_scopes(&self) -> &[String] {
        &self.oauth_scopes
    }

    /// OAuth scopes accepted for this particular call.
    pub fn accepted_oauth_scopes(&self) -> &[String] {
        &self.accepted_oauth_scopes
    }

    /// Verbatim `ETag` header value, if one was present.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }
}

fn parse_scopes(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

// Parsing stops at the first malformed or unknown segment, silently dropping
// the rest. A malformed header can therefore yield a partial link map.
fn parse_links(value: &str) -> HashMap<String, String> {
    let mut links = HashMap::new();

    for segment in value.split(',') {
        let Some(rel) = extract_rel(segment) else {
            break;
        };
        let Some(uri) = extract_uri(segment) else {
            break;
        };
        links.insert(rel.to_string(), uri.to_string());
    }

    links
}

/// Extracts the relation name from a `rel="..."` attribute. Relations outside
/// the closed set are treated as a non-match.
fn extract_rel(segment: &str) -> Option<&str> {
    let start = segment.find("rel=\"")? + "rel=\"".len();
    let rest = &segment[start..];
    let end = rest.find('"')?;
    let rel = &rest[..end];
    LINK_RELATIONS.contains(&rel).then_some(rel)
}

/// Extracts the URI between the outermost `<` and `>`.
fn extract_uri(segment: &str) -> Option<&str> {
    let start = segment.find('<')? + 1;
    let end = segment.rfind('>')?;
    (start < end).then(|| &segment[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(entries: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.insert(
                reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_empty_headers() {
        let info = ApiInfo::from_headers(&HeaderMap::new());
        assert!(info.links().is_empty());
        assert!(info.oauth_scopes().is_empty());
        assert!(info.accepted_oauth_scopes().is_empty());
        assert_eq!(info.etag(), None);
    }

    #[test]
    fn test_single_link() {
        let info = ApiInfo::from_headers(&headers(&[("Link", "<http://x/2>; rel=\"next\"")]));
        assert_eq!(info.links().get("next").unwrap(), "http://x/2");
        assert_eq!(info.links().len(), 1);
    }

    #[test]
    fn test_full_link_header() {
        let value = "<http://x/1>; rel=\"first\", <http://x/2>; rel=\"prev\", \
                     <http://x/4>; rel=\"next\", <http://x/5>; rel=\"last\"";
        let info = ApiInfo::from_headers(&headers(&[("Link", value)]));
        assert_eq!(info.links().len(), 4);
        assert_eq!(info.links().get("first").unwrap(), "http://x/1");
        assert_eq!(info.links().get("last").unwrap(), "http://x/5");
    }

    #[test]
    fn test_unknown_relation_stops_parsing() {
        let value = "<http://x/9>; rel=\"alternate\", <http://x/2>; rel=\"next\"";
        let info = ApiInfo::from_headers(&headers(&[("Link", value)]));
        assert!(info.links().is_empty());
    }

    #[test]
    fn test_malformed_segment_drops_remainder() {
        let value = "<http://x/2>; rel=\"next\", no-uri-here; rel=\"prev\", \
                     <http://x/5>; rel=\"last\"";
        let info = ApiInfo::from_headers(&headers(&[("Link", value)]));
        assert_eq!(info.links().len(), 1);
        assert_eq!(info.links().get("next").unwrap(), "http://x/2");
        assert!(info.links().get("last").is_none());
    }

    #[test]
    fn test_scopes_split_and_trimmed() {
        let info = ApiInfo::from_headers(&headers(&[
            ("X-OAuth-Scopes", "repo, admin:org , , gist"),
            ("X-Accepted-OAuth-Scopes", "repo"),
        ]));
        assert_eq!(info.oauth_scopes(), ["repo", "admin:org", "gist"]);
        assert_eq!(info.accepted_oauth_scopes(), ["repo"]);
    }

    #[test]
    fn test_etag_verbatim() {
        let info = ApiInfo::from_headers(&headers(&[("ETag", "\"abc123\"")]));
        assert_eq!(info.etag(), Some("\"abc123\""));
    }

    #[test]
    fn test_clone_is_deep() {
        let original = ApiInfo::from_headers(&headers(&[("Link", "<http://x/2>; rel=\"next\"")]));
        let mut copy = original.clone();
        copy.links.insert("prev".to_string(), "http://x/1".to_string());
        assert_eq!(original.links().len(), 1);
        assert_eq!(copy.links().len(), 2);
    }
}
