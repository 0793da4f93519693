//! The inbound request model.
//!
//! A `Request` is built once per inbound request by a server adapter and
//! shared (via `Arc`) through the whole pipeline. Headers are keyed
//! case-insensitively. The JSON body, query string and cookies are parsed on
//! first access and memoized; none of the parsers ever fail, malformed input
//! simply yields nothing. The parameter bag is interior-mutable so the
//! matching handler can populate it exactly once per dispatch.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use hyper::body::Bytes;
use hyper::HeaderMap;
use serde_json::Value;

pub struct Request {
    method: String,
    url: String,
    headers: HashMap<String, String>,
    trailers: HashMap<String, String>,
    body: Bytes,
    params: RwLock<HashMap<String, String>>,
    query: OnceLock<HashMap<String, String>>,
    json: OnceLock<Option<Value>>,
    cookies: OnceLock<HashMap<String, String>>,
}

impl Request {
    /// Build a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            headers: HashMap::new(),
            trailers: HashMap::new(),
            body: Bytes::new(),
            params: RwLock::new(HashMap::new()),
            query: OnceLock::new(),
            json: OnceLock::new(),
            cookies: OnceLock::new(),
        }
    }

    /// Add a header (key stored lowercased).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Add a trailer (key stored lowercased).
    #[must_use]
    pub fn with_trailer(mut self, name: &str, value: &str) -> Self {
        self.trailers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Set the (fully buffered) body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adapt a decomposed `http` request, as produced by the socket and edge
    /// adapters. Header values that are not valid UTF-8 are skipped.
    #[must_use]
    pub fn from_parts(
        parts: &hyper::http::request::Parts,
        body: Bytes,
        trailers: Option<&HeaderMap>,
    ) -> Self {
        let url = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
        let mut request = Self::new(parts.method.as_str(), &url).with_body(body);
        request.headers = header_map_to_hash(&parts.headers);
        if let Some(trailers) = trailers {
            request.trailers = header_map_to_hash(trailers);
        }
        request
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Full request target: path plus any query string.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path portion of the URL (everything before the first `?`).
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }

    /// Look up a header, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn trailer(&self, name: &str) -> Option<&str> {
        self.trailers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text (lossy).
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Best-effort JSON parse of the body; `None` when the body is not valid
    /// JSON. Parsed once, memoized.
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        self.json
            .get_or_init(|| serde_json::from_slice(&self.body).ok())
            .as_ref()
    }

    /// A query-string value, URL-decoded.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_map().get(name).map(String::as_str)
    }

    /// All query-string pairs (last occurrence of a repeated key wins).
    #[must_use]
    pub fn query_map(&self) -> &HashMap<String, String> {
        self.query.get_or_init(|| {
            self.url
                .split_once('?')
                .map_or_else(HashMap::new, |(_, qs)| parse_query(qs))
        })
    }

    /// A cookie value, taken verbatim from the `Cookie` header (any embedded
    /// `=` is preserved).
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name).map(String::as_str)
    }

    #[must_use]
    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies
            .get_or_init(|| self.header("cookie").map_or_else(HashMap::new, parse_cookies))
    }

    /// A path parameter captured by the matching route pattern.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<String> {
        self.params.read().ok()?.get(name).cloned()
    }

    /// Snapshot of all captured path parameters.
    #[must_use]
    pub fn params(&self) -> HashMap<String, String> {
        self.params
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Called by the matching handler, before any callback runs.
    pub(crate) fn set_params(&self, params: Vec<(String, String)>) {
        if let Ok(mut guard) = self.params.write() {
            *guard = params.into_iter().collect();
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers.len())
            .field("body_bytes", &self.body.len())
            .finish()
    }
}

fn header_map_to_hash(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

/// Standard URL-encoded form rules: pairs split on `&`, `+` means space,
/// percent-escapes decoded. A pair without `=` maps to the empty string;
/// undecodable escapes are kept verbatim.
fn parse_query(qs: &str) -> HashMap<String, String> {
    qs.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map_or_else(|_| plus_decoded.clone(), |decoded| decoded.into_owned())
}

/// Cookie header parsing: split on `"; "`, then on the first `=`. Segments
/// without a `=` are silently skipped.
fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split("; ")
        .filter_map(|segment| {
            segment
                .split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_case_insensitive() {
        let req = Request::new("get", "/").with_header("Content-Type", "application/json");
        assert_eq!(req.method(), "GET");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn query_values_are_url_decoded() {
        let req = Request::new("GET", "/search?q=hello+world&lang=en%2Dus&flag");
        assert_eq!(req.query("q"), Some("hello world"));
        assert_eq!(req.query("lang"), Some("en-us"));
        assert_eq!(req.query("flag"), Some(""));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn path_strips_the_query_suffix() {
        let req = Request::new("GET", "/a/42?x=1");
        assert_eq!(req.path(), "/a/42");
        assert_eq!(req.url(), "/a/42?x=1");
    }

    #[test]
    fn json_parse_failure_yields_none() {
        let req = Request::new("POST", "/").with_body("{not json");
        assert!(req.json().is_none());
    }

    #[test]
    fn json_body_is_parsed_once() {
        let req = Request::new("POST", "/").with_body(r#"{"name":"Jason"}"#);
        assert_eq!(req.json().unwrap()["name"], "Jason");
        // Second access hits the memoized value.
        assert_eq!(req.json().unwrap()["name"], "Jason");
    }

    #[test]
    fn cookies_keep_embedded_equals_verbatim() {
        let req =
            Request::new("GET", "/").with_header("Cookie", "token=a=b=c; theme=dark; malformed");
        assert_eq!(req.cookie("token"), Some("a=b=c"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("malformed"), None);
        assert_eq!(req.cookies().len(), 2);
    }

    #[test]
    fn params_default_empty_and_are_settable_once_per_dispatch() {
        let req = Request::new("GET", "/a/42");
        assert_eq!(req.param("id"), None);
        req.set_params(vec![("id".to_string(), "42".to_string())]);
        assert_eq!(req.param("id"), Some("42".to_string()));
    }

    #[test]
    fn from_parts_carries_method_url_headers_and_body() {
        let (parts, ()) = hyper::Request::builder()
            .method("POST")
            .uri("http://localhost/a/1?x=2")
            .header("X-Custom", "yes")
            .body(())
            .unwrap()
            .into_parts();
        let req = Request::from_parts(&parts, Bytes::from_static(b"hello"), None);
        assert_eq!(req.method(), "POST");
        assert_eq!(req.url(), "/a/1?x=2");
        assert_eq!(req.header("x-custom"), Some("yes"));
        assert_eq!(req.body_text(), "hello");
    }
}
