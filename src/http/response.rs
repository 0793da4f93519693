//! The outbound response model.
//!
//! A `Response` is an owned value with move-style builder mutators: every
//! mutator consumes and returns the response, which is also how afterware
//! threads it through a chain. Factories set a sensible default Content-Type
//! that explicit `header` calls may override. Header keys are
//! case-insensitively unique but preserve the casing they were first set
//! with.

use http_body_util::Full;
use hyper::body::Bytes;
use serde::Serialize;
use serde_json::Value;

use super::template::{self, TemplateError};

/// Response content: template-renderable text or raw bytes.
#[derive(Debug, Clone)]
pub enum Body {
    Text(String),
    Binary(Bytes),
}

impl Body {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Self::Binary(b)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(b))
    }
}

/// Attributes appended to a `Set-Cookie` header, emitted verbatim.
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    pub max_age: Option<u64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<String>,
    pub same_site: Option<String>,
    pub http_only: bool,
    pub secure: bool,
}

impl CookieOptions {
    /// Shorthand for a `Max-Age`-only cookie.
    #[must_use]
    pub fn ttl(seconds: u64) -> Self {
        Self {
            max_age: Some(seconds),
            ..Self::default()
        }
    }

    fn attributes(&self) -> Vec<String> {
        let mut attrs = Vec::new();
        if let Some(max_age) = self.max_age {
            attrs.push(format!("Max-Age={max_age}"));
        }
        if let Some(ref domain) = self.domain {
            attrs.push(format!("Domain={domain}"));
        }
        if let Some(ref path) = self.path {
            attrs.push(format!("Path={path}"));
        }
        if let Some(ref expires) = self.expires {
            attrs.push(format!("Expires={expires}"));
        }
        if let Some(ref same_site) = self.same_site {
            attrs.push(format!("SameSite={same_site}"));
        }
        if self.http_only {
            attrs.push("HttpOnly".to_string());
        }
        if self.secure {
            attrs.push("Secure".to_string());
        }
        attrs
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    status_text: Option<String>,
    headers: Vec<(String, String)>,
    trailers: Vec<(String, String)>,
    body: Body,
}

/// Build a `text/plain` response.
#[must_use]
pub fn text(content: impl Into<String>) -> Response {
    Response::new(content.into()).header("Content-Type", "text/plain")
}

/// Build an `application/json` response from any serializable value.
pub fn json<T: Serialize>(value: &T) -> Result<Response, serde_json::Error> {
    Ok(Response::new(serde_json::to_string(value)?).header("Content-Type", "application/json"))
}

/// Build a 302 redirect to `url`. Use [`Response::status`] for other codes.
#[must_use]
pub fn redirect(url: &str) -> Response {
    Response::new("").status(302).header("Location", url)
}

impl Response {
    /// A 200 response with the given body and no headers.
    #[must_use]
    pub fn new(body: impl Into<Body>) -> Self {
        Self {
            status: 200,
            status_text: None,
            headers: Vec::new(),
            trailers: Vec::new(),
            body: body.into(),
        }
    }

    // ============== Builder mutators ==============

    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Override the derived reason phrase.
    #[must_use]
    pub fn status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    /// Set a header. Overwrites case-insensitively but keeps the casing of
    /// the first set.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        set_entry(&mut self.headers, name, value.into());
        self
    }

    /// Set a trailer, with the same key discipline as [`Response::header`].
    #[must_use]
    pub fn trailer(mut self, name: &str, value: impl Into<String>) -> Self {
        set_entry(&mut self.trailers, name, value.into());
        self
    }

    /// Replace the body, keeping status and headers.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a `Set-Cookie` header: `key=value; Attr=Val; ...`, attributes
    /// joined verbatim.
    #[must_use]
    pub fn cookie(self, name: &str, value: &str, opts: &CookieOptions) -> Self {
        let mut parts = vec![format!("{name}={value}")];
        parts.extend(opts.attributes());
        self.header("Set-Cookie", parts.join("; "))
    }

    // ============== Accessors ==============

    #[must_use]
    pub const fn code(&self) -> u16 {
        self.status
    }

    /// Reason phrase: the explicit override, the default for known codes, or
    /// empty for unknown ones.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.status_text
            .as_deref()
            .unwrap_or_else(|| default_status_text(self.status))
    }

    /// Look up a header, case-insensitively.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        get_entry(&self.headers, name)
    }

    #[must_use]
    pub fn trailer_value(&self, name: &str) -> Option<&str> {
        get_entry(&self.trailers, name)
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn trailers(&self) -> &[(String, String)] {
        &self.trailers
    }

    #[must_use]
    pub const fn body_ref(&self) -> &Body {
        &self.body
    }

    /// Body as text; empty for binary bodies.
    #[must_use]
    pub fn body_text(&self) -> &str {
        match &self.body {
            Body::Text(s) => s,
            Body::Binary(_) => "",
        }
    }

    #[must_use]
    pub fn body_bytes(&self) -> Bytes {
        match &self.body {
            Body::Text(s) => Bytes::from(s.clone()),
            Body::Binary(b) => b.clone(),
        }
    }

    // ============== Rendering ==============

    /// Render a text body against `scope` (a JSON object): first literal
    /// `{{ key }}` substitution, then restricted `${ expr }` interpolation.
    /// Binary bodies pass through untouched.
    pub fn render(self, scope: &Value) -> Result<Self, TemplateError> {
        let Body::Text(content) = &self.body else {
            return Ok(self);
        };
        let substituted = template::substitute(content, scope);
        let interpolated = template::interpolate(&substituted, scope)?;
        Ok(self.body(interpolated))
    }

    // ============== Wire adaptation ==============

    /// Serialize into a hyper response. Invalid status codes become 500;
    /// header names or values hyper rejects are skipped with an error log.
    /// Custom reason phrases and trailers are not expressible on this
    /// transport and are dropped.
    #[must_use]
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status = hyper::StatusCode::from_u16(self.status)
            .unwrap_or(hyper::StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = hyper::Response::builder().status(status);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in &self.headers {
                let Ok(name) = hyper::header::HeaderName::try_from(name.as_str()) else {
                    log::error!("skipping invalid header name {name:?}");
                    continue;
                };
                let Ok(value) = hyper::header::HeaderValue::try_from(value.as_str()) else {
                    log::error!("skipping invalid value for header {name}");
                    continue;
                };
                headers.insert(name, value);
            }
        }
        let body = self.body_bytes();
        builder.body(Full::new(body)).unwrap_or_else(|e| {
            log::error!("failed to build hyper response: {e}");
            hyper::Response::new(Full::new(Bytes::new()))
        })
    }
}

fn set_entry(entries: &mut Vec<(String, String)>, name: &str, value: String) {
    if let Some(entry) = entries
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
    {
        entry.1 = value;
    } else {
        entries.push((name.to_string(), value));
    }
}

fn get_entry<'a>(entries: &'a [(String, String)], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Reason phrases for the status codes the library itself produces.
#[must_use]
pub fn default_status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        504 => "Gateway Timeout",
        _ => "",
    }
}
