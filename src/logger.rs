//! Access logging for the socket transport.
//!
//! Entries are rendered in one of three formats and emitted through the
//! `log` facade under the `access` target, so applications pick the sink by
//! installing whatever logger implementation they like:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format)
//! - `json` (one serde-serialized object per line)

use chrono::Local;
use serde::Serialize;

/// One served request, captured after the response was written.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    /// Client IP address.
    pub remote_addr: String,
    /// Completion timestamp.
    #[serde(serialize_with = "rfc3339")]
    pub time: chrono::DateTime<Local>,
    /// HTTP method.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    /// Response status code.
    pub status: u16,
    /// Response body size in bytes.
    pub body_bytes: usize,
    /// User-Agent header.
    pub user_agent: Option<String>,
    /// Processing time in microseconds, accept to last byte.
    pub request_time_us: u64,
}

fn rfc3339<S: serde::Serializer>(
    time: &chrono::DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339())
}

impl AccessLogEntry {
    pub fn new(remote_addr: String, method: String, url: &str) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (url.to_string(), None),
        };
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query,
            status: 200,
            body_bytes: 0,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Render in the named format; unrecognized names fall back to `common`.
    #[must_use]
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "json" => self.format_json(),
            _ => self.format_common(),
        }
    }

    /// Render and emit at info level under the `access` target.
    pub fn emit(&self, format: &str) {
        log::info!(target: "access", "{}", self.format(format));
    }

    fn request_line(&self) -> String {
        let query = self
            .query
            .as_ref()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();
        format!("{} {}{query} HTTP/1.1", self.method, self.path)
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes "$ua"`
    fn format_combined(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {} \"{}\"",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line(),
            self.status,
            self.body_bytes,
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            log::error!("failed to serialize access log entry: {err}");
            String::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "GET".to_string(),
            "/api/users?page=1",
        );
        entry.status = 200;
        entry.body_bytes = 1234;
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.request_time_us = 1500;
        entry
    }

    #[test]
    fn url_is_split_into_path_and_query() {
        let entry = entry();
        assert_eq!(entry.path, "/api/users");
        assert_eq!(entry.query.as_deref(), Some("page=1"));
    }

    #[test]
    fn combined_format() {
        let log = entry().format("combined");
        assert!(log.contains("192.168.1.1"));
        assert!(log.contains("\"GET /api/users?page=1 HTTP/1.1\""));
        assert!(log.contains("200 1234"));
        assert!(log.contains("Mozilla/5.0"));
    }

    #[test]
    fn common_format_omits_user_agent() {
        let log = entry().format("common");
        assert!(log.contains("200 1234"));
        assert!(!log.contains("Mozilla"));
    }

    #[test]
    fn json_format_is_valid_json() {
        let log = entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["status"], 200);
        assert_eq!(value["query"], "page=1");
    }

    #[test]
    fn unknown_format_falls_back_to_common() {
        let entry = entry();
        assert_eq!(entry.format("nope"), entry.format("common"));
    }
}
