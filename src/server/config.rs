//! Socket server configuration.
//!
//! Layered the usual way: built-in defaults, then an optional config file,
//! then `WICKET_*` environment variables. `ServerConfig::default()` skips the
//! file and environment sources for programmatic use.

use serde::Deserialize;

use crate::error::Error;
use crate::server::tls::TlsConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind; `0` probes for a free port starting at
    /// [`ServerConfig::PROBE_START`].
    pub port: u16,
    /// How many ports past the requested one the probe may scan.
    pub port_probe_span: u16,
    /// HTTP/1.1 keep-alive on served connections.
    pub keep_alive: bool,
    /// Per-connection timeout in seconds; `0` disables it.
    pub request_timeout: u64,
    /// Emit one access log line per served request.
    pub access_log: bool,
    /// Access log format name, see [`crate::logger::AccessLogEntry::format`].
    pub access_log_format: String,
    /// Serve TLS when set.
    pub tls: Option<TlsConfig>,
}

impl ServerConfig {
    /// First port tried when `port` is `0`.
    pub const PROBE_START: u16 = 8000;

    /// Load from `wicket.toml` (or `wicket.{json,yaml,...}`) in the working
    /// directory plus `WICKET_*` environment overrides.
    pub fn load() -> Result<Self, Error> {
        Self::load_from("wicket")
    }

    /// Load from the named config file (extension inferred). The file is
    /// optional; defaults and environment overrides always apply.
    pub fn load_from(config_path: &str) -> Result<Self, Error> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("WICKET"))
            .set_default("host", "127.0.0.1")?
            .set_default("port", 0)?
            .set_default("port_probe_span", 10)?
            .set_default("keep_alive", true)?
            .set_default("request_timeout", 30)?
            .set_default("access_log", true)?
            .set_default("access_log_format", "combined")?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Fixed-port convenience constructor.
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            port_probe_span: 10,
            keep_alive: true,
            request_timeout: 30,
            access_log: true,
            access_log_format: "combined".to_string(),
            tls: None,
        }
    }
}
