// Crate error type
// Covers the fallible surface of the server adapters; routing itself
// reports callback failures through the pipeline, not through this enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("port {port} is not available{}", suggestion.map(|p| format!(". Suggestion: use {p} instead")).unwrap_or_default())]
    PortUnavailable { port: u16, suggestion: Option<u16> },

    #[error("no available port found in {start}..={end}")]
    NoAvailablePort { start: u16, end: u16 },

    #[error("invalid listen address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
