//! Port availability probing.
//!
//! A port is considered free when a bind on it succeeds; the probe listener
//! is dropped immediately, so there is an unavoidable window between probe
//! and real bind. The server tolerates that by treating the probe result as
//! a hint and surfacing the bind error if the race is lost.

use tokio::net::TcpListener;

use crate::error::Error;

/// Whether `host:port` can be bound right now.
pub async fn is_free(host: &str, port: u16) -> bool {
    TcpListener::bind((host, port)).await.is_ok()
}

/// Scan `start..=start+span` for the first bindable port.
pub async fn next_free(host: &str, start: u16, span: u16) -> Option<u16> {
    let end = start.saturating_add(span);
    for port in start..=end {
        if is_free(host, port).await {
            return Some(port);
        }
    }
    None
}

/// Verify the requested port is bindable; on failure the error carries the
/// nearest free port above it as a suggestion, when one exists within `span`.
pub async fn check(host: &str, port: u16, span: u16) -> Result<(), Error> {
    if is_free(host, port).await {
        return Ok(());
    }
    let suggestion = match port.checked_add(1) {
        Some(next) => next_free(host, next, span).await,
        None => None,
    };
    Err(Error::PortUnavailable { port, suggestion })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn busy_port_is_reported_with_a_suggestion() {
        let holder = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let busy = holder.local_addr().unwrap().port();

        assert!(!is_free("127.0.0.1", busy).await);
        let err = check("127.0.0.1", busy, 10).await.unwrap_err();
        match err {
            Error::PortUnavailable { port, suggestion } => {
                assert_eq!(port, busy);
                assert!(suggestion.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn free_port_checks_clean() {
        let probe = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        assert!(check("127.0.0.1", port, 10).await.is_ok());
    }

    #[tokio::test]
    async fn next_free_skips_past_a_busy_port() {
        let holder = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let busy = holder.local_addr().unwrap().port();

        let found = next_free("127.0.0.1", busy, 10).await;
        assert!(found.is_some());
        assert_ne!(found, Some(busy));
    }
}
