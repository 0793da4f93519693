//! TLS acceptor setup from PEM cert and key files.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use serde::Deserialize;
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;

use crate::error::Error;

/// Paths to the PEM-encoded certificate chain and private key.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_file: String,
    pub key_file: String,
}

/// Build an acceptor from the configured cert chain and key.
pub fn acceptor(config: &TlsConfig) -> Result<TlsAcceptor, Error> {
    let mut cert_reader = BufReader::new(
        File::open(&config.cert_file)
            .map_err(|err| Error::Tls(format!("cannot open {}: {err}", config.cert_file)))?,
    );
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| Error::Tls(format!("invalid certificate in {}: {err}", config.cert_file)))?;
    if certs.is_empty() {
        return Err(Error::Tls(format!(
            "no certificates found in {}",
            config.cert_file
        )));
    }

    let mut key_reader = BufReader::new(
        File::open(&config.key_file)
            .map_err(|err| Error::Tls(format!("cannot open {}: {err}", config.key_file)))?,
    );
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|err| Error::Tls(format!("invalid key in {}: {err}", config.key_file)))?
        .ok_or_else(|| Error::Tls(format!("no private key found in {}", config.key_file)))?;

    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| Error::Tls(err.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}
