// Socket server adapter
// Port probing, listener setup, TLS, the accept loop and file helpers

mod config;
pub mod files;
mod listener;
pub mod port;
mod serve;
mod tls;

pub use config::ServerConfig;
pub use serve::Server;
pub use tls::TlsConfig;
