//! Minimal HTTP routing library.
//!
//! A [`Router`] matches incoming requests against `"METHOD /path/:param"`
//! specs, runs an ordered first-response-wins handler chain, then threads the
//! result through every matching afterware. Two adapters turn the pipeline
//! into a server: [`server::Server`] speaks HTTP/1.x over a TCP socket (plain
//! or TLS) and [`edge::EdgeRouter`] wraps a platform request/response pair.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wicket::http::{json, Request};
//! use wicket::routing::{Env, RouteResult, Router};
//! use wicket::server::{Server, ServerConfig};
//!
//! async fn hello(_req: Arc<Request>, _env: Env) -> RouteResult {
//!     Ok(Some(json(&serde_json::json!({ "message": "test" }))?.into()))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wicket::Error> {
//!     let mut router = Router::new();
//!     router.route("GET /hello", hello);
//!     let server = Server::listen(router, ServerConfig::default()).await?;
//!     println!("listening on port {}", server.port());
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod edge;
mod error;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use error::Error;
pub use http::{json, redirect, text, Request, Response};
pub use routing::{Env, Router, RouterConfig};
pub use server::files::{binary, file, template};
