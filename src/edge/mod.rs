//! Edge adapter: the routing pipeline behind a platform request/response
//! pair instead of a socket.
//!
//! Edge runtimes hand over a fully-read request and expect either a response
//! or a signal to fall through to the next layer (origin fetch, static
//! assets). `None` from [`EdgeRouter::handle`] is that signal; configure the
//! inner router with `pass_through_on_exception` to get it for unrouted
//! requests.

use std::ops::{Deref, DerefMut};

use http_body_util::Full;
use hyper::body::Bytes;

use crate::http::Request;
use crate::routing::{Env, Router, RouterConfig};

/// A router exposed through platform `http` types.
///
/// Derefs to [`Router`], so routes are registered exactly as on the socket
/// transport.
#[derive(Default)]
pub struct EdgeRouter {
    router: Router,
}

impl EdgeRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            router: Router::with_config(config),
        }
    }

    /// Dispatch a platform request.
    ///
    /// Absolute-form URIs (as edge runtimes supply) are reduced to path plus
    /// query before matching. Returns `None` when the pipeline produced no
    /// response, which only happens with `pass_through_on_exception` set.
    pub async fn handle(
        &self,
        req: hyper::Request<Bytes>,
        env: Env,
    ) -> Option<hyper::Response<Full<Bytes>>> {
        let (parts, body) = req.into_parts();
        let request = Request::from_parts(&parts, body, None);
        let response = self.router.handle_with_env(request, env).await?;
        Some(response.into_hyper())
    }
}

impl From<Router> for EdgeRouter {
    fn from(router: Router) -> Self {
        Self { router }
    }
}

impl Deref for EdgeRouter {
    type Target = Router;

    fn deref(&self) -> &Router {
        &self.router
    }
}

impl DerefMut for EdgeRouter {
    fn deref_mut(&mut self) -> &mut Router {
        &mut self.router
    }
}
