//! The two-phase dispatch pipeline.
//!
//! Phase one walks the pre-handlers (`before`) and main handlers (`route`) as
//! one ordered list; the first handler that matches and produces a response
//! wins. Phase two threads whatever phase one produced (possibly nothing)
//! through every registered afterware whose pattern matches, in registration
//! order, unconditionally. Only the router manufactures the default
//! responses: the no-content 500, the unhandled-exception 500 and the
//! terminal 404 (or pass-through when configured).

use std::sync::Arc;

use serde::Deserialize;

use super::afterware::{AfterCallback, Afterware, BoxedAfterCallback};
use super::handler::{Dispatch, Handler, IntoRouteChain};
use super::{Env, RoutePattern};
use crate::http::{text, Request, Response};

/// Router construction options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
    /// Prefix prepended to the path of every registered pattern.
    #[serde(default)]
    pub base: String,
    /// When set, callback failures are skipped as if the handler had not
    /// matched, and an unrouted request yields no response at all instead of
    /// a 404. Edge adapters use this to decline and let the platform serve.
    #[serde(default)]
    pub pass_through_on_exception: bool,
}

/// The pipeline: ordered `before`/`route`/`after` lists plus dispatch.
///
/// Registration happens during setup; dispatch borrows the router immutably,
/// so a router behind an `Arc` is safely shared across concurrent requests.
#[derive(Default)]
pub struct Router {
    base: String,
    pass_through_on_exception: bool,
    prelims: Vec<Handler>,
    handlers: Vec<Handler>,
    afters: Vec<Afterware>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            base: config.base,
            pass_through_on_exception: config.pass_through_on_exception,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn pass_through_on_exception(&self) -> bool {
        self.pass_through_on_exception
    }

    /// Register a pre-handler, tried before every main route.
    pub fn before(&mut self, spec: &str, chain: impl IntoRouteChain) -> &mut Self {
        let pattern = RoutePattern::parse_with_base(spec, &self.base);
        self.prelims.push(Handler::new(pattern, chain));
        self
    }

    /// Register a pre-handler matching any method and any path.
    pub fn before_any(&mut self, chain: impl IntoRouteChain) -> &mut Self {
        self.prelims.push(Handler::new(self.any_pattern(), chain));
        self
    }

    /// Register a main route.
    pub fn route(&mut self, spec: &str, chain: impl IntoRouteChain) -> &mut Self {
        let pattern = RoutePattern::parse_with_base(spec, &self.base);
        self.handlers.push(Handler::new(pattern, chain));
        self
    }

    /// Register a main route matching any method and any path.
    pub fn route_any(&mut self, chain: impl IntoRouteChain) -> &mut Self {
        self.handlers.push(Handler::new(self.any_pattern(), chain));
        self
    }

    /// Register afterware: runs in phase two whenever its pattern matches,
    /// regardless of what phase one produced.
    pub fn after(&mut self, spec: &str, cb: impl AfterCallback) -> &mut Self {
        let pattern = RoutePattern::parse_with_base(spec, &self.base);
        self.afters.push(Afterware::single(pattern, cb));
        self
    }

    /// Register an afterware chain under one pattern.
    pub fn after_chain(&mut self, spec: &str, callbacks: Vec<BoxedAfterCallback>) -> &mut Self {
        let pattern = RoutePattern::parse_with_base(spec, &self.base);
        self.afters.push(Afterware::new(pattern, callbacks));
        self
    }

    /// Register afterware matching any method and any path.
    pub fn after_any(&mut self, cb: impl AfterCallback) -> &mut Self {
        self.afters.push(Afterware::single(self.any_pattern(), cb));
        self
    }

    fn any_pattern(&self) -> RoutePattern {
        if self.base.is_empty() {
            RoutePattern::any()
        } else {
            RoutePattern::parse_with_base("* *", &self.base)
        }
    }

    /// Dispatch a request through both phases.
    ///
    /// Returns `None` only when nothing responded and
    /// `pass_through_on_exception` is set; otherwise every request yields a
    /// response (404 when unrouted).
    pub async fn handle(&self, request: Request) -> Option<Response> {
        self.handle_with_env(request, Env::default()).await
    }

    /// [`Router::handle`] with adapter-supplied state threaded into every
    /// callback.
    pub async fn handle_with_env(&self, request: Request, env: Env) -> Option<Response> {
        let req = Arc::new(request);
        let routed = self.run_handlers(&req, &env).await;
        let post = self.run_afters(routed, &req, &env).await;
        match post {
            Some(response) => Some(response),
            None if self.pass_through_on_exception => None,
            None => Some(text("Not Found").status(404)),
        }
    }

    /// Phase one: first matching handler with a non-empty result wins.
    async fn run_handlers(&self, req: &Arc<Request>, env: &Env) -> Option<Response> {
        for handler in self.prelims.iter().chain(&self.handlers) {
            match handler.execute(req, env).await {
                Ok(Dispatch::NoMatch) => {}
                Ok(Dispatch::Response(response)) => return Some(response),
                Ok(Dispatch::NoContent) => {
                    return Some(text("No content in response").status(500));
                }
                Err(err) => {
                    if self.pass_through_on_exception {
                        log::warn!(
                            "handler failed for {} {}, passing through: {err}",
                            req.method(),
                            req.url()
                        );
                        continue;
                    }
                    log::error!("handler failed for {} {}: {err}", req.method(), req.url());
                    return Some(text(format!("Unhandled exception: {err}")).status(500));
                }
            }
        }
        None
    }

    /// Phase two: every matching afterware, unconditionally, in order.
    async fn run_afters(
        &self,
        mut current: Option<Response>,
        req: &Arc<Request>,
        env: &Env,
    ) -> Option<Response> {
        for after in &self.afters {
            // The chain consumes the response by value; keep a copy so a
            // skipped failure leaves the running response unchanged.
            let kept = self
                .pass_through_on_exception
                .then(|| current.clone())
                .flatten();
            match after.execute(current.take(), req, env).await {
                Ok(next) => current = next,
                Err(err) => {
                    if self.pass_through_on_exception {
                        log::warn!("afterware failed, skipping: {err}");
                        current = kept;
                    } else {
                        log::error!("afterware failed: {err}");
                        current = Some(text(format!("Unhandled exception: {err}")).status(500));
                    }
                }
            }
        }
        current
    }
}
