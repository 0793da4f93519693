//! Afterware: post-processing callbacks applied to whatever the routing
//! phase produced.
//!
//! An afterware entry only applies when its pattern matches the request, but
//! once matched every callback in the chain runs; there is no short-circuit.
//! Callbacks receive the running response by value (possibly `None` when no
//! handler responded) and return the response to carry forward; returning the
//! input unchanged keeps it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::handler::BoxError;
use super::{Env, RoutePattern};
use crate::http::{Request, Response};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Outcome of one after-callback: the response to thread into the next one.
pub type AfterResult = Result<Option<Response>, BoxError>;

/// A type-erased after-callback.
pub trait AfterCallback: Send + Sync + 'static {
    fn call(&self, res: Option<Response>, req: Arc<Request>, env: Env) -> BoxFuture<AfterResult>;
}

impl<F, Fut> AfterCallback for F
where
    F: Fn(Option<Response>, Arc<Request>, Env) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AfterResult> + Send + 'static,
{
    fn call(&self, res: Option<Response>, req: Arc<Request>, env: Env) -> BoxFuture<AfterResult> {
        Box::pin(self(res, req, env))
    }
}

/// Shared, heap-allocated after-callback.
pub type BoxedAfterCallback = Arc<dyn AfterCallback>;

/// A route pattern bound to an ordered, unconditional response-transform
/// chain.
pub struct Afterware {
    pattern: RoutePattern,
    callbacks: Vec<BoxedAfterCallback>,
}

impl Afterware {
    pub fn new(pattern: RoutePattern, callbacks: Vec<BoxedAfterCallback>) -> Self {
        Self { pattern, callbacks }
    }

    pub fn single(pattern: RoutePattern, cb: impl AfterCallback) -> Self {
        Self::new(pattern, vec![Arc::new(cb)])
    }

    /// Apply this entry. An unmatched pattern is a pass-through returning the
    /// input unchanged; a matched one threads the response through every
    /// callback in order. Callback errors propagate to the router.
    pub(crate) async fn execute(
        &self,
        mut current: Option<Response>,
        req: &Arc<Request>,
        env: &Env,
    ) -> AfterResult {
        if self.pattern.matches(req.method(), req.url()).is_none() {
            return Ok(current);
        }
        for cb in &self.callbacks {
            current = cb.call(current, Arc::clone(req), env.clone()).await?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::text;

    fn request(method: &str, url: &str) -> Arc<Request> {
        Arc::new(Request::new(method, url))
    }

    async fn tag_header(res: Option<Response>, _req: Arc<Request>, _env: Env) -> AfterResult {
        Ok(res.map(|r| r.header("foo", "bar")))
    }

    async fn replace_body(res: Option<Response>, _req: Arc<Request>, _env: Env) -> AfterResult {
        Ok(res.map(|r| r.body("another")))
    }

    #[tokio::test]
    async fn unmatched_pattern_is_a_pass_through() {
        let afterware = Afterware::single(RoutePattern::parse("GET /other"), tag_header);
        let out = afterware
            .execute(Some(text("orig")), &request("GET", "/hello"), &Env::default())
            .await
            .unwrap();
        let response = out.unwrap();
        assert_eq!(response.header_value("foo"), None);
        assert_eq!(response.body_text(), "orig");
    }

    #[tokio::test]
    async fn matched_chain_runs_every_callback_in_order() {
        let afterware = Afterware::new(
            RoutePattern::parse("GET /hello"),
            vec![Arc::new(tag_header), Arc::new(replace_body)],
        );
        let out = afterware
            .execute(Some(text("orig")), &request("GET", "/hello"), &Env::default())
            .await
            .unwrap();
        let response = out.unwrap();
        assert_eq!(response.header_value("foo"), Some("bar"));
        assert_eq!(response.body_text(), "another");
    }

    #[tokio::test]
    async fn sentinel_flows_through_when_nothing_responded() {
        let afterware = Afterware::single(RoutePattern::parse("GET /hello"), tag_header);
        let out = afterware
            .execute(None, &request("GET", "/hello"), &Env::default())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn afterware_can_create_a_response_from_the_sentinel() {
        async fn synthesize(
            res: Option<Response>,
            _req: Arc<Request>,
            _env: Env,
        ) -> AfterResult {
            Ok(Some(res.unwrap_or_else(|| text("synthesized"))))
        }
        let afterware = Afterware::single(RoutePattern::parse("GET /hello"), synthesize);
        let out = afterware
            .execute(None, &request("GET", "/hello"), &Env::default())
            .await
            .unwrap();
        assert_eq!(out.unwrap().body_text(), "synthesized");
    }
}
