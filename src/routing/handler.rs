//! Route handler: a pattern bound to an ordered callback chain.
//!
//! Callbacks are async functions taking the shared request and the opaque
//! [`Env`]. They are stored type-erased so one handler list can hold closures
//! and named `async fn`s alike; the blanket impl below boxes the returned
//! future and normalizes the return value through [`IntoRouteResult`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::{Env, RoutePattern};
use crate::http::{text, Request, Response};

/// Error type produced by callbacks; contained at the router boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What a route callback produced: a full response or a plain string that is
/// auto-wrapped as a `text/plain` response.
pub enum Reply {
    Response(Response),
    Text(String),
}

impl Reply {
    pub(crate) fn into_response(self) -> Response {
        match self {
            Self::Response(response) => response,
            Self::Text(content) => text(content),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<String> for Reply {
    fn from(content: String) -> Self {
        Self::Text(content)
    }
}

impl From<&str> for Reply {
    fn from(content: &str) -> Self {
        Self::Text(content.to_string())
    }
}

/// Normalized outcome of one route callback. `Ok(None)` means "no content
/// from me, try the next callback".
pub type RouteResult = Result<Option<Reply>, BoxError>;

/// Conversion applied to whatever a route callback returns.
pub trait IntoRouteResult {
    fn into_route_result(self) -> RouteResult;
}

impl IntoRouteResult for Option<Reply> {
    fn into_route_result(self) -> RouteResult {
        Ok(self)
    }
}

impl IntoRouteResult for Reply {
    fn into_route_result(self) -> RouteResult {
        Ok(Some(self))
    }
}

impl IntoRouteResult for Response {
    fn into_route_result(self) -> RouteResult {
        Ok(Some(Reply::Response(self)))
    }
}

impl IntoRouteResult for Option<Response> {
    fn into_route_result(self) -> RouteResult {
        Ok(self.map(Reply::Response))
    }
}

impl IntoRouteResult for String {
    fn into_route_result(self) -> RouteResult {
        Ok(Some(Reply::Text(self)))
    }
}

impl IntoRouteResult for &str {
    fn into_route_result(self) -> RouteResult {
        Ok(Some(Reply::Text(self.to_string())))
    }
}

impl IntoRouteResult for () {
    fn into_route_result(self) -> RouteResult {
        Ok(None)
    }
}

impl<T, E> IntoRouteResult for Result<T, E>
where
    T: IntoRouteResult,
    E: Into<BoxError>,
{
    fn into_route_result(self) -> RouteResult {
        self.map_err(Into::into).and_then(IntoRouteResult::into_route_result)
    }
}

/// A type-erased route callback.
///
/// Implemented for every `Fn(Arc<Request>, Env) -> Future` whose output
/// converts through [`IntoRouteResult`], so it accepts named `async fn`s and
/// closures alike.
pub trait RouteCallback: Send + Sync + 'static {
    fn call(&self, req: Arc<Request>, env: Env) -> BoxFuture<RouteResult>;
}

impl<F, Fut, R> RouteCallback for F
where
    F: Fn(Arc<Request>, Env) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoRouteResult + Send + 'static,
{
    fn call(&self, req: Arc<Request>, env: Env) -> BoxFuture<RouteResult> {
        let fut = self(req, env);
        Box::pin(async move { fut.await.into_route_result() })
    }
}

/// Shared, heap-allocated callback; one `Arc` clone per invocation.
pub type BoxedRouteCallback = Arc<dyn RouteCallback>;

/// Box a callback for use in an explicit chain (`vec![callback(a), ...]`).
pub fn callback<C: RouteCallback>(cb: C) -> BoxedRouteCallback {
    Arc::new(cb)
}

/// Anything accepted as the callback argument of a registration: a single
/// callback or an ordered chain of boxed ones.
pub trait IntoRouteChain {
    fn into_chain(self) -> Vec<BoxedRouteCallback>;
}

impl<C: RouteCallback> IntoRouteChain for C {
    fn into_chain(self) -> Vec<BoxedRouteCallback> {
        vec![Arc::new(self)]
    }
}

impl IntoRouteChain for Vec<BoxedRouteCallback> {
    fn into_chain(self) -> Vec<BoxedRouteCallback> {
        self
    }
}

/// Outcome of asking one handler to process a request.
#[derive(Debug)]
pub enum Dispatch {
    /// The pattern did not match; try the next handler.
    NoMatch,
    /// The pattern matched but every callback declined to respond.
    NoContent,
    /// The pattern matched and a callback produced this response.
    Response(Response),
}

/// A route pattern bound to an ordered, first-response-wins callback chain.
pub struct Handler {
    pattern: RoutePattern,
    callbacks: Vec<BoxedRouteCallback>,
}

impl Handler {
    pub fn new(pattern: RoutePattern, chain: impl IntoRouteChain) -> Self {
        Self {
            pattern,
            callbacks: chain.into_chain(),
        }
    }

    /// Try this handler. On a match the captured params are stored on the
    /// request before any callback runs; callbacks then run in registration
    /// order and the first non-empty reply wins. Callback errors propagate
    /// to the router for containment.
    pub(crate) async fn execute(
        &self,
        req: &Arc<Request>,
        env: &Env,
    ) -> Result<Dispatch, BoxError> {
        let Some(params) = self.pattern.matches(req.method(), req.url()) else {
            return Ok(Dispatch::NoMatch);
        };
        req.set_params(params);
        for cb in &self.callbacks {
            if let Some(reply) = cb.call(Arc::clone(req), env.clone()).await? {
                return Ok(Dispatch::Response(reply.into_response()));
            }
        }
        Ok(Dispatch::NoContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn respond_text(_req: Arc<Request>, _env: Env) -> RouteResult {
        Ok(Some("foo".into()))
    }

    async fn decline(_req: Arc<Request>, _env: Env) -> RouteResult {
        Ok(None)
    }

    fn request(method: &str, url: &str) -> Arc<Request> {
        Arc::new(Request::new(method, url))
    }

    #[tokio::test]
    async fn no_match_when_pattern_misses() {
        let handler = Handler::new(RoutePattern::parse("GET /hello"), respond_text);
        let outcome = handler
            .execute(&request("GET", "/other"), &Env::default())
            .await
            .unwrap();
        assert!(matches!(outcome, Dispatch::NoMatch));
    }

    #[tokio::test]
    async fn first_non_empty_reply_wins() {
        let chain = vec![callback(decline), callback(respond_text)];
        let handler = Handler::new(RoutePattern::parse("GET /hello"), chain);
        let outcome = handler
            .execute(&request("GET", "/hello"), &Env::default())
            .await
            .unwrap();
        match outcome {
            Dispatch::Response(response) => assert_eq!(response.body_text(), "foo"),
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_string_is_wrapped_as_text() {
        async fn hi(_req: Arc<Request>, _env: Env) -> &'static str {
            "hi"
        }
        let handler = Handler::new(RoutePattern::parse("GET /hello"), hi);
        let outcome = handler
            .execute(&request("GET", "/hello"), &Env::default())
            .await
            .unwrap();
        match outcome {
            Dispatch::Response(response) => {
                assert_eq!(response.body_text(), "hi");
                assert_eq!(response.header_value("content-type"), Some("text/plain"));
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn all_callbacks_declining_reports_no_content() {
        let chain = vec![callback(decline), callback(decline)];
        let handler = Handler::new(RoutePattern::parse("GET /hello"), chain);
        let outcome = handler
            .execute(&request("GET", "/hello"), &Env::default())
            .await
            .unwrap();
        assert!(matches!(outcome, Dispatch::NoContent));
    }

    #[tokio::test]
    async fn params_are_set_before_callbacks_run() {
        async fn echo_param(req: Arc<Request>, _env: Env) -> RouteResult {
            Ok(Some(req.param("id").unwrap_or_default().into()))
        }
        let handler = Handler::new(RoutePattern::parse("GET /a/:id"), echo_param);
        let outcome = handler
            .execute(&request("GET", "/a/42"), &Env::default())
            .await
            .unwrap();
        match outcome {
            Dispatch::Response(response) => assert_eq!(response.body_text(), "42"),
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn callback_errors_propagate() {
        async fn boom(_req: Arc<Request>, _env: Env) -> RouteResult {
            Err("boom".into())
        }
        let handler = Handler::new(RoutePattern::parse("GET /hello"), boom);
        let err = handler
            .execute(&request("GET", "/hello"), &Env::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
