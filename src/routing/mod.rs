//! Request routing: patterns, handler chains, afterware, and the pipeline.

mod afterware;
mod env;
mod handler;
mod pattern;
mod router;

pub use afterware::{AfterCallback, AfterResult, Afterware, BoxedAfterCallback};
pub use env::Env;
pub use handler::{
    callback, BoxError, BoxedRouteCallback, Dispatch, Handler, IntoRouteChain, Reply,
    RouteCallback, RouteResult,
};
pub use pattern::RoutePattern;
pub use router::{Router, RouterConfig};
