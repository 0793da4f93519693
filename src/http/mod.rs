//! HTTP request/response models and the helpers that build them.

pub mod mime;
mod request;
mod response;
pub mod template;

pub use request::Request;
pub use response::{json, redirect, text, Body, CookieOptions, Response};
pub use template::TemplateError;
