//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: access logging, security headers, compression,
//! cache policy. Rate limiting, IP allow-lists and custom authentication
//! plug in the same way, by implementing [`Middleware`].
//!
//! Every middleware has two hooks. Each defaults to a no-op, so implement
//! only what you need:
//!
//! ```text
//!   request ─▶ before(A) ─▶ before(B) ─▶ endpoint ─┐
//!                                                 │
//!  response ◀─ after(A)  ◀─ after(B)  ◀───────────┘
//! ```
//!
//! Built-in middleware:
//! - [`Logger`] — one line per request and per response, with latency
//! - [`SecurityHeaders`] — CSP, `nosniff`, HSTS
//! - [`Compression`] — gzip for HTML, CSS and JavaScript
//! - [`CacheControl`] — `Cache-Control` from a [`CachePolicy`]
//! - [`Timing`] — latency per matched route

mod cache_control;
mod compression;
mod logger;
mod security;
mod timing;

pub use cache_control::{CacheControl, CachePolicy};
pub use compression::Compression;
pub use logger::Logger;
pub use security::SecurityHeaders;
pub use timing::Timing;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

/// Outcome of a before-stage.
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next layer.
    Continue,
    /// Stop here and answer with this response. The endpoint and every
    /// later before-stage are skipped; after-stages still unwind from this
    /// middleware outwards.
    Respond(Response),
}

/// A request/response interceptor.
///
/// Middleware is shared across every concurrent request, so it holds only
/// configuration. Per-request state goes into the request's
/// [context bag](Request::context_mut).
///
/// Returning `Err` from either stage, or panicking, fails the request with a
/// plain `500`. Nothing that earlier stages added to the response survives.
///
/// # Example — reject requests without an API key
///
/// ```rust
/// use strata::middleware::{Flow, Middleware};
/// use strata::{BoxError, Request, Response};
/// use http::StatusCode;
///
/// struct RequireKey;
///
/// impl Middleware for RequireKey {
///     fn name(&self) -> &'static str { "require-key" }
///
///     fn before(&self, req: &mut Request) -> Result<Flow, BoxError> {
///         match req.header("x-api-key") {
///             Some(_) => Ok(Flow::Continue),
///             None => Ok(Flow::Respond(Response::status(StatusCode::UNAUTHORIZED))),
///         }
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Short name used in fault logs.
    fn name(&self) -> &'static str;

    fn before(&self, _req: &mut Request) -> Result<Flow, BoxError> {
        Ok(Flow::Continue)
    }

    fn after(&self, _req: &Request, res: Response) -> Result<Response, BoxError> {
        Ok(res)
    }

    /// Called instead of [`after`](Middleware::after) when the request is
    /// dropped mid-flight (client disconnect, host timeout).
    ///
    /// Runs only for middleware whose before-stage was entered, innermost
    /// first. Override it for cleanup that must happen no matter what.
    fn cancelled(&self, _req: &Request) {}
}

/// Seconds with two decimals, the precision every latency log line uses.
pub(crate) fn seconds(elapsed: std::time::Duration) -> String {
    format!("{:.2}", elapsed.as_secs_f64())
}
