//! Request/response access logging.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::{Flow, Middleware, seconds};
use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

#[derive(Clone, Copy)]
struct StartedAt(Instant);

/// Logs every request on the way in and every response on the way out.
///
/// ```text
/// INFO incoming request method=GET path=/books/ client=10.0.0.7:51532
/// INFO outgoing response status=200 content_type=text/html; charset=utf-8 elapsed=0.01s
/// ```
///
/// Put it first so the elapsed time covers every other layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct Logger;

impl Logger {
    pub fn new() -> Self { Self }

    fn elapsed(req: &Request) -> Option<Duration> {
        req.context().get::<StartedAt>().map(|s| s.0.elapsed())
    }
}

impl Middleware for Logger {
    fn name(&self) -> &'static str { "logger" }

    fn before(&self, req: &mut Request) -> Result<Flow, BoxError> {
        req.context_mut().insert(StartedAt(Instant::now()));
        let client = req.peer().map_or_else(|| "-".to_owned(), |addr| addr.to_string());
        info!(method = %req.method(), path = req.path(), client = %client, "incoming request");
        Ok(Flow::Continue)
    }

    fn after(&self, req: &Request, res: Response) -> Result<Response, BoxError> {
        let elapsed = Self::elapsed(req).unwrap_or_else(|| {
            warn!(path = req.path(), "request start time missing, reporting zero latency");
            Duration::ZERO
        });
        let elapsed = format!("{}s", seconds(elapsed));
        info!(
            status = res.status_code().as_u16(),
            content_type = res.content_type().unwrap_or("-"),
            elapsed = %elapsed,
            "outgoing response"
        );
        Ok(res)
    }

    fn cancelled(&self, req: &Request) {
        let elapsed = format!("{}s", seconds(Self::elapsed(req).unwrap_or_default()));
        warn!(path = req.path(), elapsed = %elapsed, "request cancelled");
    }
}
