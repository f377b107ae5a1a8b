//! Per-route latency.

use std::time::Instant;

use tracing::info;

use super::{Flow, Middleware, seconds};
use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;
use crate::router::MatchedRoute;

#[derive(Clone, Copy)]
struct RouteClock(Instant);

/// Logs how long each matched route took, keyed by its pattern
/// (`/books/{id}`, not `/books/42`), so slow routes stand out.
///
/// Place it innermost to time the handler alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timing;

impl Timing {
    pub fn new() -> Self { Self }
}

impl Middleware for Timing {
    fn name(&self) -> &'static str { "timing" }

    fn before(&self, req: &mut Request) -> Result<Flow, BoxError> {
        req.context_mut().insert(RouteClock(Instant::now()));
        Ok(Flow::Continue)
    }

    fn after(&self, req: &Request, res: Response) -> Result<Response, BoxError> {
        let elapsed = req.context().get::<RouteClock>()
            .map(|c| c.0.elapsed())
            .unwrap_or_default();
        let elapsed = format!("{}s", seconds(elapsed));

        match res.extensions().get::<MatchedRoute>() {
            Some(route) => info!(route = route.as_str(), elapsed = %elapsed, "route timing"),
            None => info!(path = req.path(), elapsed = %elapsed, "no route matched"),
        }
        Ok(res)
    }
}
