//! `Cache-Control` response header.

use super::{Flow, Middleware};
use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

/// A caching policy, rendered into one `Cache-Control` header value.
///
/// The default caches publicly for an hour:
///
/// ```rust
/// use strata::middleware::CachePolicy;
///
/// assert_eq!(CachePolicy::default().header_value(), "max-age=3600, public");
/// ```
///
/// A handler can override the pipeline's policy for a single response by
/// attaching its own:
///
/// ```rust
/// use strata::Response;
/// use strata::middleware::CachePolicy;
///
/// let private = CachePolicy { max_age: None, public: false, no_cache: false, no_store: true };
/// Response::builder().extension(private).text("account details");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CachePolicy {
    /// `max-age=<n>` in seconds.
    pub max_age: Option<u32>,
    pub public: bool,
    pub no_cache: bool,
    pub no_store: bool,
}

impl CachePolicy {
    /// Directives in fixed order, joined by `", "`. Only set directives
    /// appear, so a policy with nothing set renders as an empty string.
    pub fn header_value(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if let Some(max_age) = self.max_age {
            parts.push(format!("max-age={max_age}"));
        }
        if self.public {
            parts.push("public".to_owned());
        }
        if self.no_cache {
            parts.push("no-cache".to_owned());
        }
        if self.no_store {
            parts.push("no-store".to_owned());
        }
        parts.join(", ")
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { max_age: Some(3600), public: true, no_cache: false, no_store: false }
    }
}

/// Attaches a [`CachePolicy`] to each request and writes it out as
/// `Cache-Control` on the way back.
///
/// A policy found in the response's extensions wins over the request's.
/// A policy with no directives set produces no header at all.
#[derive(Clone, Debug, Default)]
pub struct CacheControl {
    policy: CachePolicy,
}

impl CacheControl {
    pub fn new(policy: CachePolicy) -> Self {
        Self { policy }
    }
}

impl Middleware for CacheControl {
    fn name(&self) -> &'static str { "cache-control" }

    fn before(&self, req: &mut Request) -> Result<Flow, BoxError> {
        req.context_mut().insert(self.policy.clone());
        Ok(Flow::Continue)
    }

    fn after(&self, req: &Request, mut res: Response) -> Result<Response, BoxError> {
        let policy = res.extensions().get::<CachePolicy>()
            .or_else(|| req.context().get::<CachePolicy>());
        let Some(value) = policy.map(CachePolicy::header_value) else {
            return Ok(res);
        };
        if !value.is_empty() {
            res.set_header("Cache-Control", value);
        }
        Ok(res)
    }
}
