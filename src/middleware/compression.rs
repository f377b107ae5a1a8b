//! gzip response compression.

use std::io::Write;

use flate2::Compression as Level;
use flate2::write::GzEncoder;
use tracing::debug;

use super::{Flow, Middleware};
use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

const COMPRESSIBLE: [&str; 3] = ["text/html", "text/css", "application/javascript"];

/// Whether the client advertised gzip support.
#[derive(Clone, Copy)]
struct AcceptsGzip(bool);

/// gzip-encodes HTML, CSS and JavaScript bodies for clients that accept it.
///
/// A response is compressed only when all of these hold:
/// - the request's `Accept-Encoding` mentions `gzip`
/// - the content type is `text/html`, `text/css` or `application/javascript`
/// - the body is non-empty and at least [`min_size`](Compression::min_size) bytes
/// - no `Content-Encoding` is set yet
///
/// `Content-Encoding` and `Content-Length` are rewritten to match.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compression {
    min_size: usize,
}

impl Compression {
    /// Compresses every eligible body, however small.
    pub fn new() -> Self { Self::default() }

    /// Leaves bodies shorter than `bytes` untouched.
    pub fn min_size(mut self, bytes: usize) -> Self {
        self.min_size = bytes;
        self
    }

    fn compressible(content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        COMPRESSIBLE.iter().any(|t| essence.eq_ignore_ascii_case(t))
    }

    fn should_compress(&self, req: &Request, res: &Response) -> bool {
        let accepted = req.context().get::<AcceptsGzip>().is_some_and(|a| a.0);
        accepted
            && !res.body().is_empty()
            && res.body().len() >= self.min_size
            && res.header("content-encoding").is_none()
            && res.content_type().is_some_and(Self::compressible)
    }
}

impl Middleware for Compression {
    fn name(&self) -> &'static str { "compression" }

    fn before(&self, req: &mut Request) -> Result<Flow, BoxError> {
        let accepts = req.header("accept-encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("gzip"));
        req.context_mut().insert(AcceptsGzip(accepts));
        Ok(Flow::Continue)
    }

    fn after(&self, req: &Request, mut res: Response) -> Result<Response, BoxError> {
        if !self.should_compress(req, &res) {
            return Ok(res);
        }

        let mut encoder = GzEncoder::new(Vec::new(), Level::default());
        encoder.write_all(res.body())?;
        let compressed = encoder.finish()?;

        debug!(from = res.body().len(), to = compressed.len(), "gzip-compressed response body");
        res.set_header("Content-Encoding", "gzip");
        res.set_header("Content-Length", compressed.len().to_string());
        res.set_body(compressed);
        Ok(res)
    }
}
