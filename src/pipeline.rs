//! The onion-model executor.
//!
//! A [`Pipeline`] is an ordered list of [`Middleware`] around one
//! [`Endpoint`]. For every request it runs the before-stages in order, the
//! endpoint (unless a before-stage answered first), then the after-stages of
//! every middleware it entered, in exact reverse order.
//!
//! ```rust
//! use strata::middleware::{CacheControl, CachePolicy, Compression, Logger, SecurityHeaders};
//! use strata::{Pipeline, Request, Response, Router};
//! use http::Method;
//!
//! async fn books(_req: Request) -> Response {
//!     Response::html("<ul><li>Book 1</li></ul>")
//! }
//!
//! let pipeline = Pipeline::builder()
//!     .layer(Logger::new())
//!     .layer(SecurityHeaders::new())
//!     .layer(Compression::new())
//!     .layer(CacheControl::new(CachePolicy::default()))
//!     .endpoint(Router::new().on(Method::GET, "/books/", books));
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, Span, error, info_span};

use crate::error::{BoxError, Fault, Panic, Stage};
use crate::handler::{Endpoint, SharedEndpoint};
use crate::middleware::{Flow, Middleware};
use crate::request::Request;
use crate::response::Response;

/// An immutable middleware chain wrapped around an endpoint.
///
/// Cheap to share: wrap it in an `Arc` and call [`handle`](Pipeline::handle)
/// from as many tasks as you like.
pub struct Pipeline {
    layers: Vec<Arc<dyn Middleware>>,
    endpoint: SharedEndpoint,
    sink: Option<Dispatch>,
}

/// Builder for [`Pipeline`]. Layers run in the order they are added.
#[derive(Default)]
pub struct PipelineBuilder {
    layers: Vec<Arc<dyn Middleware>>,
    sink: Option<Dispatch>,
}

impl PipelineBuilder {
    /// Appends a middleware. The first layer added is the outermost.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Sends every log event the pipeline emits to `sink` instead of the
    /// process-wide default subscriber.
    pub fn sink(mut self, sink: Dispatch) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Finishes the pipeline with its terminal endpoint.
    pub fn endpoint(self, endpoint: impl Endpoint) -> Pipeline {
        Pipeline {
            layers: self.layers,
            endpoint: Arc::new(endpoint),
            sink: self.sink,
        }
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// A pipeline with no middleware at all.
    pub fn new(endpoint: impl Endpoint) -> Self {
        Self::builder().endpoint(endpoint)
    }

    /// Names of the layers, outermost first.
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    /// Runs one request through the chain.
    ///
    /// Never fails: a fault anywhere becomes a plain `500` response and is
    /// logged with the middleware name, stage and path.
    pub async fn handle(&self, req: Request) -> Response {
        match &self.sink {
            Some(sink) => self.run(req).with_subscriber(sink.clone()).await,
            None => self.run(req).await,
        }
    }

    async fn run(&self, req: Request) -> Response {
        let span = info_span!("request", method = %req.method, path = %req.path);
        self.execute(req, span.clone()).instrument(span).await
    }

    async fn execute(&self, req: Request, span: Span) -> Response {
        let mut unwind = Unwind {
            layers: &self.layers,
            entered: 0,
            req,
            armed: true,
            sink: self.sink.as_ref(),
            span,
        };
        let outcome = self.traverse(&mut unwind).await;
        unwind.armed = false;

        match outcome {
            Ok(res) => res,
            Err(fault) => {
                match &fault {
                    Fault::Middleware { middleware, stage, source } => error!(
                        middleware,
                        %stage,
                        path = %unwind.req.path,
                        error = %source,
                        "middleware fault, answering 500"
                    ),
                    Fault::Upstream(source) => error!(
                        path = %unwind.req.path,
                        error = %source,
                        "endpoint fault, answering 500"
                    ),
                }
                internal_error()
            }
        }
    }

    async fn traverse(&self, unwind: &mut Unwind<'_>) -> Result<Response, Fault> {
        let mut early = None;
        for layer in &self.layers {
            unwind.entered += 1;
            let req = &mut unwind.req;
            match contain(layer.name(), Stage::Before, || layer.before(req))? {
                Flow::Continue => {}
                Flow::Respond(res) => {
                    early = Some(res);
                    break;
                }
            }
        }

        let mut res = match early {
            Some(res) => res,
            None => {
                // The endpoint gets its own copy; the original stays here
                // for the after-stages.
                let req = unwind.req.clone();
                let endpoint = &self.endpoint;
                AssertUnwindSafe(async move { endpoint.call(req).await })
                    .catch_unwind()
                    .await
                    .map_err(|payload| Fault::Upstream(Box::new(Panic::from_payload(payload))))?
            }
        };

        for layer in self.layers[..unwind.entered].iter().rev() {
            let req = &unwind.req;
            res = contain(layer.name(), Stage::After, || layer.after(req, res))?;
        }
        Ok(res)
    }
}

/// Runs one stage, turning both `Err` and panics into a [`Fault`].
fn contain<T>(
    middleware: &'static str,
    stage: Stage,
    f: impl FnOnce() -> Result<T, BoxError>,
) -> Result<T, Fault> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(Fault::Middleware { middleware, stage, source }),
        Err(payload) => Err(Fault::Middleware {
            middleware,
            stage,
            source: Box::new(Panic::from_payload(payload)),
        }),
    }
}

fn internal_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .text("Internal Server Error")
}

/// Tracks which layers a request has entered.
///
/// If the request future is dropped while still armed, the request was
/// cancelled: the entered layers get their `cancelled` hook, innermost first.
///
/// The drop happens outside the instrumented future, so the hooks re-enter
/// the request span and the pipeline's sink themselves.
struct Unwind<'a> {
    layers: &'a [Arc<dyn Middleware>],
    entered: usize,
    req: Request,
    armed: bool,
    sink: Option<&'a Dispatch>,
    span: Span,
}

impl Unwind<'_> {
    fn run_cancelled_hooks(&self) {
        let _entered = self.span.enter();
        for layer in self.layers[..self.entered].iter().rev() {
            layer.cancelled(&self.req);
        }
    }
}

impl Drop for Unwind<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.sink {
            Some(sink) => tracing::dispatcher::with_default(sink, || self.run_cancelled_hooks()),
            None => self.run_cancelled_hooks(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use http::Method;

    use super::*;
    use crate::handler::BoxFuture;

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy)]
    enum Mode {
        Pass,
        ShortCircuit,
        FailAfter,
        PanicBefore,
    }

    struct Recorder {
        name: &'static str,
        log: Log,
        mode: Mode,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log, mode: Mode) -> Self {
            Self { name, log: Arc::clone(log), mode }
        }

        fn push(&self, event: &str) {
            self.log.lock().unwrap().push(format!("{event}:{}", self.name));
        }
    }

    impl Middleware for Recorder {
        fn name(&self) -> &'static str { self.name }

        fn before(&self, _req: &mut Request) -> Result<Flow, BoxError> {
            self.push("before");
            match self.mode {
                Mode::ShortCircuit => Ok(Flow::Respond(Response::status(StatusCode::FORBIDDEN))),
                Mode::PanicBefore => panic!("{} blew up", self.name),
                Mode::Pass | Mode::FailAfter => Ok(Flow::Continue),
            }
        }

        fn after(&self, _req: &Request, mut res: Response) -> Result<Response, BoxError> {
            self.push("after");
            match self.mode {
                Mode::FailAfter => Err("after-stage refused".into()),
                _ => {
                    res.set_header(&format!("x-{}", self.name), "seen");
                    Ok(res)
                }
            }
        }

        fn cancelled(&self, _req: &Request) {
            self.push("cancelled");
        }
    }

    struct Recorded(Log);

    impl Endpoint for Recorded {
        fn call(&self, req: Request) -> BoxFuture {
            self.0.lock().unwrap().push("endpoint".to_owned());
            let seen = req.context().get::<&'static str>().copied().unwrap_or("none");
            Box::pin(async move { Response::text(seen) })
        }
    }

    struct Stalls;

    impl Endpoint for Stalls {
        fn call(&self, _req: Request) -> BoxFuture {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Response::text("too late")
            })
        }
    }

    struct Explodes;

    impl Endpoint for Explodes {
        fn call(&self, _req: Request) -> BoxFuture {
            Box::pin(async { panic!("endpoint exploded") })
        }
    }

    fn events(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn get() -> Request {
        Request::new(Method::GET, "/books/")
    }

    #[tokio::test]
    async fn after_stages_unwind_in_reverse() {
        let log = Log::default();
        let pipeline = Pipeline::builder()
            .layer(Recorder::new("a", &log, Mode::Pass))
            .layer(Recorder::new("b", &log, Mode::Pass))
            .layer(Recorder::new("c", &log, Mode::Pass))
            .endpoint(Recorded(Arc::clone(&log)));

        let res = pipeline.handle(get()).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(
            events(&log),
            ["before:a", "before:b", "before:c", "endpoint", "after:c", "after:b", "after:a"],
        );
        assert_eq!(res.header("x-a"), Some("seen"));
        assert_eq!(res.header("x-c"), Some("seen"));
    }

    #[tokio::test]
    async fn short_circuit_skips_endpoint_and_inner_layers() {
        let log = Log::default();
        let pipeline = Pipeline::builder()
            .layer(Recorder::new("a", &log, Mode::Pass))
            .layer(Recorder::new("b", &log, Mode::ShortCircuit))
            .layer(Recorder::new("c", &log, Mode::Pass))
            .endpoint(Recorded(Arc::clone(&log)));

        let res = pipeline.handle(get()).await;

        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(events(&log), ["before:a", "before:b", "after:b", "after:a"]);
        assert_eq!(res.header("x-c"), None);
    }

    #[tokio::test]
    async fn after_fault_discards_partial_response() {
        let log = Log::default();
        let pipeline = Pipeline::builder()
            .layer(Recorder::new("outer", &log, Mode::Pass))
            .layer(Recorder::new("faulty", &log, Mode::FailAfter))
            .layer(Recorder::new("inner", &log, Mode::Pass))
            .endpoint(Recorded(Arc::clone(&log)));

        let res = pipeline.handle(get()).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.header("x-inner"), None);
        assert_eq!(res.header("x-outer"), None);
        assert_eq!(res.body(), b"Internal Server Error");
        assert_eq!(
            events(&log),
            ["before:outer", "before:faulty", "before:inner", "endpoint", "after:inner", "after:faulty"],
        );
    }

    #[tokio::test]
    async fn before_panic_becomes_500() {
        let log = Log::default();
        let pipeline = Pipeline::builder()
            .layer(Recorder::new("a", &log, Mode::Pass))
            .layer(Recorder::new("b", &log, Mode::PanicBefore))
            .endpoint(Recorded(Arc::clone(&log)));

        let res = pipeline.handle(get()).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(events(&log), ["before:a", "before:b"]);
    }

    #[tokio::test]
    async fn endpoint_panic_becomes_500() {
        let log = Log::default();
        let pipeline = Pipeline::builder()
            .layer(Recorder::new("a", &log, Mode::Pass))
            .endpoint(Explodes);

        let res = pipeline.handle(get()).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.header("x-a"), None);
        assert_eq!(events(&log), ["before:a"]);
    }

    #[tokio::test]
    async fn cancellation_runs_cancelled_hooks_only() {
        let log = Log::default();
        let pipeline = Pipeline::builder()
            .layer(Recorder::new("a", &log, Mode::Pass))
            .layer(Recorder::new("b", &log, Mode::Pass))
            .endpoint(Stalls);

        let outcome = tokio::time::timeout(Duration::from_millis(20), pipeline.handle(get())).await;

        assert!(outcome.is_err());
        assert_eq!(events(&log), ["before:a", "before:b", "cancelled:b", "cancelled:a"]);
    }

    #[tokio::test]
    async fn cancelled_request_is_logged_to_sink() {
        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let sink = Dispatch::new(
            tracing_subscriber::fmt()
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .finish(),
        );
        let pipeline = Pipeline::builder()
            .layer(crate::middleware::Logger::new())
            .sink(sink)
            .endpoint(Stalls);

        let outcome = tokio::time::timeout(Duration::from_millis(20), pipeline.handle(get())).await;

        assert!(outcome.is_err());
        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("incoming request"), "{out}");
        let line = out.lines().find(|l| l.contains("request cancelled")).unwrap_or_default();
        assert!(line.contains("WARN"), "{out}");
        assert!(line.contains("request{method=GET path=/books/}"), "{out}");
        assert!(line.contains("elapsed="), "{out}");
    }

    #[tokio::test]
    async fn context_flows_from_before_to_endpoint() {
        struct Tag;

        impl Middleware for Tag {
            fn name(&self) -> &'static str { "tag" }

            fn before(&self, req: &mut Request) -> Result<Flow, BoxError> {
                req.context_mut().insert("tagged");
                Ok(Flow::Continue)
            }

            fn after(&self, req: &Request, mut res: Response) -> Result<Response, BoxError> {
                let tag = req.context().get::<&'static str>().copied().unwrap_or("lost");
                res.set_header("x-tag", tag);
                Ok(res)
            }
        }

        let log = Log::default();
        let pipeline = Pipeline::builder().layer(Tag).endpoint(Recorded(log));

        let res = pipeline.handle(get()).await;

        assert_eq!(res.body(), b"tagged");
        assert_eq!(res.header("x-tag"), Some("tagged"));
        assert_eq!(pipeline.layer_names(), ["tag"]);
    }
}
