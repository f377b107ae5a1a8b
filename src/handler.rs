//! Terminal endpoints and route handlers.
//!
//! Everything the pipeline can end in is an [`Endpoint`]: the router, a
//! hand-written dispatcher, or a single `async fn`. Route handlers are plain
//! async functions; the router turns each one into a shared endpoint when
//! it is registered:
//!
//! ```text
//! async fn books(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.on(Method::GET, "/books/", books)
//! books.into_endpoint()                            ← Handler blanket impl
//!        ↓
//! Arc<dyn Endpoint>                                ← stored in the route tree
//!        ↓
//! endpoint.call(req)  at request time              ← one vtable dispatch
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` lets tokio move the future across threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// The innermost layer of a [`Pipeline`](crate::Pipeline): turns a request
/// into a response once every before-stage has run.
///
/// [`Router`](crate::Router) is the usual endpoint. Implement this directly to
/// plug in your own dispatch (a reverse proxy, a static file server, …).
pub trait Endpoint: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

/// An endpoint shared across concurrent requests.
pub(crate) type SharedEndpoint = Arc<dyn Endpoint>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> Arc<dyn Endpoint>;
}

mod sealed {
    pub trait Sealed {}
}

impl<F, Fut, R> sealed::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> Arc<dyn Endpoint> {
        Arc::new(HandlerEndpoint(self))
    }
}

/// An async fn seen as an endpoint: its output is converted with
/// [`IntoResponse`] once it resolves.
struct HandlerEndpoint<F>(F);

impl<F, Fut, R> Endpoint for HandlerEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
