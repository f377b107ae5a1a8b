//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router is the
//! terminal [`Endpoint`] of a pipeline: middleware runs around it, never
//! inside it.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, Endpoint, Handler, SharedEndpoint};
use crate::request::Request;
use crate::response::Response;

/// The route pattern that matched a request, e.g. `/books/{id}`.
///
/// The router attaches it to every routed response's extensions so that
/// after-stages can report per-route figures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchedRoute(Arc<str>);

impl MatchedRoute {
    pub fn as_str(&self) -> &str { &self.0 }
}

struct Route {
    pattern: Arc<str>,
    handler: SharedEndpoint,
}

/// The application router.
///
/// Build it once at startup and hand it to a [`Pipeline`](crate::Pipeline).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust
    /// # use strata::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn list_books(_: Request) -> Response { Response::text("") }
    /// # async fn get_book(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET, "/books/",     list_books)
    ///     .on(Method::GET, "/books/{id}", get_book);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for the same method. Routes are fixed at startup, so this
    /// surfaces immediately.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let route = Route { pattern: Arc::from(path), handler: handler.into_endpoint() };
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(SharedEndpoint, MatchedRoute, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((
            Arc::clone(&matched.value.handler),
            MatchedRoute(Arc::clone(&matched.value.pattern)),
            params,
        ))
    }

    fn matches_other_method(&self, method: &Method, path: &str) -> bool {
        self.routes.iter()
            .any(|(m, tree)| m != method && tree.at(path).is_ok())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Endpoint for Router {
    fn call(&self, mut req: Request) -> BoxFuture {
        match self.lookup(&req.method, &req.path) {
            Some((handler, route, params)) => {
                req.params = params;
                let fut = handler.call(req);
                Box::pin(async move {
                    let mut res = fut.await;
                    res.extensions_mut().insert(route);
                    res
                })
            }
            None if self.matches_other_method(&req.method, &req.path) => {
                Box::pin(async { Response::status(StatusCode::METHOD_NOT_ALLOWED) })
            }
            None => Box::pin(async { Response::status(StatusCode::NOT_FOUND) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn show(req: Request) -> String {
        format!("book {}", req.param("id").unwrap_or("?"))
    }

    async fn index(_req: Request) -> Response {
        Response::html("<ul></ul>")
    }

    fn router() -> Router {
        Router::new()
            .on(Method::GET, "/books/", index)
            .on(Method::GET, "/books/{id}", show)
    }

    #[tokio::test]
    async fn routes_and_records_pattern() {
        let res = router().call(Request::new(Method::GET, "/books/7")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"book 7");
        assert_eq!(
            res.extensions().get::<MatchedRoute>().map(MatchedRoute::as_str),
            Some("/books/{id}"),
        );
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let res = router().call(Request::new(Method::GET, "/authors/")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert!(res.extensions().get::<MatchedRoute>().is_none());
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let res = router().call(Request::new(Method::DELETE, "/books/")).await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_route_panics() {
        let _ = Router::new()
            .on(Method::GET, "/books/{id}", show)
            .on(Method::GET, "/books/{slug}", show);
    }
}
