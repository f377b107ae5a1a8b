//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{Extensions, Method};

/// An incoming HTTP request.
///
/// Besides the wire data, every request carries a **context bag**: a typed
/// map scoped to this request only. Middleware uses it to hand data from its
/// before-stage to its after-stage. Each middleware keys its entries by a
/// type it owns, so entries from different middleware never collide.
///
/// ```rust
/// use strata::Request;
/// use http::Method;
///
/// #[derive(Clone)]
/// struct Tenant(&'static str);
///
/// let mut req = Request::new(Method::GET, "/books/")
///     .with_header("accept-encoding", "gzip");
/// req.context_mut().insert(Tenant("acme"));
///
/// assert_eq!(req.header("Accept-Encoding"), Some("gzip"));
/// assert_eq!(req.context().get::<Tenant>().map(|t| t.0), Some("acme"));
/// ```
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) peer: Option<SocketAddr>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) context: Extensions,
}

impl Request {
    /// A bodyless request with no headers and no known peer.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            peer: None,
            params: HashMap::new(),
            context: Extensions::new(),
        }
    }

    /// Appends a header. Names keep their original case.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Address of the connected client, when the host knows it.
    pub fn peer(&self) -> Option<SocketAddr> { self.peer }

    /// Case-insensitive header lookup. Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn context(&self) -> &Extensions { &self.context }
    pub fn context_mut(&mut self) -> &mut Extensions { &mut self.context }
}
