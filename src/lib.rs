//! # strata
//!
//! An onion-model middleware pipeline and a minimal HTTP framework for Rust
//! services behind a reverse proxy.
//!
//! ## The model
//!
//! A [`Pipeline`] is an ordered list of [`Middleware`](middleware::Middleware)
//! wrapped around one [`Endpoint`] (usually a [`Router`]). Each request walks
//! in through every before-stage, hits the endpoint, and walks back out
//! through the after-stages in exact reverse order:
//!
//! ```text
//!            ┌ logger ┬ security ┬ compression ┬ cache-control ┐
//!  request ──┼────────┼──────────┼─────────────┼───────────────┼──▶ router
//! response ◀─┼────────┼──────────┼─────────────┼───────────────┼─── handler
//!            └────────┴──────────┴─────────────┴───────────────┘
//! ```
//!
//! A before-stage may answer on its own ([`Flow::Respond`](middleware::Flow));
//! only the layers already entered then unwind. A fault (an `Err` or a panic)
//! anywhere fails the request with a plain `500`; nothing half-decorated ever
//! reaches the client.
//!
//! What the proxy already owns — strata intentionally ignores:
//!
//! - **TLS termination**
//! - **Body-size limits**
//! - **Slow-client protection**
//!
//! Rate limiting, IP allow-lists and authentication are not built in. They
//! plug in as ordinary middleware.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strata::{Config, Request, Response, Router, Server};
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strata::Error> {
//!     let config = Config::from_env()?;
//!     let app = Router::new().on(Method::GET, "/books/", books);
//!
//!     Server::from_addr(config.addr)
//!         .serve(config.pipeline(app))
//!         .await
//! }
//!
//! async fn books(_req: Request) -> Response {
//!     Response::html("<ul><li>Book 1</li></ul>")
//! }
//! ```

mod config;
mod error;
mod handler;
mod pipeline;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use config::Config;
pub use error::{BoxError, Error, Fault, Stage};
pub use handler::{BoxFuture, Endpoint, Handler};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{MatchedRoute, Router};
pub use server::{Server, serve_listener};
