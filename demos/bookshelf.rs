//! The bookshelf demo: one HTML page served through the standard pipeline.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example bookshelf
//!
//! Try:
//!   curl -i http://localhost:3000/books/
//!   curl -i --compressed http://localhost:3000/books/
//!   curl -i http://localhost:3000/books/2

use http::{Method, StatusCode};
use strata::{Config, Request, Response, Router, Server};
use tracing_subscriber::EnvFilter;

struct Book {
    title: &'static str,
    author: &'static str,
}

static BOOKS: [Book; 3] = [
    Book { title: "Book 1", author: "Author 1" },
    Book { title: "Book 2", author: "Author 2" },
    Book { title: "Book 3", author: "Author 3" },
];

#[tokio::main]
async fn main() -> Result<(), strata::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let app = Router::new()
        .on(Method::GET, "/books/",     book_list)
        .on(Method::GET, "/books/{id}", book_detail);

    Server::from_addr(config.addr)
        .serve(config.pipeline(app))
        .await
}

// GET /books/
async fn book_list(_req: Request) -> Response {
    let items: String = BOOKS
        .iter()
        .map(|book| format!("<li>{} by {}</li>", book.title, book.author))
        .collect();
    Response::html(format!(
        "<!doctype html><html><head><title>Books</title></head>\
         <body><h1>Books</h1><ul>{items}</ul></body></html>"
    ))
}

// GET /books/{id}  (1-based)
async fn book_detail(req: Request) -> Response {
    let book = req.param("id")
        .and_then(|id| id.parse::<usize>().ok())
        .and_then(|id| id.checked_sub(1))
        .and_then(|idx| BOOKS.get(idx));

    match book {
        Some(book) => Response::html(format!("<h1>{}</h1><p>{}</p>", book.title, book.author)),
        None => Response::status(StatusCode::NOT_FOUND),
    }
}
