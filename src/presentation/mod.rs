//! Presentation layer: HTTP routes, handlers, extractors and DTOs

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use routes::{ApiDoc, AppState, create_router};
