//! HTTP handlers for clay-web

pub mod health;
pub mod index;
pub mod pages;

pub use health::health_routes;
pub use index::index;
pub use pages::{project_page, static_file};
