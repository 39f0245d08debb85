//! # Clay Common Library
//!
//! Shared code for the site server and the syncr tools:
//! - Database initialization and schema
//! - Configuration loading and root folder resolution
//! - DB-backed page cache
//! - Text and date helpers used by both templates and synchronizers

pub mod cache;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod text;

pub use error::{Error, Result};
