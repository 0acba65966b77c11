//! PartShelf Common Library
//!
//! Shared code for the PartShelf footprint catalog including:
//! - Database models and repository patterns
//! - Category tree and footprint aggregate logic
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use catalog::{CategoryTree, FootprintAggregate};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
