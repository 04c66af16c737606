//! Crumb Cookie Database Loader
//!
//! This crate reads the Open Cookie Database CSV into
//! [`crumb_core::DatabaseEntry`] rows for the classifier.

pub mod loader;
pub mod optimizer;
pub mod parser;

pub use loader::{load_database, load_database_text, DatabaseError};
pub use optimizer::{optimize_entries, OptimizeStats};
pub use parser::{parse_cookie_database, ParseOutput};
