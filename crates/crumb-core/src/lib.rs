//! Crumb Core Library
//!
//! This crate provides the cookie classification and deduplication engine for
//! Crumb. It performs no I/O: the crawler hands it raw cookie records and
//! per-page storage snapshots, the database loader hands it a table of known
//! cookies, and every function returns plain, serializable data.
//!
//! # Architecture
//!
//! Classification is an ordered decision procedure. A cookie is looked up in
//! the database first; on a miss the rule table is consulted (domain, name,
//! keyword), then shape heuristics, and finally the `Other` default. The
//! stage that decided is recorded as the classification method.
//!
//! # Modules
//!
//! - `types`: Cookie, category and storage data model
//! - `domain`: Host normalisation and registrable-domain helpers
//! - `rules`: Static rule tables and rule evaluation
//! - `heuristics`: Shape-based fallback classifiers
//! - `database`: Indexed cookie database lookup
//! - `classifier`: Orchestration into category buckets
//! - `dedup`: Identity-key deduplication
//! - `consent`: Pre/post consent comparison
//! - `fingerprint`: Fingerprinting evidence scan
//! - `report`: Aggregate statistics

pub mod classifier;
pub mod consent;
pub mod database;
pub mod dedup;
pub mod domain;
pub mod fingerprint;
pub mod heuristics;
pub mod report;
pub mod rules;
pub mod types;

// Re-export commonly used types
pub use classifier::{classify, ClassifiedCookies, Classifier};
pub use consent::{diff, diff_storage, ConsentComparison, StorageChange};
pub use database::{map_database_category, CookieDatabase, DatabaseEntry};
pub use dedup::dedupe;
pub use fingerprint::{detect, FingerprintReport, FingerprintTechniques};
pub use report::CookieReport;
pub use rules::{classify_by_rule, RuleMatch, RuleStage, RuleTable};
pub use types::{
    Category, ClassificationMethod, ClassifiedCookie, Cookie, CookieSource, PageStorage, StorageSnapshot,
};
