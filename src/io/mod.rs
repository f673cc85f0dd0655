//! Input/output helpers.
//!
//! - spreadsheet/CSV ingest + validation (`ingest`)
//! - memoized loads keyed by file identity (`cache`)
//! - result exports (CSV/JSON) (`export`)

pub mod cache;
pub mod export;
pub mod ingest;

pub use cache::TableCache;
pub use ingest::{load_table, LoadError, LoadedTable};
