//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed category set and sheet schema (`Category`, `TableSchema`)
//! - normalized purchase rows (`PurchaseRecord`)
//! - derived outputs (`KpiSummary`, `CycleEstimate`, `TidyRow`)

pub mod types;

pub use types::*;
