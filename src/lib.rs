//! `procurement-dashboard` library crate.
//!
//! The binary (`procure`) is a thin wrapper around this library so that:
//!
//! - loading and metrics are testable without spawning processes
//! - the text report and the TUI share one pipeline
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod tui;
