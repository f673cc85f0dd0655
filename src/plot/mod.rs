//! Plain-text charts for the `summary` command.

pub mod ascii;

pub use ascii::*;
