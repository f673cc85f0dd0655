//! Sample data generation.

pub mod sample;
