//! Batch Strategy Module
//!
//! Strategies for decoding many values at once:
//! - Parallel: independent sources decoded across the Rayon pool

pub mod parallel;

pub use parallel::decode_parallel;
