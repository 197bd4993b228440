//! ethphish Core
//!
//! Core types and utilities shared across the ethphish crates.
//!
//! This crate provides:
//! - Transaction-sequence records and batches
//! - Per-record predictions produced by evaluation
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{AddressId, Batch, Prediction, Record, SequenceKind, SubSequence};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{AddressId, Batch, Prediction, Record, SequenceKind, SubSequence};
}
