//! Shared matrix memory guarded by per-vector reader/writer locks.
//!
//! A [`SharedMatrix`] is an ordered set of [`SharedVector`]s that all share
//! one [`Orientation`]. Row tasks lock individual vectors; only
//! [`SharedMatrix::read_row_major`] ever holds every lock at once.

pub mod matrix;
pub mod vector;

use lae_core::ShapeError;

pub use matrix::SharedMatrix;
pub use vector::{Orientation, SharedVector, VectorBuffer, VectorReadGuard, VectorWriteGuard};

/// Errors raised by the shared vector/matrix stores.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("Vector length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error(transparent)]
    Shape(#[from] ShapeError),
}
