use std::ops::{Deref, DerefMut};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use super::matrix::SharedMatrix;
use super::MemoryError;

/// Whether a stored vector represents a matrix row or a matrix column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Row,
    Column,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}

/// Data behind a [`SharedVector`]'s lock.
///
/// Only reachable through a [`VectorReadGuard`] or [`VectorWriteGuard`], so
/// every read or mutation happens with the right lock held.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorBuffer {
    values: Vec<f64>,
    orientation: Orientation,
}

impl VectorBuffer {
    pub fn get(&self, index: usize) -> Result<f64, MemoryError> {
        self.values
            .get(index)
            .copied()
            .ok_or(MemoryError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn check_len(&self, other: &VectorBuffer) -> Result<(), MemoryError> {
        if self.values.len() != other.values.len() {
            return Err(MemoryError::LengthMismatch {
                left: self.values.len(),
                right: other.values.len(),
            });
        }
        Ok(())
    }

    /// Sum of elementwise products.
    pub fn dot(&self, other: &VectorBuffer) -> Result<f64, MemoryError> {
        self.check_len(other)?;
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Flip the orientation tag. The data is untouched.
    pub fn transpose(&mut self) {
        self.orientation = self.orientation.flipped();
    }

    /// In-place `self[i] += other[i]`.
    pub fn add(&mut self, other: &VectorBuffer) -> Result<(), MemoryError> {
        self.check_len(other)?;
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        Ok(())
    }

    pub fn negate(&mut self) {
        for v in &mut self.values {
            *v = -*v;
        }
    }

    /// Replace this buffer with `self · matrix`, one entry per vector of
    /// `matrix` (its columns when loaded column-major).
    ///
    /// Each column is read-locked only while its dot product is computed, so
    /// at most one foreign lock is held at any time. The buffer is swapped in
    /// after every entry has been computed.
    pub fn vec_mat_mul(&mut self, matrix: &SharedMatrix) -> Result<(), MemoryError> {
        let mut result = Vec::with_capacity(matrix.len());
        for j in 0..matrix.len() {
            let column = matrix.get(j)?.read()?;
            result.push(self.dot(&column)?);
        }
        self.values = result;
        Ok(())
    }
}

/// A fixed-length numeric vector guarded by one reader/writer lock.
#[derive(Debug)]
pub struct SharedVector {
    data: RwLock<VectorBuffer>,
}

impl SharedVector {
    pub fn new(values: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            data: RwLock::new(VectorBuffer {
                values,
                orientation,
            }),
        }
    }

    /// Acquire a shared read lock, released when the guard drops.
    pub fn read(&self) -> Result<VectorReadGuard<'_>, MemoryError> {
        self.data
            .read()
            .map(|guard| VectorReadGuard { guard })
            .map_err(|e| MemoryError::LockPoisoned(format!("vector read lock: {}", e)))
    }

    /// Acquire the exclusive write lock, released when the guard drops.
    pub fn write(&self) -> Result<VectorWriteGuard<'_>, MemoryError> {
        self.data
            .write()
            .map(|guard| VectorWriteGuard { guard })
            .map_err(|e| MemoryError::LockPoisoned(format!("vector write lock: {}", e)))
    }

    pub fn len(&self) -> Result<usize, MemoryError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, MemoryError> {
        Ok(self.read()?.is_empty())
    }

    pub fn orientation(&self) -> Result<Orientation, MemoryError> {
        Ok(self.read()?.orientation())
    }

    pub fn get(&self, index: usize) -> Result<f64, MemoryError> {
        self.read()?.get(index)
    }
}

/// Shared access to a [`SharedVector`]'s buffer.
pub struct VectorReadGuard<'a> {
    guard: RwLockReadGuard<'a, VectorBuffer>,
}

impl Deref for VectorReadGuard<'_> {
    type Target = VectorBuffer;

    fn deref(&self) -> &VectorBuffer {
        &self.guard
    }
}

/// Exclusive access to a [`SharedVector`]'s buffer.
pub struct VectorWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, VectorBuffer>,
}

impl Deref for VectorWriteGuard<'_> {
    type Target = VectorBuffer;

    fn deref(&self) -> &VectorBuffer {
        &self.guard
    }
}

impl DerefMut for VectorWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut VectorBuffer {
        &mut self.guard
    }
}
