//! Row-granular task decomposition.
//!
//! Every task touches exactly one left row, write-locked for the whole task.
//! Tasks never share a left row, so they never contend with each other on
//! the left matrix; the only other locks taken are read locks on the right
//! operand, always acquired before the left row's write lock.

use crate::memory::{SharedMatrix, VectorBuffer};
use crate::scheduler::{task, Task};

/// `left[i] += right[i]` for every row.
pub(crate) fn add_rows(left: &SharedMatrix, right: &SharedMatrix) -> Vec<Task> {
    (0..left.len())
        .map(|i| {
            let left = left.clone();
            let right = right.clone();
            task(move || {
                let other = right.get(i)?.read()?;
                let mut row = left.get(i)?.write()?;
                row.add(&other)?;
                Ok(())
            })
        })
        .collect()
}

/// `left[i] = left[i] x right` for every row; `right` must be column-major.
pub(crate) fn multiply_rows(left: &SharedMatrix, right: &SharedMatrix) -> Vec<Task> {
    (0..left.len())
        .map(|i| {
            let left = left.clone();
            let right = right.clone();
            task(move || {
                let mut row = left.get(i)?.write()?;
                row.vec_mat_mul(&right)?;
                Ok(())
            })
        })
        .collect()
}

/// Apply an in-place unary operation to every row.
pub(crate) fn unary_rows(left: &SharedMatrix, op: fn(&mut VectorBuffer)) -> Vec<Task> {
    (0..left.len())
        .map(|i| {
            let left = left.clone();
            task(move || {
                let mut row = left.get(i)?.write()?;
                op(&mut *row);
                Ok(())
            })
        })
        .collect()
}
