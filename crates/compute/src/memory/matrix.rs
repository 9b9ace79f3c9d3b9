use std::sync::Arc;

use lae_core::{shape_of, DenseMatrix};

use super::vector::{Orientation, SharedVector, VectorReadGuard};
use super::MemoryError;

/// Ordered collection of [`SharedVector`]s sharing one orientation.
///
/// Cloning is cheap and yields a handle onto the same vectors, which is how
/// row tasks reach the staged operands. A load swaps in a whole new vector
/// set; handles cloned before the load keep the old set alive until dropped.
#[derive(Debug, Clone)]
pub struct SharedMatrix {
    vectors: Arc<[SharedVector]>,
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self {
            vectors: Arc::from(Vec::new()),
        }
    }
}

impl SharedMatrix {
    /// An empty matrix with no vectors.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_row_major(matrix: &[Vec<f64>]) -> Result<Self, MemoryError> {
        let mut shared = Self::new();
        shared.load_row_major(matrix)?;
        Ok(shared)
    }

    /// Replace the vector set with one row vector per matrix row.
    pub fn load_row_major(&mut self, matrix: &[Vec<f64>]) -> Result<(), MemoryError> {
        shape_of(matrix)?;
        self.vectors = matrix
            .iter()
            .map(|row| SharedVector::new(row.clone(), Orientation::Row))
            .collect();
        Ok(())
    }

    /// Replace the vector set with one column vector per matrix column.
    pub fn load_column_major(&mut self, matrix: &[Vec<f64>]) -> Result<(), MemoryError> {
        let shape = shape_of(matrix)?;
        self.vectors = (0..shape.cols)
            .map(|col| {
                let column = matrix.iter().map(|row| row[col]).collect();
                SharedVector::new(column, Orientation::Column)
            })
            .collect();
        Ok(())
    }

    /// Consistent row-major snapshot of the whole matrix.
    ///
    /// Read locks on every vector are acquired in index order and all held
    /// while the output is materialized, so no vector can be mid-write during
    /// the capture. Column-oriented vectors are transposed on the fly.
    pub fn read_row_major(&self) -> Result<DenseMatrix, MemoryError> {
        let guards = self
            .vectors
            .iter()
            .map(SharedVector::read)
            .collect::<Result<Vec<VectorReadGuard<'_>>, _>>()?;

        let Some(first) = guards.first() else {
            return Ok(Vec::new());
        };

        let result = match first.orientation() {
            Orientation::Row => guards.iter().map(|g| g.values().to_vec()).collect(),
            Orientation::Column => {
                let rows = first.len();
                let mut result = vec![Vec::with_capacity(guards.len()); rows];
                for column in &guards {
                    if column.len() != rows {
                        return Err(MemoryError::LengthMismatch {
                            left: rows,
                            right: column.len(),
                        });
                    }
                    for (row, value) in result.iter_mut().zip(column.values()) {
                        row.push(*value);
                    }
                }
                result
            }
        };
        drop(guards);
        Ok(result)
    }

    pub fn get(&self, index: usize) -> Result<&SharedVector, MemoryError> {
        self.vectors.get(index).ok_or(MemoryError::IndexOutOfBounds {
            index,
            len: self.vectors.len(),
        })
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Orientation of the stored vectors, `None` when empty.
    pub fn orientation(&self) -> Result<Option<Orientation>, MemoryError> {
        self.vectors.first().map(SharedVector::orientation).transpose()
    }
}
