use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// Row-major dense matrix as exchanged with the tree and I/O layers.
pub type DenseMatrix = Vec<Vec<f64>>;

/// Row/column counts of a dense matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn transposed(self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Compute the shape of a dense matrix, rejecting ragged rows.
///
/// An empty matrix has shape 0x0.
pub fn shape_of(matrix: &[Vec<f64>]) -> Result<Shape, ShapeError> {
    let Some(first) = matrix.first() else {
        return Ok(Shape::new(0, 0));
    };
    let cols = first.len();
    for (row, values) in matrix.iter().enumerate() {
        if values.len() != cols {
            return Err(ShapeError {
                row,
                expected: cols,
                found: values.len(),
            });
        }
    }
    Ok(Shape::new(matrix.len(), cols))
}
