use thiserror::Error;

/// A dense matrix whose rows do not all have the same length.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Ragged matrix: row {row} has {found} columns, expected {expected}")]
pub struct ShapeError {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
