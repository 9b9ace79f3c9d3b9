pub mod config;
pub mod error;
pub mod expr;
pub mod matrix;

pub use config::Config;
pub use error::*;
pub use expr::{ExprNode, OpKind};
pub use matrix::{shape_of, DenseMatrix, Shape};
