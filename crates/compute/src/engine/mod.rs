//! Dependency-driven resolution of an [`ExprNode`] tree.
//!
//! Each resolvable node is validated, its operands staged into the engine's
//! two reusable [`SharedMatrix`] instances, decomposed into one task per
//! left row and run as a single scheduler batch. After the batch barrier the
//! left staging matrix holds the result, which replaces the node.

mod tasks;

use std::time::Instant;

use lae_core::{shape_of, DenseMatrix, ExprNode, OpKind, Shape, ShapeError};
use tracing::{debug, info};

use crate::memory::{MemoryError, SharedMatrix, VectorBuffer};
use crate::scheduler::{
    Scheduler, SchedulerConfig, SchedulerError, TaskFailure, WorkerReport,
};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Illegal operation: dimensions mismatch for {op} ({left} vs {right})")]
    DimensionMismatch { op: OpKind, left: Shape, right: Shape },
    #[error("Operator {op} expects {expected} operand(s), got {found}")]
    Arity {
        op: OpKind,
        expected: usize,
        found: usize,
    },
    #[error("Node is not resolvable: {0}")]
    NotResolvable(String),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("{} row task(s) failed during {op}", .failures.len())]
    TaskFailed {
        op: OpKind,
        failures: Vec<TaskFailure>,
    },
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Evaluates expression trees on a fatigue-scheduled worker pool.
///
/// The staging matrices are reused for every node, so one engine runs one
/// tree at a time (`run` takes `&mut self`). Concurrent computations need
/// separate engines.
pub struct LinearAlgebraEngine {
    left: SharedMatrix,
    right: SharedMatrix,
    scheduler: Scheduler,
}

impl LinearAlgebraEngine {
    /// Create an engine backed by `threads` workers (at least 1).
    pub fn new(threads: usize) -> Result<Self, EngineError> {
        Ok(Self::with_scheduler(Scheduler::new(threads)?))
    }

    pub fn with_config(config: SchedulerConfig) -> Result<Self, EngineError> {
        Ok(Self::with_scheduler(Scheduler::with_config(config)?))
    }

    pub fn with_scheduler(scheduler: Scheduler) -> Self {
        Self {
            left: SharedMatrix::new(),
            right: SharedMatrix::new(),
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Resolve the whole tree and return it as a single leaf.
    ///
    /// Associative chains are nested into binary nodes first; then the next
    /// resolvable node is computed until none is left.
    pub fn run(&mut self, mut root: ExprNode) -> Result<ExprNode, EngineError> {
        let start = Instant::now();
        root.associative_nesting();

        let mut resolved = 0usize;
        while let Some(node) = root.find_resolvable() {
            self.load_and_compute(node)?;
            resolved += 1;
        }

        info!(
            nodes = resolved,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Expression tree resolved"
        );
        Ok(root)
    }

    /// Compute one node whose operands are all matrices and collapse it into
    /// a leaf.
    ///
    /// Shapes are validated before anything is staged or scheduled, so a
    /// mismatch leaves the scheduler untouched.
    pub fn load_and_compute(&mut self, node: &mut ExprNode) -> Result<(), EngineError> {
        let start = Instant::now();
        let (op, children) = match &*node {
            ExprNode::Op { kind, children } => (*kind, children),
            ExprNode::Matrix(_) => {
                return Err(EngineError::NotResolvable(
                    "node is already a matrix".to_string(),
                ))
            }
        };
        if children.len() != op.arity() {
            return Err(EngineError::Arity {
                op,
                expected: op.arity(),
                found: children.len(),
            });
        }
        let operands = children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                child.matrix().ok_or_else(|| {
                    EngineError::NotResolvable(format!("operand {} of {} is not a matrix", i, op))
                })
            })
            .collect::<Result<Vec<&DenseMatrix>, _>>()?;

        let tasks = match op {
            OpKind::Add => {
                let (a, b) = (operands[0], operands[1]);
                let (left, right) = (shape_of(a)?, shape_of(b)?);
                if left != right {
                    return Err(EngineError::DimensionMismatch { op, left, right });
                }
                self.left.load_row_major(a)?;
                self.right.load_row_major(b)?;
                tasks::add_rows(&self.left, &self.right)
            }
            OpKind::Multiply => {
                let (a, b) = (operands[0], operands[1]);
                let (left, right) = (shape_of(a)?, shape_of(b)?);
                if left.cols != right.rows {
                    return Err(EngineError::DimensionMismatch { op, left, right });
                }
                self.left.load_row_major(a)?;
                self.right.load_column_major(b)?;
                tasks::multiply_rows(&self.left, &self.right)
            }
            OpKind::Negate => {
                self.left.load_row_major(operands[0])?;
                tasks::unary_rows(&self.left, VectorBuffer::negate)
            }
            OpKind::Transpose => {
                self.left.load_row_major(operands[0])?;
                tasks::unary_rows(&self.left, VectorBuffer::transpose)
            }
        };

        let outcome = self.scheduler.submit_batch(tasks)?;
        if !outcome.is_success() {
            return Err(EngineError::TaskFailed {
                op,
                failures: outcome.failures,
            });
        }

        let result = self.left.read_row_major()?;
        debug!(
            op = %op,
            rows = result.len(),
            tasks = outcome.submitted,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Node resolved"
        );
        node.resolve(result);
        Ok(())
    }

    pub fn report(&self) -> WorkerReport {
        self.scheduler.report()
    }

    /// Human-readable worker activity report.
    pub fn worker_report(&self) -> String {
        self.scheduler.worker_report()
    }

    /// Stop the worker pool. Also happens on drop.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        Ok(self.scheduler.shutdown()?)
    }
}
