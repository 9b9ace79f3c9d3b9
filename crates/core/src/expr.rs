//! Expression tree over dense matrices.
//!
//! Operator nodes are collapsed into leaves one at a time: callers ask for
//! the next resolvable node (an operator whose operands are all leaves),
//! compute it, and [`ExprNode::resolve`] it in place until the root is a leaf.

use serde::{Deserialize, Serialize};

use crate::matrix::DenseMatrix;

/// Linear-algebra operator carried by an inner node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Add,
    Multiply,
    Negate,
    Transpose,
}

impl OpKind {
    /// Textual operator used by the JSON input format.
    pub fn symbol(self) -> &'static str {
        match self {
            OpKind::Add => "+",
            OpKind::Multiply => "*",
            OpKind::Negate => "-",
            OpKind::Transpose => "T",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(OpKind::Add),
            "*" => Some(OpKind::Multiply),
            "-" => Some(OpKind::Negate),
            "T" => Some(OpKind::Transpose),
            _ => None,
        }
    }

    /// Add and Multiply chains may be regrouped without changing the result.
    pub fn is_associative(self) -> bool {
        matches!(self, OpKind::Add | OpKind::Multiply)
    }

    /// Number of operands the engine accepts for this operator.
    pub fn arity(self) -> usize {
        match self {
            OpKind::Add | OpKind::Multiply => 2,
            OpKind::Negate | OpKind::Transpose => 1,
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OpKind::Add => "add",
            OpKind::Multiply => "multiply",
            OpKind::Negate => "negate",
            OpKind::Transpose => "transpose",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// A computed (or literal) matrix.
    Matrix(DenseMatrix),
    /// An operator still waiting to be evaluated.
    Op { kind: OpKind, children: Vec<ExprNode> },
}

impl ExprNode {
    pub fn leaf(matrix: DenseMatrix) -> Self {
        ExprNode::Matrix(matrix)
    }

    pub fn op(kind: OpKind, children: Vec<ExprNode>) -> Self {
        ExprNode::Op { kind, children }
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, ExprNode::Matrix(_))
    }

    /// Operator of an inner node, `None` for a leaf.
    pub fn kind(&self) -> Option<OpKind> {
        match self {
            ExprNode::Matrix(_) => None,
            ExprNode::Op { kind, .. } => Some(*kind),
        }
    }

    pub fn children(&self) -> &[ExprNode] {
        match self {
            ExprNode::Matrix(_) => &[],
            ExprNode::Op { children, .. } => children,
        }
    }

    pub fn matrix(&self) -> Option<&DenseMatrix> {
        match self {
            ExprNode::Matrix(m) => Some(m),
            ExprNode::Op { .. } => None,
        }
    }

    pub fn into_matrix(self) -> Option<DenseMatrix> {
        match self {
            ExprNode::Matrix(m) => Some(m),
            ExprNode::Op { .. } => None,
        }
    }

    /// Collapse this node into a leaf holding `matrix`.
    pub fn resolve(&mut self, matrix: DenseMatrix) {
        *self = ExprNode::Matrix(matrix);
    }

    /// Rewrite every associative operator with more than two operands into
    /// a left-nested chain of binary nodes, so `a + b + c` becomes
    /// `(a + b) + c`. Operand order is preserved.
    pub fn associative_nesting(&mut self) {
        let ExprNode::Op { kind, children } = self else {
            return;
        };
        for child in children.iter_mut() {
            child.associative_nesting();
        }
        if !kind.is_associative() || children.len() <= 2 {
            return;
        }

        let kind = *kind;
        let rest = children.split_off(2);
        let first = ExprNode::op(kind, std::mem::take(children));
        let nested = rest
            .into_iter()
            .fold(first, |acc, next| ExprNode::op(kind, vec![acc, next]));
        *self = nested;
    }

    /// Next operator node whose operands are all leaves, searched
    /// depth-first and left to right. `None` means the tree is resolved.
    pub fn find_resolvable(&mut self) -> Option<&mut ExprNode> {
        let path = self.resolvable_path()?;
        let mut node = self;
        for index in path {
            node = match node {
                ExprNode::Op { children, .. } => children.get_mut(index)?,
                ExprNode::Matrix(_) => return None,
            };
        }
        Some(node)
    }

    fn resolvable_path(&self) -> Option<Vec<usize>> {
        let ExprNode::Op { children, .. } = self else {
            return None;
        };
        for (index, child) in children.iter().enumerate() {
            if let Some(mut path) = child.resolvable_path() {
                path.insert(0, index);
                return Some(path);
            }
        }
        // Every child is a leaf at this point.
        Some(Vec::new())
    }
}
