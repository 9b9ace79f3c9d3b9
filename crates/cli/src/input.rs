//! JSON input format.
//!
//! A leaf is an array of numeric rows; an operator node is
//! `{"operator": "+" | "*" | "-" | "T", "operands": [...]}`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use lae_core::{DenseMatrix, ExprNode, OpKind};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Matrix(DenseMatrix),
    Op {
        operator: String,
        operands: Vec<RawNode>,
    },
}

impl RawNode {
    fn into_expr(self) -> Result<ExprNode> {
        match self {
            RawNode::Matrix(m) => Ok(ExprNode::leaf(m)),
            RawNode::Op { operator, operands } => {
                let Some(kind) = OpKind::from_symbol(&operator) else {
                    bail!("Unknown operator: {}", operator);
                };
                if operands.is_empty() {
                    bail!("Operator {} has no operands", operator);
                }
                let children = operands
                    .into_iter()
                    .map(RawNode::into_expr)
                    .collect::<Result<Vec<_>>>()?;
                Ok(ExprNode::op(kind, children))
            }
        }
    }
}

pub fn parse_tree(json: &str) -> Result<ExprNode> {
    let raw: RawNode = serde_json::from_str(json).context("malformed expression JSON")?;
    raw.into_expr()
}

pub fn read_tree(path: &Path) -> Result<ExprNode> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    parse_tree(&json)
}
