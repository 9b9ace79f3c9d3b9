use std::path::Path;

use anyhow::{Context, Result};
use lae_core::DenseMatrix;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum OutputDocument<'a> {
    Result(&'a DenseMatrix),
    Error(&'a str),
}

fn write_document(path: &Path, document: &OutputDocument<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(document).context("failed to serialize output")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write output file {}", path.display()))
}

/// Write `{"result": [[...]]}`.
pub fn write_result(path: &Path, matrix: &DenseMatrix) -> Result<()> {
    write_document(path, &OutputDocument::Result(matrix))
}

/// Write `{"error": "..."}`.
pub fn write_error(path: &Path, message: &str) -> Result<()> {
    write_document(path, &OutputDocument::Error(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_result_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_result(&path, &vec![vec![1.0, 2.5], vec![-3.0, 0.0]]).unwrap();

        let json = read_json(&path);
        assert_eq!(json, serde_json::json!({"result": [[1.0, 2.5], [-3.0, 0.0]]}));
    }

    #[test]
    fn writes_error_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_error(&path, "Illegal operation: dimensions mismatch").unwrap();

        let json = read_json(&path);
        assert_eq!(json["error"], "Illegal operation: dimensions mismatch");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        assert!(write_error(&path, "x").is_err());
    }
}
