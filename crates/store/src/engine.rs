//! Storage engine contract for spreadsheet-like row collections.
//!
//! The route store needs exactly four capabilities from its storage: append a
//! row, read a rectangular range, delete rows by address, and evaluate a
//! filter expression. [`RowEngine`] captures that contract; the store is
//! agnostic to what backs it. [`Workbook`](crate::workbook::Workbook) is the
//! in-process implementation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 1-indexed position of a row within a sheet.
///
/// Unstable: addresses shift as soon as any earlier row is deleted.
pub type RowAddress = u32;

/// A scalar cell value, mirroring the spreadsheet value model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// A query match: the matching row's current address plus its cells.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub address: RowAddress,
    pub cells: Vec<Cell>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The backing workbook file does not exist.
    #[error("workbook file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("workbook I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook serialization failed: {0}")]
    Persist(#[from] serde_json::Error),

    #[error("workbook lock poisoned")]
    LockPoisoned,
}

/// The row-storage contract the route store runs against.
///
/// Sheets come into existence on first reference; reading or querying a sheet
/// that was never written behaves like an empty one. All operations are
/// blocking from the caller's perspective.
pub trait RowEngine: Send + Sync {
    /// Append one row to the end of `sheet`.
    fn append_row(&self, sheet: &str, cells: &[Cell]) -> Result<(), EngineError>;

    /// Read a rectangular range, 1-indexed, clipped to existing data.
    fn read_range(
        &self,
        sheet: &str,
        start_row: u32,
        start_col: u32,
        rows: u32,
        cols: u32,
    ) -> Result<Vec<Vec<Cell>>, EngineError>;

    /// Delete the addressed rows, processed in the order given.
    ///
    /// Addresses refer to the layout at call time; callers deleting several
    /// rows must order them descending so earlier removals cannot shift rows
    /// still scheduled for deletion.
    fn delete_rows(&self, sheet: &str, addresses: &[RowAddress]) -> Result<(), EngineError>;

    /// Evaluate a filter expression against `sheet`.
    ///
    /// The expression grammar is the one
    /// [`QueryBuilder`](crate::query::QueryBuilder) emits. An expression the
    /// engine cannot interpret yields zero hits rather than an error.
    fn evaluate_query(&self, sheet: &str, query: &str) -> Result<Vec<QueryHit>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_serialize_untagged() {
        assert_eq!(serde_json::to_value(Cell::Text("x".into())).unwrap(), "x");
        assert_eq!(serde_json::to_value(Cell::Number(2.5)).unwrap(), 2.5);

        let cells: Vec<Cell> = serde_json::from_str(r#"["route", 1700000000123.0]"#).unwrap();
        assert_eq!(cells[0], Cell::Text("route".into()));
        assert_eq!(cells[1], Cell::Number(1_700_000_000_123.0));
    }

    #[test]
    fn accessors_reject_the_other_kind() {
        assert_eq!(Cell::Text("x".into()).as_number(), None);
        assert_eq!(Cell::Number(1.0).as_text(), None);
    }
}
