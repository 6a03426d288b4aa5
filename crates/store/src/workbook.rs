//! In-process workbook engine with optional JSON-file persistence.
//!
//! Sheets live in memory behind an `RwLock`; when a backing path is set,
//! every mutation rewrites the file. The query path mirrors the hosted
//! facility this engine stands in for: the filter expression is wrapped into
//! a `=QUERY(...)` scratch formula (escaping the sheet reference and the
//! embedded expression), and the formula is then pulled apart again and
//! interpreted. Keeping the round trip means both literal syntaxes are
//! exercised, nested, on every query: the same text a remote spreadsheet
//! would receive.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::{Cell, EngineError, QueryHit, RowAddress, RowEngine};
use crate::filter::Filter;
use crate::query::query_formula;

type SheetMap = BTreeMap<String, Vec<Vec<Cell>>>;

/// Serialized workbook file shape.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct WorkbookFile {
    sheets: SheetMap,
}

#[derive(serde::Serialize)]
struct WorkbookFileRef<'a> {
    sheets: &'a SheetMap,
}

/// An in-process [`RowEngine`], optionally mirrored to a JSON file.
#[derive(Debug)]
pub struct Workbook {
    sheets: RwLock<SheetMap>,
    path: Option<PathBuf>,
}

impl Workbook {
    /// A workbook with no backing file.
    pub fn in_memory() -> Self {
        Self {
            sheets: RwLock::new(SheetMap::new()),
            path: None,
        }
    }

    /// Load a workbook from `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        if !path.exists() {
            return Err(EngineError::FileNotFound(path));
        }
        let bytes = std::fs::read(&path)?;
        let file: WorkbookFile = serde_json::from_slice(&bytes)?;
        Ok(Self {
            sheets: RwLock::new(file.sheets),
            path: Some(path),
        })
    }

    /// Start an empty workbook that will be written to `path` on first
    /// mutation.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            sheets: RwLock::new(SheetMap::new()),
            path: Some(path.into()),
        }
    }

    fn read_sheets(&self) -> Result<RwLockReadGuard<'_, SheetMap>, EngineError> {
        self.sheets.read().map_err(|_| EngineError::LockPoisoned)
    }

    fn write_sheets(&self) -> Result<RwLockWriteGuard<'_, SheetMap>, EngineError> {
        self.sheets.write().map_err(|_| EngineError::LockPoisoned)
    }

    fn persist(&self, sheets: &SheetMap) -> Result<(), EngineError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&WorkbookFileRef { sheets })?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl RowEngine for Workbook {
    fn append_row(&self, sheet: &str, cells: &[Cell]) -> Result<(), EngineError> {
        let mut sheets = self.write_sheets()?;
        sheets.entry(sheet.to_string()).or_default().push(cells.to_vec());
        self.persist(&sheets)
    }

    fn read_range(
        &self,
        sheet: &str,
        start_row: u32,
        start_col: u32,
        rows: u32,
        cols: u32,
    ) -> Result<Vec<Vec<Cell>>, EngineError> {
        let sheets = self.read_sheets()?;
        let Some(data) = sheets.get(sheet) else {
            return Ok(Vec::new());
        };
        let out = data
            .iter()
            .skip(start_row.saturating_sub(1) as usize)
            .take(rows as usize)
            .map(|row| {
                row.iter()
                    .skip(start_col.saturating_sub(1) as usize)
                    .take(cols as usize)
                    .cloned()
                    .collect()
            })
            .collect();
        Ok(out)
    }

    fn delete_rows(&self, sheet: &str, addresses: &[RowAddress]) -> Result<(), EngineError> {
        let mut sheets = self.write_sheets()?;
        if let Some(data) = sheets.get_mut(sheet) {
            for &address in addresses {
                let index = address.saturating_sub(1) as usize;
                if address >= 1 && index < data.len() {
                    data.remove(index);
                }
            }
        }
        self.persist(&sheets)
    }

    fn evaluate_query(&self, sheet: &str, query: &str) -> Result<Vec<QueryHit>, EngineError> {
        // Round-trip through the scratch formula the hosted facility would
        // evaluate, then interpret the recovered expression.
        let formula = query_formula(sheet, query);
        let Some((target, expression)) = parse_scratch_formula(&formula) else {
            tracing::warn!(%formula, "scratch formula did not parse; returning no rows");
            return Ok(Vec::new());
        };
        let filter = match Filter::parse(&expression) {
            Ok(filter) => filter,
            Err(err) => {
                // Fail-soft: the hosted facility renders a bad formula as
                // `#N/A`, which callers read as an empty result set.
                tracing::warn!(query, error = %err, "filter expression did not parse; returning no rows");
                return Ok(Vec::new());
            }
        };
        let sheets = self.read_sheets()?;
        let rows = sheets.get(&target).map(Vec::as_slice).unwrap_or(&[]);
        Ok(filter.run(rows))
    }
}

/// Split a scratch formula back into its sheet reference and embedded query,
/// undoing both escaping layers.
fn parse_scratch_formula(formula: &str) -> Option<(String, String)> {
    let rest = formula.strip_prefix("=QUERY(")?;
    let rest = rest.strip_suffix(')')?;
    let (sheet, rest) = take_quoted(rest, '\'')?;
    let rest = rest.strip_prefix("!A:Z, ")?;
    let (query, rest) = take_quoted(rest, '"')?;
    rest.is_empty().then_some((sheet, query))
}

/// Consume a `quote`-delimited literal (doubled-quote escapes) from the front
/// of `input`, returning the decoded text and the remainder.
fn take_quoted(input: &str, quote: char) -> Option<(String, &str)> {
    let mut chars = input.char_indices();
    let (_, first) = chars.next()?;
    if first != quote {
        return None;
    }
    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        if c != quote {
            out.push(c);
            continue;
        }
        match chars.clone().next() {
            Some((_, next)) if next == quote => {
                out.push(quote);
                chars.next();
            }
            _ => return Some((out, &input[i + quote.len_utf8()..])),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::Text((*v).to_string())).collect()
    }

    #[test]
    fn append_then_read_range() {
        let wb = Workbook::in_memory();
        wb.append_row("s", &row(&["a", "b", "c"])).unwrap();
        wb.append_row("s", &row(&["d", "e", "f"])).unwrap();

        let all = wb.read_range("s", 1, 1, 10, 10).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], row(&["a", "b", "c"]));

        // 1-indexed, clipped.
        let clipped = wb.read_range("s", 2, 2, 5, 1).unwrap();
        assert_eq!(clipped, vec![row(&["e"])]);
    }

    #[test]
    fn unknown_sheet_reads_as_empty() {
        let wb = Workbook::in_memory();
        assert!(wb.read_range("nope", 1, 1, 10, 10).unwrap().is_empty());
        assert!(wb.evaluate_query("nope", "select *").unwrap().is_empty());
    }

    #[test]
    fn delete_rows_processes_addresses_in_given_order() {
        let wb = Workbook::in_memory();
        for v in ["one", "two", "three", "four"] {
            wb.append_row("s", &row(&[v])).unwrap();
        }

        // Descending order: both target rows go, later addresses first.
        wb.delete_rows("s", &[3, 1]).unwrap();
        let left = wb.read_range("s", 1, 1, 10, 10).unwrap();
        assert_eq!(left, vec![row(&["two"]), row(&["four"])]);
    }

    #[test]
    fn delete_rows_ignores_out_of_range_addresses() {
        let wb = Workbook::in_memory();
        wb.append_row("s", &row(&["only"])).unwrap();
        wb.delete_rows("s", &[99, 0]).unwrap();
        assert_eq!(wb.read_range("s", 1, 1, 10, 10).unwrap().len(), 1);
    }

    #[test]
    fn query_hits_carry_row_addresses() {
        let wb = Workbook::in_memory();
        wb.append_row("s", &row(&["route", "u1"])).unwrap();
        wb.append_row("s", &row(&["route", "u2"])).unwrap();
        wb.append_row("s", &row(&["route", "u1"])).unwrap();

        let hits = wb.evaluate_query("s", "select * where Col3 = 'u1'").unwrap();
        let addresses: Vec<_> = hits.iter().map(|h| h.address).collect();
        assert_eq!(addresses, vec![1, 3]);
        assert_eq!(hits[0].cells, row(&["route", "u1"]));
    }

    #[test]
    fn query_values_survive_both_escaping_layers() {
        // Values containing both quote kinds round-trip through the scratch
        // formula's nested literals.
        let wb = Workbook::in_memory();
        wb.append_row("it's a sheet", &row(&["a'b\"c"])).unwrap();

        let query = crate::query::QueryBuilder::new().eq_text(2, "a'b\"c").build();
        let hits = wb.evaluate_query("it's a sheet", &query).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn malformed_query_yields_zero_hits_not_an_error() {
        let wb = Workbook::in_memory();
        wb.append_row("s", &row(&["route"])).unwrap();
        let hits = wb.evaluate_query("s", "drop table routes").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn scratch_formula_round_trips() {
        let formula = query_formula("it's", "select * where Col2 = 'a''b\"c'");
        let (sheet, query) = parse_scratch_formula(&formula).unwrap();
        assert_eq!(sheet, "it's");
        assert_eq!(query, "select * where Col2 = 'a''b\"c'");
    }

    #[test]
    fn persists_to_file_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");

        let wb = Workbook::create(&path);
        wb.append_row("s", &[Cell::Text("x".into()), Cell::Number(42.0)])
            .unwrap();
        assert!(path.exists());

        let reopened = Workbook::open(&path).unwrap();
        let rows = reopened.read_range("s", 1, 1, 10, 10).unwrap();
        assert_eq!(rows, vec![vec![Cell::Text("x".into()), Cell::Number(42.0)]]);
    }

    #[test]
    fn open_missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Workbook::open(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));
    }

    #[test]
    fn deletions_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");

        let wb = Workbook::create(&path);
        wb.append_row("s", &row(&["one"])).unwrap();
        wb.append_row("s", &row(&["two"])).unwrap();
        wb.delete_rows("s", &[1]).unwrap();

        let reopened = Workbook::open(&path).unwrap();
        assert_eq!(reopened.read_range("s", 1, 1, 10, 10).unwrap(), vec![row(&["two"])]);
    }
}
