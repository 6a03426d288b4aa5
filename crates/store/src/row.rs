//! Row codec: [`Route`] ⇄ the flat 9-cell storage row.
//!
//! Layout: `[type, userId, routeId, routeName, description, note, dataJson,
//! coordinates, updatedAtMillis]`. The `data` map travels JSON-encoded inside
//! a single text cell; `updatedAt` is a numeric cell holding epoch
//! milliseconds.

use chrono::{DateTime, Utc};
use routebook_core::route::{RecordType, Route, RouteData, ServerRoute};
use routebook_core::time;
use serde_json::Value;

use crate::engine::Cell;

/// Number of cells in a route row.
pub const ROW_WIDTH: usize = 9;

/// Query-facility column numbers for the route sheet. `Col1` is the synthetic
/// row address; data columns start at `Col2`.
pub const COL_TYPE: u32 = 2;
pub const COL_USER_ID: u32 = 3;
pub const COL_ROUTE_ID: u32 = 4;
pub const COL_UPDATED_AT: u32 = 10;

/// A stored row failed to decode back into a route.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {ROW_WIDTH} cells, found {0}")]
    Width(usize),

    #[error("column {0}: expected a text cell")]
    ExpectedText(&'static str),

    #[error("column {0}: expected a numeric cell")]
    ExpectedNumber(&'static str),

    #[error("unknown record type {0:?}")]
    RecordType(String),

    #[error("data column is not a JSON object: {0}")]
    Data(String),

    #[error("updatedAt {0} is not a valid epoch-millisecond value")]
    Timestamp(f64),
}

/// Encode a route into its storage row, stamped with `updated_at_millis`.
pub fn encode_row(route: &Route, updated_at_millis: i64) -> Vec<Cell> {
    vec![
        Cell::Text(route.kind.as_str().to_string()),
        Cell::Text(route.user_id.clone()),
        Cell::Text(route.route_id.clone()),
        Cell::Text(route.route_name.clone()),
        Cell::Text(route.description.clone()),
        Cell::Text(route.note.clone()),
        Cell::Text(Value::Object(route.data.clone()).to_string()),
        Cell::Text(route.coordinates.clone()),
        Cell::Number(updated_at_millis as f64),
    ]
}

/// Decode a storage row back into a server route.
///
/// Strict: the row must have exactly [`ROW_WIDTH`] cells of the expected
/// types, the `type` cell must be the route discriminator, and the data cell
/// must hold a JSON object. One bad row fails the whole read; there is no
/// per-row recovery.
pub fn decode_row(cells: &[Cell]) -> Result<ServerRoute, DecodeError> {
    if cells.len() != ROW_WIDTH {
        return Err(DecodeError::Width(cells.len()));
    }

    let kind = match text(cells, 0, "type")? {
        "route" => RecordType::Route,
        other => return Err(DecodeError::RecordType(other.to_string())),
    };
    let data = parse_data(text(cells, 6, "data")?)?;
    let updated_at = decode_timestamp(number(cells, 8, "updatedAt")?)?;

    Ok(ServerRoute {
        route: Route {
            kind,
            user_id: text(cells, 1, "userId")?.to_string(),
            route_id: text(cells, 2, "routeId")?.to_string(),
            route_name: text(cells, 3, "routeName")?.to_string(),
            description: text(cells, 4, "description")?.to_string(),
            note: text(cells, 5, "note")?.to_string(),
            data,
            coordinates: text(cells, 7, "coordinates")?.to_string(),
        },
        updated_at,
    })
}

fn text<'a>(cells: &'a [Cell], index: usize, column: &'static str) -> Result<&'a str, DecodeError> {
    cells[index]
        .as_text()
        .ok_or(DecodeError::ExpectedText(column))
}

fn number(cells: &[Cell], index: usize, column: &'static str) -> Result<f64, DecodeError> {
    cells[index]
        .as_number()
        .ok_or(DecodeError::ExpectedNumber(column))
}

fn parse_data(raw: &str) -> Result<RouteData, DecodeError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DecodeError::Data(format!("expected an object, got {other}"))),
        Err(err) => Err(DecodeError::Data(err.to_string())),
    }
}

fn decode_timestamp(millis: f64) -> Result<DateTime<Utc>, DecodeError> {
    if !millis.is_finite() {
        return Err(DecodeError::Timestamp(millis));
    }
    time::from_millis(millis.trunc() as i64).ok_or(DecodeError::Timestamp(millis))
}
