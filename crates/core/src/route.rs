//! Route record types.
//!
//! A route is a named geographic path: an opaque encoded polyline plus display
//! metadata and an open `data` map for client-side extensions. Clients submit
//! a [`Route`]; the store hands back [`ServerRoute`]s carrying the
//! server-assigned `updatedAt` write timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record discriminator stored in the first cell of every row.
///
/// A single-variant enum rather than a free string, so codec and dispatcher
/// matches are checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "route")]
    Route,
}

impl RecordType {
    /// The cell text this discriminator is stored as.
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordType::Route => "route",
        }
    }
}

/// Open metadata map carried on every route (the `data` wire field).
pub type RouteData = serde_json::Map<String, Value>;

/// A client-supplied route record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub user_id: String,
    pub route_id: String,
    pub route_name: String,
    pub description: String,
    pub note: String,
    pub data: RouteData,
    /// Encoded polyline; opaque to the store (format owned by the client).
    pub coordinates: String,
}

/// A route as returned by the store, with the server-assigned write
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRoute {
    #[serde(flatten)]
    pub route: Route,
    #[serde(with = "crate::time::iso8601_millis")]
    pub updated_at: DateTime<Utc>,
}
