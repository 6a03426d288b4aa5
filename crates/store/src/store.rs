//! The route store: CRUD over route rows with incremental-sync reads.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use routebook_core::route::{RecordType, Route, ServerRoute};
use routebook_core::time;

use crate::engine::{EngineError, RowAddress, RowEngine};
use crate::query::QueryBuilder;
use crate::row::{self, DecodeError, COL_ROUTE_ID, COL_TYPE, COL_UPDATED_AT, COL_USER_ID};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("row decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// CRUD operations over route rows in one sheet.
///
/// Updates are physical delete-then-append: `set_route` first removes every
/// row with the same route id, then appends a freshly stamped row. The two
/// engine calls are not atomic; a reader between them can observe the record
/// as transiently absent. That window is inherited from the design this store
/// reproduces and is left as-is.
pub struct RouteStore {
    engine: Arc<dyn RowEngine>,
    sheet: String,
    last_stamp: Mutex<i64>,
}

impl RouteStore {
    pub fn new(engine: Arc<dyn RowEngine>, sheet: impl Into<String>) -> Self {
        Self {
            engine,
            sheet: sheet.into(),
            last_stamp: Mutex::new(0),
        }
    }

    /// The engine this store reads and writes through.
    pub fn engine(&self) -> &Arc<dyn RowEngine> {
        &self.engine
    }

    /// The sheet holding route rows.
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// All live routes for `user_id` with `updatedAt` strictly after `since`
    /// (the epoch when absent), ascending by `updatedAt`.
    pub fn get_routes(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ServerRoute>, StoreError> {
        let since_millis = since.map_or(0, |s| s.timestamp_millis());
        let query = QueryBuilder::new()
            .eq_text(COL_TYPE, RecordType::Route.as_str())
            .eq_text(COL_USER_ID, user_id)
            .gt_number(COL_UPDATED_AT, since_millis)
            .order_by(COL_UPDATED_AT)
            .build();

        let hits = self.engine.evaluate_query(&self.sheet, &query)?;
        let mut routes = Vec::with_capacity(hits.len());
        for hit in &hits {
            routes.push(row::decode_row(&hit.cells)?);
        }
        tracing::debug!(user_id, count = routes.len(), "fetched routes");
        Ok(routes)
    }

    /// Insert or replace the route with `route.route_id`.
    ///
    /// Replacement matches on `(type, routeId)` only: route ids are globally
    /// unique among live rows, whoever owns them. Returns the assigned
    /// `updatedAt`.
    pub fn set_route(&self, route: &Route) -> Result<DateTime<Utc>, StoreError> {
        let replaced = self.delete_matching(
            QueryBuilder::new()
                .eq_text(COL_TYPE, RecordType::Route.as_str())
                .eq_text(COL_ROUTE_ID, &route.route_id)
                .build(),
        )?;

        let (millis, stamp) = self.next_stamp();
        self.engine
            .append_row(&self.sheet, &row::encode_row(route, millis))?;
        tracing::info!(
            route_id = %route.route_id,
            user_id = %route.user_id,
            replaced,
            "route stored"
        );
        Ok(stamp)
    }

    /// Delete the route with `route_id`, if present.
    ///
    /// Idempotent: reports a fresh timestamp whether or not a row matched.
    pub fn delete_route(&self, route_id: &str) -> Result<DateTime<Utc>, StoreError> {
        let removed = self.delete_matching(
            QueryBuilder::new()
                .eq_text(COL_TYPE, RecordType::Route.as_str())
                .eq_text(COL_ROUTE_ID, route_id)
                .build(),
        )?;
        tracing::info!(route_id, removed, "route deleted");
        Ok(self.next_stamp().1)
    }

    /// Delete every route owned by `user_id`. Idempotent.
    pub fn clear_routes(&self, user_id: &str) -> Result<DateTime<Utc>, StoreError> {
        let removed = self.delete_matching(
            QueryBuilder::new()
                .eq_text(COL_TYPE, RecordType::Route.as_str())
                .eq_text(COL_USER_ID, user_id)
                .build(),
        )?;
        tracing::info!(user_id, removed, "routes cleared");
        Ok(self.next_stamp().1)
    }

    /// Delete every row matching `query`, later addresses first so earlier
    /// removals cannot shift rows still scheduled for deletion.
    fn delete_matching(&self, query: String) -> Result<usize, StoreError> {
        let hits = self.engine.evaluate_query(&self.sheet, &query)?;
        let mut addresses: Vec<RowAddress> = hits.iter().map(|h| h.address).collect();
        addresses.sort_unstable_by(|a, b| b.cmp(a));
        self.engine.delete_rows(&self.sheet, &addresses)?;
        Ok(addresses.len())
    }

    /// Next write timestamp: wall clock, bumped by one millisecond whenever
    /// the clock has not advanced past the previous stamp. Keeps `updatedAt`
    /// strictly increasing across writes through this store.
    fn next_stamp(&self) -> (i64, DateTime<Utc>) {
        let mut last = self
            .last_stamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().timestamp_millis();
        let millis = if now > *last { now } else { *last + 1 };
        *last = millis;
        // A millisecond value at or near the wall clock is always in range.
        let stamp = time::from_millis(millis).unwrap_or(DateTime::UNIX_EPOCH);
        (millis, stamp)
    }
}
