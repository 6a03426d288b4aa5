use std::sync::Arc;

use routebook_store::store::RouteStore;

use crate::config::ServerConfig;
use crate::lock::RequestLock;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The route store (and, through it, the storage engine).
    pub store: Arc<RouteStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Process-wide advisory request lock.
    pub lock: RequestLock,
}
