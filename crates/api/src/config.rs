use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long a request waits for the advisory lock before proceeding
    /// without it (default: 2000 ms).
    pub lock_wait: Duration,
    /// Backing workbook file. Unset means routes are held in memory only.
    pub workbook_path: Option<PathBuf>,
    /// Create the workbook file when it does not exist yet. Off by default:
    /// an absent file is an error, so a typo in `WORKBOOK_PATH` cannot
    /// silently start an empty store.
    pub workbook_create: bool,
    /// Sheet holding route rows (default: `routes`).
    pub routes_sheet: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `LOCK_WAIT_MS`         | `2000`                     |
    /// | `WORKBOOK_PATH`        | (unset: in-memory)         |
    /// | `WORKBOOK_CREATE`      | `false`                    |
    /// | `ROUTES_SHEET`         | `routes`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let lock_wait_ms: u64 = std::env::var("LOCK_WAIT_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("LOCK_WAIT_MS must be a valid u64");

        let workbook_path = std::env::var("WORKBOOK_PATH").ok().map(PathBuf::from);

        let workbook_create = std::env::var("WORKBOOK_CREATE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let routes_sheet = std::env::var("ROUTES_SHEET").unwrap_or_else(|_| "routes".into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            lock_wait: Duration::from_millis(lock_wait_ms),
            workbook_path,
            workbook_create,
            routes_sheet,
        }
    }
}
