use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routebook_api::config::ServerConfig;
use routebook_api::lock::RequestLock;
use routebook_api::router::build_app_router;
use routebook_api::state::AppState;
use routebook_store::engine::RowEngine;
use routebook_store::store::RouteStore;
use routebook_store::workbook::Workbook;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "routebook_api=debug,routebook_store=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    // --- Workbook ---
    let workbook = match &config.workbook_path {
        Some(path) if config.workbook_create && !path.exists() => {
            tracing::info!(path = %path.display(), "Creating workbook file");
            Workbook::create(path)
        }
        Some(path) => {
            let workbook = Workbook::open(path).expect("Failed to open workbook file");
            tracing::info!(path = %path.display(), "Opened workbook file");
            workbook
        }
        None => {
            tracing::warn!("WORKBOOK_PATH not set; routes are held in memory only");
            Workbook::in_memory()
        }
    };

    // --- Store and state ---
    let engine: Arc<dyn RowEngine> = Arc::new(workbook);
    let store = Arc::new(RouteStore::new(engine, config.routes_sheet.clone()));

    let state = AppState {
        store,
        config: Arc::new(config.clone()),
        lock: RequestLock::new(),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST"), config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolve when SIGINT (Ctrl-C) or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
