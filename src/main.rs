use std::path::PathBuf;

mod api;
mod classes;
mod models;
mod parser;
mod store;

const PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "./siegelog-data";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    let store = match store::LogStore::new(&data_dir) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to open data directory {}: {}", data_dir.display(), e);
            return;
        }
    };
    let roster = classes::ClassRoster::load(store.data_dir());
    if !roster.is_empty() {
        tracing::info!(characters = roster.len(), "loaded character roster");
    }

    let app = api::create_router(store, roster);
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{PORT}")).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind port {}: {}", PORT, e);
            return;
        }
    };
    tracing::info!("siegelog listening on http://localhost:{PORT}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .ok();
}

fn resolve_data_dir() -> PathBuf {
    // CLI argument wins, then the environment, then the local default.
    if let Some(arg) = std::env::args().nth(1) {
        return PathBuf::from(arg);
    }
    if let Ok(dir) = std::env::var("SIEGELOG_DATA_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(DEFAULT_DATA_DIR)
}
