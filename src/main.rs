use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use rollcall::config::Config;
use rollcall::directory::Directory;
use rollcall::http::{self, AppState};
use rollcall::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load()?;

    let directory = match &config.directory_file {
        Some(path) => Directory::from_file(path)?,
        None => Directory::builtin(),
    };

    let store = Store::open(&config.store.path)?;
    if let Some(csv) = &config.roster_csv {
        let n = store.import_roster_csv(csv)?;
        info!("imported {} roster entries from {}", n, csv.to_string_lossy());
    }

    let state = AppState {
        store: Arc::new(store),
        directory: Arc::new(directory),
        session_secret: Arc::from(config.session_secret.as_str()),
    };
    let app = http::router(state);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
