//! Camera-assisted attendance service: a SQLite-backed HTTP API plus a
//! WebSocket hub, with face recognition delegated to an external process.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

pub mod api;
pub mod config;
pub mod db;
pub mod hub;
pub mod mailer;
pub mod recognizer;
pub mod schedule;
pub mod store;
pub mod timetable;
pub mod xlsx;

use api::AppState;
use config::Config;
use db::Db;
use hub::Hub;
use mailer::Mailer;
use recognizer::ExternalRecognizer;

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = Db::open(&config.db_path(), config.db_pool_size)?;
    std::fs::create_dir_all(config.frames_dir())?;
    std::fs::create_dir_all(config.photos_dir())?;

    let recognizer = ExternalRecognizer::new(
        config.python_bin.clone(),
        config.frame_script.clone(),
        Duration::from_secs(config.frame_timeout_secs),
    );
    let mailer = Mailer::from_config(config.email.as_ref())?;
    if !mailer.is_configured() {
        info!("mailer disabled: email features report not-configured");
    }

    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        db,
        hub: Arc::new(Hub::new()),
        recognizer: Arc::new(recognizer),
        mailer: Arc::new(mailer),
    };
    let app = api::router::build(state);

    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address).await?;
    info!("listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
        info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
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
