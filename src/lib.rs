pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod exam;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod session;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::extract::Request;
use axum::ServiceExt;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::repositories::PgAttemptStore;
use crate::services::Collaborators;
use crate::session::{runtime, SessionController};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let store = Arc::new(PgAttemptStore::new(db_pool.clone()));
    let collaborators = Collaborators::from_settings(&settings)?;
    let sessions = SessionController::new(store, collaborators, &settings);

    let state = AppState::new(settings, db_pool, sessions.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let background = runtime::spawn(
        sessions,
        state.settings().exam().auto_save_interval_seconds,
        shutdown_rx,
    );

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "FluentPass Rust API listening"
    );

    let result = axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(core::shutdown::shutdown_signal())
        .await;

    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown to session runtime");
    }
    for handle in background {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Session runtime task join failed");
        }
    }

    result?;

    Ok(())
}
