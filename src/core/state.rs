use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::session::SessionController;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    sessions: SessionController,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, sessions: SessionController) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, sessions }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn sessions(&self) -> &SessionController {
        &self.inner.sessions
    }
}
