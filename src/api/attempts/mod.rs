mod handlers;

use axum::{routing::get, routing::post, routing::put, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_attempt).get(handlers::list_attempts))
        .route("/:attempt_id", get(handlers::get_attempt))
        .route("/:attempt_id/restore", post(handlers::restore_attempt))
        .route("/:attempt_id/pause", post(handlers::pause_attempt))
        .route("/:attempt_id/resume", post(handlers::resume_attempt))
        .route("/:attempt_id/complete", post(handlers::complete_attempt))
        .route("/:attempt_id/abandon", post(handlers::abandon_attempt))
        .route("/:attempt_id/sections/:section/select", post(handlers::select_section))
        .route("/:attempt_id/sections/:section/submit", post(handlers::submit_section))
        .route("/:attempt_id/sections/:section/answers", put(handlers::upsert_answer))
        .route(
            "/:attempt_id/sections/:section/parts/:part/select",
            post(handlers::select_part),
        )
        .route("/:attempt_id/sections/:section/parts/:part/text", put(handlers::upsert_free_text))
}

#[cfg(test)]
mod tests;
