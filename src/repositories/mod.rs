pub(crate) mod attempts;

use async_trait::async_trait;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, ExamMode};
use crate::exam::attempt::ExamAttempt;

pub(crate) use attempts::PgAttemptStore;

/// One row of the attempt history listing.
#[derive(Debug, Clone)]
pub(crate) struct AttemptSummary {
    pub(crate) id: String,
    pub(crate) mode: ExamMode,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) time_spent_seconds: u32,
    pub(crate) total_score: Option<f64>,
}

/// Durable storage for exam attempts. Every save is a whole-record snapshot,
/// so replaying the latest row restores the attempt exactly.
#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    async fn save(&self, attempt: &ExamAttempt) -> Result<(), sqlx::Error>;

    /// Loads the attempt only when it belongs to `user_id`.
    async fn load(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Option<ExamAttempt>, sqlx::Error>;

    /// Newest-first history for one user.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AttemptSummary>, sqlx::Error>;
}
