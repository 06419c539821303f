use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("exam attempt not found")]
    AttemptNotFound,
    #[error("another attempt is already in progress")]
    AttemptConflict,
    #[error("section already submitted")]
    SectionAlreadySubmitted,
    #[error("submission for this section is already running")]
    SubmissionInFlight,
    #[error("attempt finished while the operation was running")]
    StaleOperation,
    #[error("not all sections are scored yet: {0:?}")]
    IncompleteSections(Vec<crate::db::types::SectionId>),
    #[error("invalid attempt state: {0}")]
    InvalidState(&'static str),
    #[error("content generation failed: {0}")]
    GenerationFailed(String),
    #[error("scoring failed: {0}")]
    ScoringFailed(String),
    #[error("attempt storage failed")]
    Storage(#[from] sqlx::Error),
}
