use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, ExamMode, SectionId};
use crate::exam::attempt::SectionResult;
use crate::exam::content::SectionContent;

/// Whole-record snapshot of one exam attempt, overwritten on every save.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct AttemptRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) mode: ExamMode,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) current_section: Option<SectionId>,
    pub(crate) current_part: i32,
    pub(crate) answers: Json<HashMap<SectionId, HashMap<String, String>>>,
    pub(crate) free_text_answers: Json<HashMap<String, String>>,
    pub(crate) section_content: Json<HashMap<SectionId, SectionContent>>,
    pub(crate) results: Json<HashMap<SectionId, SectionResult>>,
    pub(crate) section_time_seconds: Json<HashMap<SectionId, u32>>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) is_paused: bool,
    pub(crate) total_score: Option<f64>,
    pub(crate) updated_at: PrimitiveDateTime,
}
