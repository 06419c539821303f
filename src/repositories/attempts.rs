use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::AttemptRow;
use crate::exam::attempt::ExamAttempt;
use crate::repositories::{AttemptStore, AttemptSummary};

const COLUMNS: &str = "\
    id, user_id, mode, status, started_at, completed_at, current_section, \
    current_part, answers, free_text_answers, section_content, results, \
    section_time_seconds, time_spent_seconds, is_paused, total_score, updated_at";

#[derive(Debug, Clone)]
pub(crate) struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn save(&self, attempt: &ExamAttempt) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO exam_attempts (
                id, user_id, mode, status, started_at, completed_at, current_section,
                current_part, answers, free_text_answers, section_content, results,
                section_time_seconds, time_spent_seconds, is_paused, total_score, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                completed_at = EXCLUDED.completed_at,
                current_section = EXCLUDED.current_section,
                current_part = EXCLUDED.current_part,
                answers = EXCLUDED.answers,
                free_text_answers = EXCLUDED.free_text_answers,
                section_content = EXCLUDED.section_content,
                results = EXCLUDED.results,
                section_time_seconds = EXCLUDED.section_time_seconds,
                time_spent_seconds = EXCLUDED.time_spent_seconds,
                is_paused = EXCLUDED.is_paused,
                total_score = EXCLUDED.total_score,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&attempt.id)
        .bind(&attempt.user_id)
        .bind(attempt.mode)
        .bind(attempt.status)
        .bind(attempt.started_at)
        .bind(attempt.completed_at)
        .bind(attempt.current_section)
        .bind(attempt.current_part as i32)
        .bind(Json(&attempt.answers))
        .bind(Json(&attempt.free_text_answers))
        .bind(Json(&attempt.section_content))
        .bind(Json(&attempt.results))
        .bind(Json(&attempt.section_time_seconds))
        .bind(attempt.time_spent_seconds as i32)
        .bind(attempt.is_paused)
        .bind(attempt.total_score)
        .bind(primitive_now_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Option<ExamAttempt>, sqlx::Error> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {COLUMNS} FROM exam_attempts WHERE id = $1 AND user_id = $2"
        ))
        .bind(attempt_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(attempt_from_row))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AttemptSummary>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {COLUMNS} FROM exam_attempts WHERE user_id = $1 ORDER BY started_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AttemptSummary {
                id: row.id,
                mode: row.mode,
                status: row.status,
                started_at: row.started_at,
                completed_at: row.completed_at,
                time_spent_seconds: row.time_spent_seconds.max(0) as u32,
                total_score: row.total_score,
            })
            .collect())
    }
}

fn attempt_from_row(row: AttemptRow) -> ExamAttempt {
    ExamAttempt {
        id: row.id,
        user_id: row.user_id,
        mode: row.mode,
        status: row.status,
        started_at: row.started_at,
        completed_at: row.completed_at,
        current_section: row.current_section,
        current_part: row.current_part.max(0) as u32,
        answers: row.answers.0,
        free_text_answers: row.free_text_answers.0,
        section_content: row.section_content.0,
        results: row.results.0,
        section_time_seconds: row.section_time_seconds.0,
        time_spent_seconds: row.time_spent_seconds.max(0) as u32,
        is_paused: row.is_paused,
        total_score: row.total_score,
    }
}
