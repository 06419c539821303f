use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::core::time::primitive_now_utc;
use crate::db::types::{AttemptStatus, ExamMode, SectionId};
use crate::exam::catalog;
use crate::exam::content::SectionContent;

/// One user's run through the exam, from start to completed or abandoned.
/// This is the single authoritative in-memory record; everything else
/// (timer, persistence, scoring) works against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) mode: ExamMode,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) current_section: Option<SectionId>,
    pub(crate) current_part: u32,
    pub(crate) answers: HashMap<SectionId, HashMap<String, String>>,
    pub(crate) free_text_answers: HashMap<String, String>,
    pub(crate) section_content: HashMap<SectionId, SectionContent>,
    pub(crate) results: HashMap<SectionId, SectionResult>,
    /// Active seconds accumulated per section; feeds the countdown restore
    /// math after a reload.
    pub(crate) section_time_seconds: HashMap<SectionId, u32>,
    pub(crate) time_spent_seconds: u32,
    pub(crate) is_paused: bool,
    pub(crate) total_score: Option<f64>,
}

/// Result for a submitted section. Written once; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SectionResult {
    pub(crate) earned_points: f64,
    pub(crate) max_points: f64,
    pub(crate) grade: String,
    #[serde(default)]
    pub(crate) per_question: HashMap<String, QuestionOutcome>,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuestionOutcome {
    pub(crate) answer: Option<String>,
    pub(crate) correct: bool,
}

impl ExamAttempt {
    pub(crate) fn new(id: String, user_id: String, mode: ExamMode) -> Self {
        Self {
            id,
            user_id,
            mode,
            status: AttemptStatus::InProgress,
            started_at: primitive_now_utc(),
            completed_at: None,
            current_section: None,
            current_part: 0,
            answers: HashMap::new(),
            free_text_answers: HashMap::new(),
            section_content: HashMap::new(),
            results: HashMap::new(),
            section_time_seconds: HashMap::new(),
            time_spent_seconds: 0,
            is_paused: false,
            total_score: None,
        }
    }

    /// Composite key for free-text answers of writing/speaking parts.
    pub(crate) fn free_text_key(section: SectionId, part: u32) -> String {
        format!("{}:{}", section.as_str(), part)
    }

    pub(crate) fn is_in_progress(&self) -> bool {
        self.status == AttemptStatus::InProgress
    }

    pub(crate) fn section_submitted(&self, section: SectionId) -> bool {
        self.results.contains_key(&section)
    }

    pub(crate) fn elapsed_in(&self, section: SectionId) -> u32 {
        self.section_time_seconds.get(&section).copied().unwrap_or(0)
    }

    pub(crate) fn record_answer(&mut self, section: SectionId, question_id: String, value: String) {
        self.answers.entry(section).or_default().insert(question_id, value);
    }

    pub(crate) fn record_free_text(&mut self, section: SectionId, part: u32, text: String) {
        self.free_text_answers.insert(Self::free_text_key(section, part), text);
    }

    /// Concatenated free text for a section, in part order.
    pub(crate) fn free_text_for(&self, section: SectionId) -> String {
        let mut pieces = Vec::new();
        for part in catalog::spec(section).parts {
            let key = Self::free_text_key(section, part.number);
            if let Some(text) = self.free_text_answers.get(&key) {
                pieces.push(text.as_str());
            }
        }
        pieces.join("\n\n")
    }

    pub(crate) fn missing_sections(&self) -> Vec<SectionId> {
        SectionId::all()
            .into_iter()
            .filter(|section| !self.results.contains_key(section))
            .collect()
    }

    pub(crate) fn total_earned(&self) -> f64 {
        self.results.values().map(|result| result.earned_points).sum()
    }
}
