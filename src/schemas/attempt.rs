use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::types::{AttemptStatus, ExamMode, SectionId};
use crate::exam::attempt::SectionResult;
use crate::exam::catalog;
use crate::exam::content::SectionContent;
use crate::exam::scoring::is_passing;
use crate::exam::timer;
use crate::repositories::AttemptSummary;
use crate::session::SessionSnapshot;

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptCreate {
    pub(crate) mode: ExamMode,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerUpsert {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[validate(length(min = 1, message = "value must not be empty"))]
    pub(crate) value: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FreeTextUpsert {
    #[validate(length(max = 20000, message = "text is too long"))]
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptStateResponse {
    pub(crate) id: String,
    pub(crate) mode: ExamMode,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) current_section: Option<SectionId>,
    pub(crate) current_part: u32,
    pub(crate) time_spent_seconds: u32,
    pub(crate) is_paused: bool,
    pub(crate) total_score: Option<f64>,
    pub(crate) total_max_points: f64,
    pub(crate) passed: Option<bool>,
    pub(crate) sections: Vec<SectionStateResponse>,
    pub(crate) hints: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SectionStateResponse {
    pub(crate) id: SectionId,
    pub(crate) title: &'static str,
    pub(crate) duration_seconds: u32,
    pub(crate) max_points: f64,
    pub(crate) remaining_seconds: u32,
    pub(crate) submitted: bool,
    pub(crate) answers: HashMap<String, String>,
    pub(crate) free_texts: HashMap<u32, String>,
    pub(crate) content: Option<SectionContentResponse>,
    pub(crate) result: Option<SectionResultResponse>,
}

/// Client-facing content. Deliberately drops `correct_answer`; the key never
/// leaves the server before submission.
#[derive(Debug, Serialize)]
pub(crate) struct SectionContentResponse {
    pub(crate) parts: Vec<PartResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PartResponse {
    pub(crate) number: u32,
    pub(crate) title: Option<String>,
    pub(crate) passage: Option<String>,
    pub(crate) questions: Vec<QuestionResponse>,
    pub(crate) task: Option<TaskResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) prompt: String,
    pub(crate) options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskResponse {
    pub(crate) description: String,
    pub(crate) expected_words: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SectionResultResponse {
    pub(crate) earned_points: f64,
    pub(crate) max_points: f64,
    pub(crate) grade: String,
    pub(crate) feedback: Option<String>,
    pub(crate) per_question: HashMap<String, QuestionOutcomeResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionOutcomeResponse {
    pub(crate) answer: Option<String>,
    pub(crate) correct: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummaryResponse {
    pub(crate) id: String,
    pub(crate) mode: ExamMode,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) time_spent_seconds: u32,
    pub(crate) total_score: Option<f64>,
}

impl AttemptStateResponse {
    pub(crate) fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let attempt = &snapshot.attempt;
        let sections = catalog::sections()
            .iter()
            .map(|spec| {
                let section = spec.id;
                SectionStateResponse {
                    id: section,
                    title: spec.title,
                    duration_seconds: spec.duration_seconds,
                    max_points: spec.max_points,
                    remaining_seconds: timer::remaining_seconds(attempt, section),
                    submitted: attempt.section_submitted(section),
                    answers: attempt.answers.get(&section).cloned().unwrap_or_default(),
                    free_texts: free_texts_for(attempt, section),
                    content: attempt.section_content.get(&section).map(content_response),
                    result: attempt.results.get(&section).map(result_response),
                }
            })
            .collect();

        Self {
            id: attempt.id.clone(),
            mode: attempt.mode,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            completed_at: attempt.completed_at.map(format_primitive),
            current_section: attempt.current_section,
            current_part: attempt.current_part,
            time_spent_seconds: attempt.time_spent_seconds,
            is_paused: attempt.is_paused,
            total_score: attempt.total_score,
            total_max_points: catalog::TOTAL_MAX_POINTS,
            passed: attempt.total_score.map(is_passing),
            sections,
            hints: snapshot.hints.clone(),
        }
    }
}

impl AttemptSummaryResponse {
    pub(crate) fn from_summary(summary: &AttemptSummary) -> Self {
        Self {
            id: summary.id.clone(),
            mode: summary.mode,
            status: summary.status,
            started_at: format_primitive(summary.started_at),
            completed_at: summary.completed_at.map(format_primitive),
            time_spent_seconds: summary.time_spent_seconds,
            total_score: summary.total_score,
        }
    }
}

pub(crate) fn result_response(result: &SectionResult) -> SectionResultResponse {
    SectionResultResponse {
        earned_points: result.earned_points,
        max_points: result.max_points,
        grade: result.grade.clone(),
        feedback: result.feedback.clone(),
        per_question: result
            .per_question
            .iter()
            .map(|(id, outcome)| {
                (
                    id.clone(),
                    QuestionOutcomeResponse {
                        answer: outcome.answer.clone(),
                        correct: outcome.correct,
                    },
                )
            })
            .collect(),
    }
}

fn content_response(content: &SectionContent) -> SectionContentResponse {
    SectionContentResponse {
        parts: content
            .parts
            .iter()
            .map(|part| PartResponse {
                number: part.number,
                title: part.title.clone(),
                passage: part.passage.clone(),
                questions: part
                    .questions
                    .iter()
                    .map(|question| QuestionResponse {
                        id: question.id.clone(),
                        prompt: question.prompt.clone(),
                        options: question.options.clone(),
                    })
                    .collect(),
                task: part.task.as_ref().map(|task| TaskResponse {
                    description: task.description.clone(),
                    expected_words: task.expected_words,
                }),
            })
            .collect(),
    }
}

fn free_texts_for(
    attempt: &crate::exam::attempt::ExamAttempt,
    section: SectionId,
) -> HashMap<u32, String> {
    catalog::spec(section)
        .parts
        .iter()
        .filter_map(|part| {
            let key = crate::exam::attempt::ExamAttempt::free_text_key(section, part.number);
            attempt.free_text_answers.get(&key).map(|text| (part.number, text.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::attempt::ExamAttempt;
    use crate::session::SessionSnapshot;
    use crate::test_support::stub_content;

    #[test]
    fn state_response_never_exposes_answer_keys() {
        let mut attempt =
            ExamAttempt::new("a-1".to_string(), "u-1".to_string(), ExamMode::Practice);
        attempt.section_content.insert(SectionId::Reading, stub_content(SectionId::Reading));
        let snapshot = SessionSnapshot { attempt, hints: HashMap::new() };

        let response = AttemptStateResponse::from_snapshot(&snapshot);
        let json = serde_json::to_string(&response).expect("json");
        assert!(!json.contains("correct_answer"));
        assert!(json.contains("\"prompt\""));
    }

    #[test]
    fn state_response_reports_full_budgets_for_untouched_sections() {
        let attempt = ExamAttempt::new("a-1".to_string(), "u-1".to_string(), ExamMode::Mock);
        let snapshot = SessionSnapshot { attempt, hints: HashMap::new() };

        let response = AttemptStateResponse::from_snapshot(&snapshot);
        assert_eq!(response.sections.len(), 5);
        let reading =
            response.sections.iter().find(|s| s.id == SectionId::Reading).expect("reading");
        assert_eq!(reading.remaining_seconds, 5400);
        assert!(!reading.submitted);
        assert!(reading.content.is_none());
    }
}
