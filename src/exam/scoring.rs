//! Scoring aggregation: local answer-key comparison for objective sections,
//! verbatim storage of the external evaluator's verdict for subjective ones,
//! and the display grade bands over the fixed 300-point total.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::exam::attempt::QuestionOutcome;
use crate::exam::content::SectionContent;

/// Scaled points returned by the objective scoring collaborator, which owns
/// the official TELC point curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ScaledScore {
    pub(crate) earned_points: f64,
    pub(crate) max_points: f64,
    pub(crate) grade: String,
}

/// Verdict of the subjective evaluation collaborator for writing/speaking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EvaluatedScore {
    pub(crate) earned_points: f64,
    pub(crate) max_points: f64,
    pub(crate) feedback: String,
}

pub(crate) struct AnswerComparison {
    pub(crate) total_questions: usize,
    pub(crate) correct_count: usize,
    pub(crate) per_question: HashMap<String, QuestionOutcome>,
}

pub(crate) const PASS_MARK_POINTS: f64 = 180.0;

/// Compare recorded answers against the answer key, by value. Unanswered
/// questions count as wrong, never as rejected.
pub(crate) fn compare_answers(
    content: &SectionContent,
    answers: &HashMap<String, String>,
) -> AnswerComparison {
    let mut per_question = HashMap::new();
    let mut correct_count = 0;
    let mut total_questions = 0;

    for question in content.questions() {
        total_questions += 1;
        let answer = answers.get(&question.id).cloned();
        let correct = answer.as_deref() == Some(question.correct_answer.as_str());
        if correct {
            correct_count += 1;
        }
        per_question.insert(question.id.clone(), QuestionOutcome { answer, correct });
    }

    AnswerComparison { total_questions, correct_count, per_question }
}

/// Display-only grade band over earned/max. Referenced pass mark elsewhere in
/// the product is 180/300.
pub(crate) fn grade_band(earned_points: f64, max_points: f64) -> &'static str {
    if max_points <= 0.0 {
        return "Nicht bestanden";
    }

    let percent = earned_points / max_points * 100.0;
    if percent >= 90.0 {
        "Sehr gut"
    } else if percent >= 75.0 {
        "Gut"
    } else if percent >= 60.0 {
        "Befriedigend"
    } else if percent >= 45.0 {
        "Ausreichend"
    } else {
        "Nicht bestanden"
    }
}

pub(crate) fn is_passing(earned_points: f64) -> bool {
    earned_points >= PASS_MARK_POINTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::SectionId;
    use crate::exam::content::{GeneratedPart, Question};

    fn content_with_key(key: &[(&str, &str)]) -> SectionContent {
        SectionContent {
            section: SectionId::Listening,
            parts: vec![GeneratedPart {
                number: 0,
                title: None,
                passage: None,
                questions: key
                    .iter()
                    .map(|(id, correct)| Question {
                        id: id.to_string(),
                        prompt: format!("Frage {id}"),
                        options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                        correct_answer: correct.to_string(),
                    })
                    .collect(),
                task: None,
            }],
        }
    }

    #[test]
    fn comparison_counts_by_value_not_index() {
        let content =
            content_with_key(&[("q1", "b"), ("q2", "a"), ("q3", "c"), ("q4", "a"), ("q5", "b")]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), "b".to_string());
        answers.insert("q2".to_string(), "a".to_string());
        answers.insert("q3".to_string(), "c".to_string());
        answers.insert("q4".to_string(), "b".to_string());
        answers.insert("q5".to_string(), "a".to_string());

        let comparison = compare_answers(&content, &answers);
        assert_eq!(comparison.total_questions, 5);
        assert_eq!(comparison.correct_count, 3);
        assert!(comparison.per_question["q1"].correct);
        assert!(!comparison.per_question["q4"].correct);
    }

    #[test]
    fn unanswered_questions_score_as_wrong() {
        let content = content_with_key(&[("q1", "a"), ("q2", "b")]);
        let comparison = compare_answers(&content, &HashMap::new());

        assert_eq!(comparison.total_questions, 2);
        assert_eq!(comparison.correct_count, 0);
        assert!(comparison.per_question.values().all(|outcome| !outcome.correct));
        assert!(comparison.per_question.values().all(|outcome| outcome.answer.is_none()));
    }

    #[test]
    fn grade_bands_over_total() {
        assert_eq!(grade_band(300.0, 300.0), "Sehr gut");
        assert_eq!(grade_band(270.0, 300.0), "Sehr gut");
        assert_eq!(grade_band(225.0, 300.0), "Gut");
        assert_eq!(grade_band(200.0, 300.0), "Befriedigend");
        assert_eq!(grade_band(180.0, 300.0), "Befriedigend");
        assert_eq!(grade_band(135.0, 300.0), "Ausreichend");
        assert_eq!(grade_band(134.0, 300.0), "Nicht bestanden");
        assert_eq!(grade_band(0.0, 300.0), "Nicht bestanden");
    }

    #[test]
    fn pass_mark_is_sixty_percent() {
        assert!(is_passing(180.0));
        assert!(!is_passing(179.5));
    }
}
