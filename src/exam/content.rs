use serde::{Deserialize, Serialize};

use crate::db::types::SectionId;

/// Generated exam content for one section, cached on the attempt so
/// navigation never regenerates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SectionContent {
    pub(crate) section: SectionId,
    pub(crate) parts: Vec<GeneratedPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeneratedPart {
    pub(crate) number: u32,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) passage: Option<String>,
    #[serde(default)]
    pub(crate) questions: Vec<Question>,
    #[serde(default)]
    pub(crate) task: Option<TaskPrompt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) prompt: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TaskPrompt {
    pub(crate) description: String,
    pub(crate) expected_words: u32,
}

impl SectionContent {
    pub(crate) fn questions(&self) -> impl Iterator<Item = &Question> {
        self.parts.iter().flat_map(|part| part.questions.iter())
    }

    pub(crate) fn question_count(&self) -> usize {
        self.parts.iter().map(|part| part.questions.len()).sum()
    }

    pub(crate) fn find_question(&self, question_id: &str) -> Option<&Question> {
        self.questions().find(|question| question.id == question_id)
    }

    /// Task text handed to the subjective evaluator, one line per part.
    pub(crate) fn task_description(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.task.as_ref())
            .map(|task| task.description.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> SectionContent {
        SectionContent {
            section: SectionId::Reading,
            parts: vec![
                GeneratedPart {
                    number: 0,
                    title: None,
                    passage: Some("Ein kurzer Text.".to_string()),
                    questions: vec![
                        Question {
                            id: "r1".to_string(),
                            prompt: "Worum geht es?".to_string(),
                            options: vec!["a".to_string(), "b".to_string()],
                            correct_answer: "b".to_string(),
                        },
                        Question {
                            id: "r2".to_string(),
                            prompt: "Was stimmt?".to_string(),
                            options: vec!["a".to_string(), "b".to_string()],
                            correct_answer: "a".to_string(),
                        },
                    ],
                    task: None,
                },
                GeneratedPart {
                    number: 1,
                    title: None,
                    passage: None,
                    questions: vec![Question {
                        id: "r3".to_string(),
                        prompt: "Welche Überschrift passt?".to_string(),
                        options: vec![],
                        correct_answer: "c".to_string(),
                    }],
                    task: None,
                },
            ],
        }
    }

    #[test]
    fn question_lookup_spans_parts() {
        let content = content();
        assert_eq!(content.question_count(), 3);
        assert!(content.find_question("r3").is_some());
        assert!(content.find_question("missing").is_none());
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let raw = r#"{
            "section": "writing",
            "parts": [
                {"number": 0, "task": {"description": "Beschwerdebrief", "expected_words": 150}}
            ]
        }"#;
        let parsed: SectionContent = serde_json::from_str(raw).expect("content json");
        assert_eq!(parsed.question_count(), 0);
        assert_eq!(parsed.task_description(), "Beschwerdebrief");
    }
}
