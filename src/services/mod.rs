pub(crate) mod content;
pub(crate) mod evaluation;
pub(crate) mod hints;
pub(crate) mod scoring;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::config::Settings;
use crate::db::types::SectionId;
use crate::exam::content::SectionContent;
use crate::exam::scoring::{EvaluatedScore, ScaledScore};

/// Generates section content (passages, questions, tasks). Idempotent per
/// call; caching is the session controller's job.
#[async_trait]
pub(crate) trait ContentGenerator: Send + Sync {
    async fn generate(&self, section: SectionId, difficulty: &str) -> Result<SectionContent>;
}

/// Owns the official point curve for objective sections. Pure function of
/// its inputs from our perspective.
#[async_trait]
pub(crate) trait ObjectiveScorer: Send + Sync {
    async fn scale(
        &self,
        section: SectionId,
        total_questions: usize,
        correct_count: usize,
    ) -> Result<ScaledScore>;
}

/// Evaluates free-text writing/speaking answers.
#[async_trait]
pub(crate) trait SubjectiveEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        section: SectionId,
        task: &str,
        answer: &str,
    ) -> Result<EvaluatedScore>;
}

#[derive(Debug, Clone)]
pub(crate) struct HintRequest {
    pub(crate) prompt: String,
    pub(crate) user_answer: String,
    pub(crate) correct_answer: String,
    pub(crate) context: Option<String>,
}

/// Practice-mode explanations for wrong answers. Purely advisory; never
/// affects scoring.
#[async_trait]
pub(crate) trait HintProvider: Send + Sync {
    async fn explain(&self, request: HintRequest) -> Result<String>;
}

#[derive(Clone)]
pub(crate) struct Collaborators {
    pub(crate) content: Arc<dyn ContentGenerator>,
    pub(crate) scorer: Arc<dyn ObjectiveScorer>,
    pub(crate) evaluator: Arc<dyn SubjectiveEvaluator>,
    pub(crate) hints: Arc<dyn HintProvider>,
}

impl Collaborators {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            content: Arc::new(content::ContentGenerationService::from_settings(settings)?),
            scorer: Arc::new(scoring::ScoringApiService::from_settings(settings)?),
            evaluator: Arc::new(evaluation::EvaluationService::from_settings(settings)?),
            hints: Arc::new(hints::HintService::from_settings(settings)?),
        })
    }
}
