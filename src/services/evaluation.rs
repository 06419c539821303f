use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::db::types::SectionId;
use crate::exam::catalog;
use crate::exam::scoring::EvaluatedScore;
use crate::services::SubjectiveEvaluator;

const EVALUATION_SYSTEM_PROMPT: &str = r#"Sie sind Prüfer:in für TELC B2 Deutschprüfungen.
Ihre Aufgabe ist es, eine freie Textantwort (Schriftlicher oder Mündlicher Ausdruck) zu bewerten.

Bewertungskriterien:
1. Aufgabenbewältigung und inhaltliche Angemessenheit
2. Kommunikative Gestaltung und Textaufbau
3. Korrektheit (Grammatik, Orthographie)
4. Wortschatzspektrum auf B2-Niveau

Regeln:
- Die vergebene Punktzahl liegt zwischen 0 und der genannten Maximalpunktzahl
- Eine leere oder themenfremde Antwort erhält 0 Punkte
- Das Feedback ist konstruktiv, auf Deutsch und nennt konkrete Beispiele

Antwortformat (striktes JSON):
{
  "earned_points": <Zahl>,
  "max_points": <Zahl>,
  "feedback": "Ausführliches Feedback für die Lernenden"
}
"#;

#[derive(Debug, Clone)]
pub(crate) struct EvaluationService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl EvaluationService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
            temperature: settings.ai().ai_temperature,
        })
    }
}

#[async_trait]
impl SubjectiveEvaluator for EvaluationService {
    async fn evaluate(
        &self,
        section: SectionId,
        task: &str,
        answer: &str,
    ) -> Result<EvaluatedScore> {
        let timer = Instant::now();
        let spec = catalog::spec(section);
        let user_prompt = format!(
            "Prüfungsteil: {} ({}). Maximalpunktzahl: {}.\n\nAufgabenstellung:\n{task}\n\nAntwort der Lernenden:\n{answer}\n\nBewerten Sie die Antwort und antworten Sie ausschließlich im beschriebenen JSON-Format.",
            spec.title,
            section.as_str(),
            spec.max_points
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": EVALUATION_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        tracing::info!(section = section.as_str(), "Sending evaluation request");

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=3 {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("OpenAI API error: {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call OpenAI API"));
                }
            }

            if attempt < 3 {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt as u32))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing OpenAI response content")?;

        let mut verdict: EvaluatedScore =
            serde_json::from_str(content).context("Failed to parse evaluation JSON")?;
        verdict.max_points = spec.max_points;
        verdict.earned_points = verdict.earned_points.clamp(0.0, spec.max_points);

        tracing::info!(
            section = section.as_str(),
            earned_points = verdict.earned_points,
            duration_seconds = timer.elapsed().as_secs_f64(),
            "Evaluation completed"
        );

        Ok(verdict)
    }
}
