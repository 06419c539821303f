use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::services::{HintProvider, HintRequest};

const HINT_SYSTEM_PROMPT: &str = r#"Sie sind Deutschlehrer:in und erklären Lernenden auf B2-Niveau,
warum eine Antwort in einer Übungsaufgabe falsch war.

Regeln:
- Kurz und freundlich, höchstens vier Sätze
- Erst erklären, warum die gewählte Antwort nicht passt, dann die richtige begründen
- Keine neuen Aufgaben stellen, keine Bewertung der Person

Antwortformat (striktes JSON):
{"hint": "Erklärung auf Deutsch"}
"#;

#[derive(Debug, Clone)]
pub(crate) struct HintService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

impl HintService {
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
            temperature: settings.ai().ai_temperature,
        })
    }
}

#[async_trait]
impl HintProvider for HintService {
    async fn explain(&self, request: HintRequest) -> Result<String> {
        let context = request.context.unwrap_or_default();
        let user_prompt = format!(
            "Frage:\n{}\n\nKontext:\n{context}\n\nGewählte Antwort: {}\nRichtige Antwort: {}\n\nErklären Sie den Fehler und antworten Sie ausschließlich im beschriebenen JSON-Format.",
            request.prompt, request.user_answer, request.correct_answer
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": HINT_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": 600,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        // Hints are advisory; one shot, no retries.
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call OpenAI API")?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            anyhow::bail!("OpenAI API error: {body}");
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing OpenAI response content")?;

        let parsed: Value = serde_json::from_str(content).context("Failed to parse hint JSON")?;
        let hint = parsed
            .get("hint")
            .and_then(|value| value.as_str())
            .context("Missing hint field in response")?;

        Ok(hint.to_string())
    }
}
