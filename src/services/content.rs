use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::db::types::SectionId;
use crate::exam::catalog::{self, PartKind};
use crate::exam::content::SectionContent;
use crate::services::ContentGenerator;

const CONTENT_SYSTEM_PROMPT: &str = r#"Sie sind Autor:in für TELC B2 Deutschprüfungen.
Ihre Aufgabe ist es, vollständiges Prüfungsmaterial für einen Prüfungsteil zu erstellen.

Regeln:
- Sprachniveau strikt B2 (GER), authentische Alltagstexte und Situationen
- Multiple-Choice-Fragen haben genau eine richtige Antwort
- Antwortoptionen sind die Kleinbuchstaben "a", "b", "c" (und "d", wo vorgesehen)
- Frage-IDs sind kurz und innerhalb des Teils eindeutig

Antwortformat (striktes JSON):
{
  "section": "<section id>",
  "parts": [
    {
      "number": <Teilnummer ab 0>,
      "title": "Titel des Teils",
      "passage": "Lesetext oder Transkript, falls vorhanden",
      "questions": [
        {
          "id": "q1",
          "prompt": "Fragetext",
          "options": ["a", "b", "c"],
          "correct_answer": "b"
        }
      ],
      "task": {"description": "Aufgabenstellung", "expected_words": <Zahl>}
    }
  ]
}
Felder ohne Inhalt weglassen oder leer lassen.
"#;

#[derive(Debug, Clone)]
pub(crate) struct ContentGenerationService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl ContentGenerationService {
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

    fn section_brief(section: SectionId) -> String {
        let spec = catalog::spec(section);
        let mut lines = vec![format!(
            "Prüfungsteil: {} ({}), {} Teile, {} Punkte insgesamt.",
            spec.title,
            section.as_str(),
            spec.parts.len(),
            spec.max_points
        )];
        for part in spec.parts {
            match part.kind {
                PartKind::Questions { count } => lines.push(format!(
                    "Teil {}: {count} Multiple-Choice-Fragen mit Text- bzw. Hörgrundlage.",
                    part.number
                )),
                PartKind::Task { expected_words } => lines.push(format!(
                    "Teil {}: eine offene Aufgabe, erwarteter Umfang ca. {expected_words} Wörter.",
                    part.number
                )),
            }
        }
        lines.join("\n")
    }
}

#[async_trait]
impl ContentGenerator for ContentGenerationService {
    async fn generate(&self, section: SectionId, difficulty: &str) -> Result<SectionContent> {
        let timer = Instant::now();
        let user_prompt = format!(
            "Erstellen Sie Prüfungsmaterial für die folgende Vorgabe.\n\n{}\n\nSchwierigkeitsprofil: {difficulty}.\nVerwenden Sie als \"section\" exakt \"{}\".\nAntworten Sie ausschließlich im beschriebenen JSON-Format.",
            Self::section_brief(section),
            section.as_str()
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": CONTENT_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        tracing::info!(section = section.as_str(), "Sending content generation request");

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

        let mut parsed: SectionContent =
            serde_json::from_str(content).context("Failed to parse generated content JSON")?;
        // The model occasionally echoes a different section id; ours wins.
        parsed.section = section;

        tracing::info!(
            section = section.as_str(),
            duration_seconds = timer.elapsed().as_secs_f64(),
            questions = parsed.question_count(),
            "Content generation completed"
        );

        Ok(parsed)
    }
}
