use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::db::types::SectionId;
use crate::exam::scoring::ScaledScore;
use crate::services::ObjectiveScorer;

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    earned_points: f64,
    max_points: f64,
    grade: String,
}

/// Client for the external scoring function that maps a correct-answer count
/// onto the official TELC point scale for a section.
#[derive(Debug, Clone)]
pub(crate) struct ScoringApiService {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl ScoringApiService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.scoring().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.scoring().api_key.clone(),
            base_url: settings.scoring().base_url.trim_end_matches('/').to_string(),
            max_retries: settings.scoring().max_retries,
        })
    }
}

#[async_trait]
impl ObjectiveScorer for ScoringApiService {
    async fn scale(
        &self,
        section: SectionId,
        total_questions: usize,
        correct_count: usize,
    ) -> Result<ScaledScore> {
        let timer = Instant::now();
        let payload = json!({
            "section": section.as_str(),
            "total_questions": total_questions,
            "correct_count": correct_count,
        });

        let url = format!("{}/score", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=self.max_retries {
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
                    last_error = Some(anyhow::anyhow!("Scoring API error: {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call scoring API"));
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let response: ScoreResponse =
            serde_json::from_value(body).context("Failed to parse scoring response")?;

        tracing::info!(
            section = section.as_str(),
            correct_count,
            earned_points = response.earned_points,
            duration_seconds = timer.elapsed().as_secs_f64(),
            "Objective scoring completed"
        );

        Ok(ScaledScore {
            earned_points: response.earned_points,
            max_points: response.max_points,
            grade: response.grade,
        })
    }
}
