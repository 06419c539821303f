use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(
        "exam_attempts_started_total",
        "Exam attempts created by authenticated users"
    );
    metrics::describe_counter!(
        "exam_attempts_finished_total",
        "Exam attempts that reached a terminal status"
    );
    metrics::describe_counter!(
        "exam_sections_submitted_total",
        "Exam sections scored, including timer auto-submissions"
    );
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
