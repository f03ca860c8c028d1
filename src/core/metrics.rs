use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    describe_counter!("attempts_started_total", "Exam attempts started, by created/resumed");
    describe_counter!("answers_graded_total", "Answers graded, by grading policy");
    describe_counter!(
        "open_text_fallback_total",
        "Open-text answers graded by word overlap because AI evaluation failed"
    );
    describe_counter!("attempts_finalized_total", "Attempts moved to a terminal state, by mode");
    describe_counter!("timer_sweep_runs_total", "Timer sweep iterations, by outcome");
    describe_counter!("timers_expired_total", "Expired timer records observed by the sweep");
    describe_counter!("rank_cache_lookups_total", "Rank cache reads, by hit/miss/error");
    describe_counter!("http_requests_total", "HTTP responses, by status code");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency, by status code"
    );
}
