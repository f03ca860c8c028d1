use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::time::{primitive_now_utc, unix_millis};
use crate::services::attempts::{AutoSubmitOutcome, ExamEngine};

const OVERDUE_BATCH: i64 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) expired: usize,
    pub(crate) submitted: usize,
    pub(crate) skipped: usize,
    pub(crate) failed: usize,
}

/// Auto-submits every attempt whose deadline has passed. A failed item keeps
/// its timer so the next sweep retries it.
pub(crate) async fn run_sweep(engine: &ExamEngine) -> Result<SweepReport> {
    let now_ms = unix_millis(primitive_now_utc());
    let expired = engine
        .timers()
        .list_expired(now_ms)
        .await
        .context("Failed to list expired timers")?;

    let mut report = SweepReport { expired: expired.len(), ..SweepReport::default() };
    if expired.is_empty() {
        return Ok(report);
    }

    for timer in &expired {
        match engine.auto_submit(&timer.attempt_id, &timer.student_id).await {
            Ok(AutoSubmitOutcome::Submitted { total_score }) => {
                report.submitted += 1;
                tracing::info!(
                    attempt_id = %timer.attempt_id,
                    student_id = %timer.student_id,
                    total_score,
                    "Auto-submitted expired attempt"
                );
            }
            Ok(AutoSubmitOutcome::Skipped) => {
                report.skipped += 1;
                let delete = engine.timers().delete(&timer.attempt_id);
                match tokio::time::timeout(engine.timer_timeout(), delete).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::warn!(
                            error = %err,
                            attempt_id = %timer.attempt_id,
                            "Failed to drop stale timer"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            attempt_id = %timer.attempt_id,
                            "Timed out dropping stale timer"
                        );
                    }
                }
            }
            Err(err) => {
                report.failed += 1;
                tracing::error!(
                    error = %err,
                    attempt_id = %timer.attempt_id,
                    "Auto-submit failed; will retry on next sweep"
                );
            }
        }
    }

    tracing::info!(
        expired = report.expired,
        submitted = report.submitted,
        skipped = report.skipped,
        failed = report.failed,
        "Timer sweep finished"
    );
    metrics::counter!("timers_expired_total").increment(report.expired as u64);

    Ok(report)
}

/// Closes time-bound attempts the timer store lost track of, for example
/// when the worker was down past the timer key's grace period. Only
/// attempts overdue by more than `grace` are considered.
pub(crate) async fn run_overdue_sweep(engine: &ExamEngine, grace: Duration) -> Result<SweepReport> {
    let grace = time::Duration::try_from(grace).context("Grace period out of range")?;
    let overdue = engine
        .overdue_attempts(grace, OVERDUE_BATCH)
        .await
        .context("Failed to list overdue attempts")?;

    let mut report = SweepReport { expired: overdue.len(), ..SweepReport::default() };
    for attempt in &overdue {
        match engine.auto_submit(&attempt.attempt_id, &attempt.student_id).await {
            Ok(AutoSubmitOutcome::Submitted { total_score }) => {
                report.submitted += 1;
                tracing::warn!(
                    attempt_id = %attempt.attempt_id,
                    student_id = %attempt.student_id,
                    total_score,
                    "Auto-submitted overdue attempt without a timer"
                );
            }
            Ok(AutoSubmitOutcome::Skipped) => report.skipped += 1,
            Err(err) => {
                report.failed += 1;
                tracing::error!(
                    error = %err,
                    attempt_id = %attempt.attempt_id,
                    "Overdue auto-submit failed; will retry on next sweep"
                );
            }
        }
    }

    if report.expired > 0 {
        metrics::counter!("attempts_overdue_total").increment(report.expired as u64);
    }

    Ok(report)
}
