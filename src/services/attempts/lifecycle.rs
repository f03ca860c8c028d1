use std::time::Duration;

use crate::core::time::{primitive_now_utc, unix_millis};
use crate::db::models::{Attempt, Paper};
use crate::db::types::{PaperStatus, UserRole};
use crate::repositories::store::{FinalizedAttempt, NewAttempt, OverdueAttempt, StartOutcome};
use crate::schemas::attempt::{AttemptResponse, StartAttemptResponse, SubmitResponse};
use crate::services::scoring::FinalizeMode;
use crate::services::timers::TimerRecord;

use super::{EngineError, ExamEngine};

const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Exam-mode flags chosen by the student at start; fixed for the attempt.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StartSettings {
    pub(crate) no_time_limit: bool,
    pub(crate) show_answer_after_wrong: bool,
    pub(crate) enable_solution_view: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AutoSubmitOutcome {
    Submitted { total_score: f64 },
    Skipped,
}

impl ExamEngine {
    pub(crate) async fn start(
        &self,
        paper_id: &str,
        student_id: &str,
        settings: StartSettings,
    ) -> Result<StartAttemptResponse, EngineError> {
        let student = self
            .store()
            .find_user(student_id)
            .await
            .map_err(|e| EngineError::store(e, "Failed to fetch student"))?
            .ok_or(EngineError::NotFound("Student not found"))?;
        if student.role != UserRole::Student || !student.is_active {
            return Err(EngineError::Forbidden("Only active students can take exams"));
        }

        let paper = self
            .store()
            .find_paper(paper_id)
            .await
            .map_err(|e| EngineError::store(e, "Failed to fetch paper"))?
            .filter(|paper| paper.status == PaperStatus::Published)
            .ok_or(EngineError::NotFound("Paper not found"))?;

        if paper.is_paid() {
            let purchased = self
                .store()
                .has_purchase(&paper.id, student_id)
                .await
                .map_err(|e| EngineError::store(e, "Failed to check purchase"))?;
            if !purchased {
                return Err(EngineError::Forbidden("This paper has not been purchased"));
            }
        }

        let questions = self.questions(&paper.id).await?;
        let total_marks: f64 = questions.iter().map(|question| question.marks).sum();

        let outcome = self
            .store()
            .start_attempt(NewAttempt {
                paper_id: paper.id.clone(),
                student_id: student_id.to_string(),
                started_at: primitive_now_utc(),
                total_marks,
                no_time_limit: settings.no_time_limit,
                show_answer_after_wrong: settings.show_answer_after_wrong,
                enable_solution_view: settings.enable_solution_view,
            })
            .await
            .map_err(|e| EngineError::store(e, "Failed to start attempt"))?;

        let resumed = matches!(outcome, StartOutcome::Resumed(_));
        let attempt = outcome.attempt();
        metrics::counter!(
            "attempts_started_total",
            "outcome" => if resumed { "resumed" } else { "created" }
        )
        .increment(1);

        if resumed {
            tracing::info!(
                attempt_id = %attempt.id,
                paper_id = %paper.id,
                student_id = %student_id,
                "Resumed ongoing attempt"
            );
        } else {
            tracing::info!(
                attempt_id = %attempt.id,
                paper_id = %paper.id,
                student_id = %student_id,
                attempt_number = attempt.attempt_number,
                "Started attempt"
            );
            self.register_timer(attempt, &paper).await;
        }

        Ok(StartAttemptResponse {
            attempt: AttemptResponse::from(attempt),
            resumed,
            time_remaining_seconds: self.time_remaining(attempt, &paper).await,
        })
    }

    async fn register_timer(&self, attempt: &Attempt, paper: &Paper) {
        if attempt.no_time_limit {
            return;
        }
        let Some(minutes) = paper.time_limit_minutes() else {
            return;
        };

        let record = TimerRecord {
            attempt_id: attempt.id.clone(),
            paper_id: attempt.paper_id.clone(),
            student_id: attempt.student_id.clone(),
            end_time: unix_millis(attempt.started_at) + minutes * 60_000,
        };
        let ttl_seconds = (minutes * 60) as u64;

        let write = self.timers().set_with_ttl(&record, ttl_seconds);
        match tokio::time::timeout(self.timer_timeout(), write).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(
                    error = %err,
                    attempt_id = %attempt.id,
                    "Failed to register attempt timer; attempt runs without a deadline"
                );
            }
            Err(_) => {
                tracing::error!(
                    attempt_id = %attempt.id,
                    "Timed out registering attempt timer; attempt runs without a deadline"
                );
            }
        }
    }

    pub(crate) async fn submit(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<SubmitResponse, EngineError> {
        let attempt = self.ongoing_attempt(attempt_id, student_id).await?;
        let total_questions = self.questions(&attempt.paper_id).await?.len();

        let finalized = self
            .finalize(&attempt.id, FinalizeMode::ManualSubmit)
            .await?
            .ok_or_else(|| EngineError::bad_request("Attempt is no longer in progress"))?;

        let outcome = &finalized.outcome;
        Ok(SubmitResponse {
            attempt: AttemptResponse::from(&finalized.attempt),
            total_questions,
            answered: outcome.answered,
            correct: outcome.correct,
            incorrect: outcome.incorrect,
            unanswered: outcome.unanswered,
            pending_review: outcome.pending_review,
        })
    }

    /// Timer-driven submission. Missing, foreign or finished attempts are
    /// skipped so repeated sweeps stay harmless.
    pub(crate) async fn auto_submit(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<AutoSubmitOutcome, EngineError> {
        let attempt = self
            .store()
            .find_attempt(attempt_id)
            .await
            .map_err(|e| EngineError::store(e, "Failed to fetch attempt"))?;

        let Some(attempt) = attempt else {
            return Ok(AutoSubmitOutcome::Skipped);
        };
        if attempt.student_id != student_id {
            tracing::warn!(
                attempt_id = %attempt_id,
                student_id = %student_id,
                "Timer student does not own attempt; skipping auto-submit"
            );
            return Ok(AutoSubmitOutcome::Skipped);
        }
        if attempt.status.is_terminal() {
            return Ok(AutoSubmitOutcome::Skipped);
        }

        Ok(match self.finalize(attempt_id, FinalizeMode::AutoSubmit).await? {
            Some(finalized) => {
                AutoSubmitOutcome::Submitted { total_score: finalized.attempt.total_score }
            }
            None => AutoSubmitOutcome::Skipped,
        })
    }

    /// Ongoing time-bound attempts whose deadline passed `grace` ago or
    /// earlier, straight from the store.
    pub(crate) async fn overdue_attempts(
        &self,
        grace: time::Duration,
        limit: i64,
    ) -> Result<Vec<OverdueAttempt>, EngineError> {
        self.store()
            .list_overdue_attempts(primitive_now_utc() - grace, limit)
            .await
            .map_err(|e| EngineError::store(e, "Failed to list overdue attempts"))
    }

    /// Shared by manual and automatic submission. `None` when the attempt
    /// left `Ongoing` before the transaction locked it.
    async fn finalize(
        &self,
        attempt_id: &str,
        mode: FinalizeMode,
    ) -> Result<Option<FinalizedAttempt>, EngineError> {
        let finalized = self
            .store()
            .finalize_attempt(attempt_id, mode.terminal_status(), primitive_now_utc())
            .await
            .map_err(|e| EngineError::store(e, "Failed to finalize attempt"))?;

        let Some(finalized) = finalized else {
            return Ok(None);
        };

        metrics::counter!("attempts_finalized_total", "mode" => mode.as_str()).increment(1);
        tracing::info!(
            attempt_id = %attempt_id,
            paper_id = %finalized.attempt.paper_id,
            mode = mode.as_str(),
            total_score = finalized.attempt.total_score,
            percentage = finalized.attempt.percentage,
            paper_attempts = finalized.aggregate.total_attempts,
            "Attempt finalized"
        );

        self.cleanup_after_finalize(attempt_id).await;
        Ok(Some(finalized))
    }

    async fn cleanup_after_finalize(&self, attempt_id: &str) {
        match tokio::time::timeout(CLEANUP_TIMEOUT, self.timers().delete(attempt_id)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(error = %err, attempt_id = %attempt_id, "Failed to delete timer");
            }
            Err(_) => {
                tracing::warn!(attempt_id = %attempt_id, "Timed out deleting timer");
            }
        }

        if tokio::time::timeout(CLEANUP_TIMEOUT, self.ranks().invalidate_all()).await.is_err() {
            tracing::warn!(attempt_id = %attempt_id, "Timed out invalidating rank cache");
        }
    }
}
