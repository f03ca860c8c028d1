use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Answer, Attempt, Paper, Question, User};
use crate::db::types::AttemptStatus;
use crate::services::scoring::{self, PaperAggregate, ScoreOutcome};

pub(crate) use super::attempts::OverdueAttempt;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Creation parameters for an attempt. The attempt number is assigned by the
/// store under the per-pair lock.
#[derive(Debug, Clone)]
pub(crate) struct NewAttempt {
    pub(crate) paper_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) total_marks: f64,
    pub(crate) no_time_limit: bool,
    pub(crate) show_answer_after_wrong: bool,
    pub(crate) enable_solution_view: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum StartOutcome {
    Resumed(Attempt),
    Created(Attempt),
}

impl StartOutcome {
    pub(crate) fn attempt(&self) -> &Attempt {
        match self {
            Self::Resumed(attempt) | Self::Created(attempt) => attempt,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GradedAnswer {
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option: Option<i32>,
    pub(crate) answer_text: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) now: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct FinalizedAttempt {
    pub(crate) attempt: Attempt,
    pub(crate) outcome: ScoreOutcome,
    pub(crate) aggregate: PaperAggregate,
}

/// Persistence port of the attempt engine.
#[async_trait]
pub(crate) trait ExamStore: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_paper(&self, id: &str) -> Result<Option<Paper>, StoreError>;

    /// Questions of a paper in paper order.
    async fn list_questions(&self, paper_id: &str) -> Result<Vec<Question>, StoreError>;

    async fn find_question(
        &self,
        paper_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, StoreError>;

    async fn has_purchase(&self, paper_id: &str, student_id: &str) -> Result<bool, StoreError>;

    /// Returns the ongoing attempt for the pair if one exists, otherwise
    /// creates attempt `count + 1`. Atomic per (paper, student).
    async fn start_attempt(&self, attempt: NewAttempt) -> Result<StartOutcome, StoreError>;

    async fn find_attempt(&self, id: &str) -> Result<Option<Attempt>, StoreError>;

    /// Answers in creation order.
    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<Answer>, StoreError>;

    /// Upserts on (attempt, question), replacing every grading field and
    /// keeping the review flags.
    async fn save_graded_answer(&self, answer: GradedAnswer) -> Result<Answer, StoreError>;

    async fn toggle_review(
        &self,
        attempt_id: &str,
        question_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<Answer>, StoreError>;

    async fn set_too_hard(
        &self,
        attempt_id: &str,
        question_id: &str,
        flag: bool,
        now: PrimitiveDateTime,
    ) -> Result<Answer, StoreError>;

    /// Scores an ongoing attempt and refreshes the paper aggregate in one
    /// atomic unit. `Ok(None)` when the attempt is missing or already
    /// terminal; nothing is written in that case.
    async fn finalize_attempt(
        &self,
        attempt_id: &str,
        status: AttemptStatus,
        now: PrimitiveDateTime,
    ) -> Result<Option<FinalizedAttempt>, StoreError>;

    /// Ongoing time-bound attempts whose deadline is at or before `cutoff`.
    async fn list_overdue_attempts(
        &self,
        cutoff: PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<OverdueAttempt>, StoreError>;

    async fn student_rank(&self, student_id: &str) -> Result<Option<i64>, StoreError>;

    async fn count_ranked_students(&self) -> Result<i64, StoreError>;
}

#[derive(Clone)]
pub(crate) struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(super::users::find_by_id(&self.pool, id).await?)
    }

    async fn find_paper(&self, id: &str) -> Result<Option<Paper>, StoreError> {
        Ok(super::papers::find_by_id(&self.pool, id).await?)
    }

    async fn list_questions(&self, paper_id: &str) -> Result<Vec<Question>, StoreError> {
        Ok(super::questions::list_by_paper(&self.pool, paper_id).await?)
    }

    async fn find_question(
        &self,
        paper_id: &str,
        question_id: &str,
    ) -> Result<Option<Question>, StoreError> {
        Ok(super::questions::find_in_paper(&self.pool, paper_id, question_id).await?)
    }

    async fn has_purchase(&self, paper_id: &str, student_id: &str) -> Result<bool, StoreError> {
        Ok(super::purchases::exists(&self.pool, paper_id, student_id).await?)
    }

    async fn start_attempt(&self, attempt: NewAttempt) -> Result<StartOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        super::attempts::acquire_start_lock(&mut *tx, &attempt.paper_id, &attempt.student_id)
            .await?;

        if let Some(existing) =
            super::attempts::find_ongoing(&mut *tx, &attempt.paper_id, &attempt.student_id).await?
        {
            tx.commit().await?;
            return Ok(StartOutcome::Resumed(existing));
        }

        let previous = super::attempts::count_by_paper_and_student(
            &mut *tx,
            &attempt.paper_id,
            &attempt.student_id,
        )
        .await?;

        let id = Uuid::new_v4().to_string();
        let created = super::attempts::create(
            &mut *tx,
            super::attempts::CreateAttempt {
                id: &id,
                paper_id: &attempt.paper_id,
                student_id: &attempt.student_id,
                started_at: attempt.started_at,
                total_marks: attempt.total_marks,
                attempt_number: (previous + 1) as i32,
                no_time_limit: attempt.no_time_limit,
                show_answer_after_wrong: attempt.show_answer_after_wrong,
                enable_solution_view: attempt.enable_solution_view,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(StartOutcome::Created(created))
    }

    async fn find_attempt(&self, id: &str) -> Result<Option<Attempt>, StoreError> {
        Ok(super::attempts::find_by_id(&self.pool, id).await?)
    }

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(super::answers::list_by_attempt(&self.pool, attempt_id).await?)
    }

    async fn save_graded_answer(&self, answer: GradedAnswer) -> Result<Answer, StoreError> {
        Ok(super::answers::upsert_graded(
            &self.pool,
            super::answers::UpsertGradedAnswer {
                attempt_id: &answer.attempt_id,
                question_id: &answer.question_id,
                selected_option: answer.selected_option,
                answer_text: answer.answer_text.as_deref(),
                is_correct: answer.is_correct,
                marks_obtained: answer.marks_obtained,
                feedback: answer.feedback.as_deref(),
                now: answer.now,
            },
        )
        .await?)
    }

    async fn toggle_review(
        &self,
        attempt_id: &str,
        question_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<Answer>, StoreError> {
        Ok(super::answers::toggle_review(&self.pool, attempt_id, question_id, now).await?)
    }

    async fn set_too_hard(
        &self,
        attempt_id: &str,
        question_id: &str,
        flag: bool,
        now: PrimitiveDateTime,
    ) -> Result<Answer, StoreError> {
        Ok(super::answers::set_too_hard(&self.pool, attempt_id, question_id, flag, now).await?)
    }

    async fn finalize_attempt(
        &self,
        attempt_id: &str,
        status: AttemptStatus,
        now: PrimitiveDateTime,
    ) -> Result<Option<FinalizedAttempt>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(attempt) = super::attempts::lock_by_id(&mut *tx, attempt_id).await? else {
            return Ok(None);
        };
        if attempt.status != AttemptStatus::Ongoing {
            return Ok(None);
        }

        let answers = super::answers::list_by_attempt(&mut *tx, attempt_id).await?;
        let question_count = super::questions::count_by_paper(&mut *tx, &attempt.paper_id).await?;
        let outcome = scoring::compute_outcome(
            &answers,
            attempt.total_marks,
            question_count.max(0) as usize,
            attempt.started_at,
            now,
        );

        let updated = super::attempts::finalize(&mut *tx, attempt_id, status, &outcome, now).await?;

        super::papers::lock_for_update(&mut *tx, &attempt.paper_id).await?;
        let scores = super::attempts::terminal_scores(&mut *tx, &attempt.paper_id).await?;
        let aggregate = scoring::paper_aggregate(&scores);
        super::papers::update_statistics(&mut *tx, &attempt.paper_id, aggregate, now).await?;

        tx.commit().await?;

        Ok(Some(FinalizedAttempt { attempt: updated, outcome, aggregate }))
    }

    async fn list_overdue_attempts(
        &self,
        cutoff: PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<OverdueAttempt>, StoreError> {
        Ok(super::attempts::list_overdue(&self.pool, cutoff, limit).await?)
    }

    async fn student_rank(&self, student_id: &str) -> Result<Option<i64>, StoreError> {
        Ok(super::rankings::student_rank(&self.pool, student_id).await?)
    }

    async fn count_ranked_students(&self) -> Result<i64, StoreError> {
        Ok(super::rankings::count_ranked_students(&self.pool).await?)
    }
}
