mod answers;
mod error;
mod lifecycle;
mod navigation;
mod views;


use std::sync::Arc;
use std::time::Duration;

use crate::db::models::{Answer, Attempt, Question};
use crate::repositories::store::ExamStore;
use crate::services::grading::AnswerGrader;
use crate::services::rankings::RankService;
use crate::services::timers::TimerStore;

pub(crate) use error::EngineError;
pub(crate) use lifecycle::{AutoSubmitOutcome, StartSettings};

/// Drives exam attempts from start to final score. Cheap to clone.
#[derive(Clone)]
pub(crate) struct ExamEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: Arc<dyn ExamStore>,
    timers: Arc<dyn TimerStore>,
    timer_timeout: Duration,
    ranks: RankService,
    grader: AnswerGrader,
}

impl ExamEngine {
    pub(crate) fn new(
        store: Arc<dyn ExamStore>,
        timers: Arc<dyn TimerStore>,
        timer_timeout: Duration,
        ranks: RankService,
        grader: AnswerGrader,
    ) -> Self {
        Self { inner: Arc::new(EngineInner { store, timers, timer_timeout, ranks, grader }) }
    }

    pub(crate) fn timers(&self) -> &Arc<dyn TimerStore> {
        &self.inner.timers
    }

    /// Upper bound for a single timer store call on the request path.
    pub(crate) fn timer_timeout(&self) -> Duration {
        self.inner.timer_timeout
    }

    pub(crate) fn ranks(&self) -> &RankService {
        &self.inner.ranks
    }

    fn store(&self) -> &dyn ExamStore {
        self.inner.store.as_ref()
    }

    /// Someone else's attempt is reported as missing.
    async fn owned_attempt(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<Attempt, EngineError> {
        let attempt = self
            .store()
            .find_attempt(attempt_id)
            .await
            .map_err(|e| EngineError::store(e, "Failed to fetch attempt"))?;

        match attempt {
            Some(attempt) if attempt.student_id == student_id => Ok(attempt),
            _ => Err(EngineError::NotFound("Attempt not found")),
        }
    }

    async fn ongoing_attempt(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<Attempt, EngineError> {
        let attempt = self.owned_attempt(attempt_id, student_id).await?;
        if attempt.status.is_terminal() {
            return Err(EngineError::bad_request("Attempt is no longer in progress"));
        }
        Ok(attempt)
    }

    async fn questions(&self, paper_id: &str) -> Result<Vec<Question>, EngineError> {
        self.store()
            .list_questions(paper_id)
            .await
            .map_err(|e| EngineError::store(e, "Failed to fetch questions"))
    }

    async fn answers(&self, attempt_id: &str) -> Result<Vec<Answer>, EngineError> {
        self.store()
            .list_answers(attempt_id)
            .await
            .map_err(|e| EngineError::store(e, "Failed to fetch answers"))
    }

    async fn paper_question(
        &self,
        paper_id: &str,
        question_id: &str,
    ) -> Result<Question, EngineError> {
        self.store()
            .find_question(paper_id, question_id)
            .await
            .map_err(|e| EngineError::store(e, "Failed to fetch question"))?
            .ok_or(EngineError::NotFound("Question not found in this paper"))
    }
}
