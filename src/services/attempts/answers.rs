use crate::core::time::primitive_now_utc;
use crate::repositories::store::GradedAnswer;
use crate::schemas::attempt::{AnswerKey, AnswerResponse, SaveAnswerResponse};
use crate::services::grading::{GradingContext, Submission};

use super::{EngineError, ExamEngine};

impl ExamEngine {
    /// Grades and upserts one answer. Every save re-grades from scratch.
    pub(crate) async fn save_answer(
        &self,
        attempt_id: &str,
        student_id: &str,
        question_id: &str,
        submission: Submission,
    ) -> Result<SaveAnswerResponse, EngineError> {
        let attempt = self.ongoing_attempt(attempt_id, student_id).await?;
        let question = self.paper_question(&attempt.paper_id, question_id).await?;

        let verdict = self
            .inner
            .grader
            .grade(
                &question,
                &submission,
                GradingContext { attempt_id: &attempt.id, question_id: &question.id },
            )
            .await;

        let answer = self
            .store()
            .save_graded_answer(GradedAnswer {
                attempt_id: attempt.id.clone(),
                question_id: question.id.clone(),
                selected_option: submission.selected_option,
                answer_text: submission.answer_text,
                is_correct: verdict.is_correct,
                marks_obtained: verdict.marks_obtained,
                feedback: verdict.feedback,
                now: primitive_now_utc(),
            })
            .await
            .map_err(|e| EngineError::store(e, "Failed to save answer"))?;

        tracing::debug!(
            attempt_id = %attempt.id,
            question_id = %question.id,
            is_correct = ?answer.is_correct,
            marks = answer.marks_obtained,
            "Answer saved"
        );

        let revealed_key = if attempt.show_answer_after_wrong && answer.is_correct == Some(false) {
            AnswerKey::for_question(&question)
        } else {
            None
        };

        Ok(SaveAnswerResponse { answer: AnswerResponse::from(&answer), revealed_key })
    }

    /// Flips the review flag on an existing answer.
    pub(crate) async fn mark_for_review(
        &self,
        attempt_id: &str,
        student_id: &str,
        question_id: &str,
    ) -> Result<AnswerResponse, EngineError> {
        let attempt = self.ongoing_attempt(attempt_id, student_id).await?;
        let question = self.paper_question(&attempt.paper_id, question_id).await?;

        let answer = self
            .store()
            .toggle_review(&attempt.id, &question.id, primitive_now_utc())
            .await
            .map_err(|e| EngineError::store(e, "Failed to update review flag"))?
            .ok_or(EngineError::NotFound("Answer not found; open or answer the question first"))?;

        Ok(AnswerResponse::from(&answer))
    }

    /// Sets the flag, creating an empty answer row when needed.
    pub(crate) async fn mark_too_hard(
        &self,
        attempt_id: &str,
        student_id: &str,
        question_id: &str,
        flag: bool,
    ) -> Result<AnswerResponse, EngineError> {
        let attempt = self.ongoing_attempt(attempt_id, student_id).await?;
        let question = self.paper_question(&attempt.paper_id, question_id).await?;

        let answer = self
            .store()
            .set_too_hard(&attempt.id, &question.id, flag, primitive_now_utc())
            .await
            .map_err(|e| EngineError::store(e, "Failed to update too-hard flag"))?;

        Ok(AnswerResponse::from(&answer))
    }
}
