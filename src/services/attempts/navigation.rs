use crate::db::models::{Answer, Question};
use crate::schemas::attempt::{AnswerResponse, QuestionPayload, QuestionView};

use super::{EngineError, ExamEngine};

/// Position of the question behind the most recently created answer, or 0
/// before anything was answered.
pub(super) fn current_index(questions: &[Question], answers: &[Answer]) -> usize {
    answers
        .last()
        .and_then(|last| questions.iter().position(|question| question.id == last.question_id))
        .unwrap_or(0)
}

fn payload(index: usize, questions: &[Question], answers: &[Answer]) -> QuestionPayload {
    let question = &questions[index];
    QuestionPayload {
        position: index + 1,
        total: questions.len(),
        question: QuestionView::from(question),
        answer: answers
            .iter()
            .find(|answer| answer.question_id == question.id)
            .map(AnswerResponse::from),
    }
}

impl ExamEngine {
    /// `index` is 0-based.
    pub(crate) async fn get_question(
        &self,
        attempt_id: &str,
        student_id: &str,
        index: usize,
    ) -> Result<QuestionPayload, EngineError> {
        let attempt = self.ongoing_attempt(attempt_id, student_id).await?;
        let questions = self.questions(&attempt.paper_id).await?;
        if index >= questions.len() {
            return Err(EngineError::BadRequest(format!(
                "Question index {index} is out of range (0..{})",
                questions.len()
            )));
        }

        let answers = self.answers(&attempt.id).await?;
        Ok(payload(index, &questions, &answers))
    }

    pub(crate) async fn next_question(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<QuestionPayload, EngineError> {
        let attempt = self.ongoing_attempt(attempt_id, student_id).await?;
        let questions = self.questions(&attempt.paper_id).await?;
        let answers = self.answers(&attempt.id).await?;

        let next = current_index(&questions, &answers) + 1;
        if next >= questions.len() {
            return Err(EngineError::bad_request("Already at the last question"));
        }
        Ok(payload(next, &questions, &answers))
    }

    pub(crate) async fn previous_question(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<QuestionPayload, EngineError> {
        let attempt = self.ongoing_attempt(attempt_id, student_id).await?;
        let questions = self.questions(&attempt.paper_id).await?;
        let answers = self.answers(&attempt.id).await?;

        let current = current_index(&questions, &answers);
        if current == 0 || questions.is_empty() {
            return Err(EngineError::bad_request("Already at the first question"));
        }
        Ok(payload(current - 1, &questions, &answers))
    }
}

#[cfg(test)]
mod tests {
    use super::current_index;
    use crate::db::types::QuestionKind;
    use crate::test_support::{answer_fixture, question_fixture};

    #[test]
    fn cursor_follows_latest_answer_row() {
        let questions: Vec<_> = (0..4)
            .map(|i| question_fixture(&format!("q{i}"), "p1", i, QuestionKind::MultipleChoice))
            .collect();

        assert_eq!(current_index(&questions, &[]), 0);

        let answers = vec![answer_fixture("a1", "q2"), answer_fixture("a1", "q1")];
        assert_eq!(current_index(&questions, &answers), 1);

        let stray = vec![answer_fixture("a1", "elsewhere")];
        assert_eq!(current_index(&questions, &stray), 0);
    }
}
