use std::collections::{BTreeMap, HashMap};

use crate::core::time::{primitive_now_utc, unix_millis};
use crate::db::models::{Answer, Attempt, Paper, Question};
use crate::db::types::DifficultyLevel;
use crate::schemas::attempt::{
    AnswerKey, AnswerResponse, AttemptResponse, BucketStats, DifficultyStats, ExamDataResponse,
    PaperSummary, QuestionView, ResultItem, ResultResponse, ResultTag,
};
use crate::services::rankings::Standing;

use super::{EngineError, ExamEngine};

pub(super) fn result_tag(answer: Option<&Answer>) -> ResultTag {
    match answer.filter(|answer| answer.is_answered()) {
        None => ResultTag::Unanswered,
        Some(answer) => match answer.is_correct {
            Some(true) => ResultTag::Correct,
            Some(false) => ResultTag::Incorrect,
            None => ResultTag::PendingReview,
        },
    }
}

impl BucketStats {
    fn record(&mut self, tag: ResultTag, marks_obtained: f64, max_marks: f64) {
        self.total += 1;
        self.max_marks += max_marks;
        match tag {
            ResultTag::Correct => self.correct += 1,
            ResultTag::Incorrect => self.incorrect += 1,
            ResultTag::PendingReview => self.pending_review += 1,
            ResultTag::Unanswered => self.unanswered += 1,
        }
        if tag != ResultTag::Unanswered {
            self.marks_obtained += marks_obtained;
        }
    }
}

impl ExamEngine {
    pub(crate) async fn exam_data(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<ExamDataResponse, EngineError> {
        let attempt = self.owned_attempt(attempt_id, student_id).await?;
        let paper = self.attempt_paper(&attempt).await?;
        let total_questions = self.questions(&paper.id).await?.len();
        let answers = self.answers(&attempt.id).await?;

        let time_remaining_seconds = if attempt.status.is_terminal() {
            None
        } else {
            self.time_remaining(&attempt, &paper).await
        };

        Ok(ExamDataResponse {
            attempt: AttemptResponse::from(&attempt),
            paper: PaperSummary::from(&paper),
            total_questions,
            answered: answers.iter().filter(|answer| answer.is_answered()).count(),
            marked_for_review: answers.iter().filter(|answer| answer.marked_for_review).count(),
            answers: answers.iter().map(AnswerResponse::from).collect(),
            time_remaining_seconds,
        })
    }

    pub(crate) async fn result(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<ResultResponse, EngineError> {
        let attempt = self.owned_attempt(attempt_id, student_id).await?;
        if !attempt.status.is_terminal() {
            return Err(EngineError::bad_request("Results are available after submission"));
        }

        let paper = self.attempt_paper(&attempt).await?;
        let questions = self.questions(&paper.id).await?;
        let answers = self.answers(&attempt.id).await?;
        let by_question: HashMap<&str, &Answer> =
            answers.iter().map(|answer| (answer.question_id.as_str(), answer)).collect();

        let mut summary = BucketStats::default();
        let mut buckets: BTreeMap<DifficultyLevel, BucketStats> = BTreeMap::new();
        let mut items = Vec::with_capacity(questions.len());

        for (index, question) in questions.iter().enumerate() {
            let answer = by_question.get(question.id.as_str()).copied();
            let tag = result_tag(answer);
            let marks = answer.map(|answer| answer.marks_obtained).unwrap_or(0.0);

            summary.record(tag, marks, question.marks);
            buckets.entry(question.difficulty).or_default().record(tag, marks, question.marks);
            items.push(result_item(index, question, answer, tag, attempt.enable_solution_view));
        }

        Ok(ResultResponse {
            attempt: AttemptResponse::from(&attempt),
            paper: PaperSummary::from(&paper),
            summary,
            by_difficulty: buckets
                .into_iter()
                .map(|(difficulty, stats)| DifficultyStats { difficulty, stats })
                .collect(),
            questions: items,
        })
    }

    pub(crate) async fn standing(&self, student_id: &str) -> Standing {
        self.ranks().standing(student_id).await
    }

    async fn attempt_paper(&self, attempt: &Attempt) -> Result<Paper, EngineError> {
        self.store()
            .find_paper(&attempt.paper_id)
            .await
            .map_err(|e| EngineError::store(e, "Failed to fetch paper"))?
            .ok_or(EngineError::NotFound("Paper not found"))
    }

    /// Seconds left on the attempt's timer; `None` without an active deadline
    /// or when the timer store cannot be read.
    pub(super) async fn time_remaining(&self, attempt: &Attempt, paper: &Paper) -> Option<i64> {
        if attempt.no_time_limit || paper.time_limit_minutes().is_none() {
            return None;
        }

        match tokio::time::timeout(self.timer_timeout(), self.timers().get(&attempt.id)).await {
            Ok(Ok(Some(timer))) => Some(timer.remaining_seconds(unix_millis(primitive_now_utc()))),
            Ok(Ok(None)) => None,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, attempt_id = %attempt.id, "Failed to read timer");
                None
            }
            Err(_) => {
                tracing::warn!(attempt_id = %attempt.id, "Timed out reading timer");
                None
            }
        }
    }
}

fn result_item(
    index: usize,
    question: &Question,
    answer: Option<&Answer>,
    status: ResultTag,
    show_solution: bool,
) -> ResultItem {
    ResultItem {
        position: index + 1,
        question: QuestionView::from(question),
        status,
        answer: answer.map(AnswerResponse::from),
        answer_key: AnswerKey::for_question(question),
        solution_text: question.solution_text.clone().filter(|_| show_solution),
        solution_image: question.solution_image.clone().filter(|_| show_solution),
    }
}
