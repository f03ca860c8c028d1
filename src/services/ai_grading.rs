use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;

const GRADING_SYSTEM_PROMPT: &str = r#"You are an experienced examiner grading a student's written answer.
Compare the student's answer with the reference solution and award marks between 0 and the
maximum given. Reward correct ideas even when phrased differently; do not reward length.

Respond with strict JSON only:
{
  "marksObtained": <number>,
  "isCorrect": <boolean>,
  "feedback": "<one or two sentences for the student>"
}
"#;

/// Why an AI evaluation produced no usable verdict.
#[derive(Debug, Error)]
pub(crate) enum GradingFailure {
    #[error("AI grading is not configured")]
    NotConfigured,
    #[error("AI request timed out after {0}s")]
    Timeout(u64),
    #[error("network error: {0}")]
    Network(String),
    #[error("AI API error (HTTP {status}): {body}")]
    Status { status: u16, body: String },
    #[error("malformed AI response: {0}")]
    Malformed(String),
}

impl GradingFailure {
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Malformed(_) => "malformed",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EvaluationRequest {
    pub(crate) question_prompt: String,
    pub(crate) reference_solution: String,
    pub(crate) student_answer: String,
    pub(crate) max_marks: f64,
}

/// Raw verdict as returned by the model, before clamping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AiVerdict {
    pub(crate) marks_obtained: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[async_trait]
pub(crate) trait AnswerEvaluator: Send + Sync {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<AiVerdict, GradingFailure>;
}

#[derive(Debug, Clone)]
pub(crate) struct AiGradingService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    timeout_seconds: u64,
}

impl AiGradingService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let ai = settings.ai();
        Self::new(
            ai.openai_api_key.clone(),
            ai.openai_base_url.clone(),
            ai.ai_model.clone(),
            ai.ai_max_tokens,
            ai.ai_temperature,
            ai.ai_request_timeout,
        )
    }

    pub(crate) fn new(
        api_key: String,
        base_url: String,
        model: String,
        max_tokens: u32,
        temperature: f64,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_seconds.max(1));
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
            temperature,
            timeout_seconds: timeout_seconds.max(1),
        })
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty()
    }

    fn payload(&self, request: &EvaluationRequest) -> Value {
        let user_prompt = format!(
            "Question:\n{}\n\nReference solution:\n{}\n\nStudent answer:\n{}\n\nMaximum marks: {}\n",
            request.question_prompt,
            request.reference_solution,
            request.student_answer,
            request.max_marks,
        );

        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": GRADING_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        })
    }
}

#[async_trait]
impl AnswerEvaluator for AiGradingService {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<AiVerdict, GradingFailure> {
        if !self.is_configured() {
            return Err(GradingFailure::NotConfigured);
        }

        let timer = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GradingFailure::Timeout(self.timeout_seconds)
                } else {
                    GradingFailure::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GradingFailure::Status { status: status.as_u16(), body });
        }

        let body: Value = response.json().await.map_err(|err| {
            if err.is_timeout() {
                GradingFailure::Timeout(self.timeout_seconds)
            } else {
                GradingFailure::Malformed(err.to_string())
            }
        })?;

        let verdict = parse_verdict(&body)?;
        let tokens_used = body.pointer("/usage/total_tokens").and_then(Value::as_u64);

        tracing::info!(
            model = %self.model,
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used,
            "AI evaluation completed"
        );

        Ok(verdict)
    }
}

fn parse_verdict(body: &Value) -> Result<AiVerdict, GradingFailure> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| GradingFailure::Malformed("missing message content".to_string()))?;

    let verdict: AiVerdict = serde_json::from_str(content)
        .map_err(|err| GradingFailure::Malformed(err.to_string()))?;

    if !verdict.marks_obtained.is_finite() {
        return Err(GradingFailure::Malformed("marksObtained is not a finite number".to_string()));
    }

    Ok(verdict)
}
