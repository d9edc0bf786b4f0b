use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionType};

pub const MCQ_COUNT: usize = 5;
pub const TF_COUNT: usize = 3;
pub const FIB_COUNT: usize = 2;

/// Text-in, text-out access to a generative model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub questions: Vec<Question>,
}

#[derive(Clone)]
pub struct AIService {
    generator: Arc<dyn ContentGenerator>,
    timeout: Duration,
}

impl AIService {
    pub fn new(generator: Arc<dyn ContentGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Asks the model for a quiz over the document at `pdf_url` and validates
    /// the reply. An empty `questions` array is returned as-is; callers
    /// decide what an empty quiz means.
    pub async fn generate_quiz(&self, pdf_url: &str) -> Result<GeneratedQuiz> {
        let prompt = build_quiz_prompt(pdf_url);

        tracing::info!(pdf_url, timeout_secs = self.timeout.as_secs(), "requesting quiz generation");
        let text = tokio::time::timeout(self.timeout, self.generator.generate_content(&prompt))
            .await
            .map_err(|_| {
                Error::Service(format!(
                    "no response from model within {} seconds",
                    self.timeout.as_secs()
                ))
            })??;

        let quiz = parse_quiz_response(&text)
            .inspect_err(|e| match e {
                Error::MalformedResponse { raw, .. } => {
                    tracing::error!(error = %e, raw = %raw, "failed to parse model output")
                }
                other => tracing::error!(error = %other, "model output rejected"),
            })?;
        tracing::info!(questions = quiz.questions.len(), "quiz generated");
        Ok(quiz)
    }
}

pub fn build_quiz_prompt(pdf_url: &str) -> String {
    format!(
        r#"Generate a comprehensive quiz based on the content from this PDF: {pdf_url}

Please create:
1. {MCQ_COUNT} multiple choice questions
2. {TF_COUNT} true/false questions
3. {FIB_COUNT} fill-in-the-blank questions

Format the response as a JSON object with this structure:
{{
  "questions": [
    {{
      "type": "mcq"|"tf"|"fib",
      "question": "string",
      "options": ["array of options"] (for MCQ only),
      "correctAnswer": "string",
      "explanation": "string"
    }}
  ]
}}

For true/false questions the correctAnswer must be exactly "true" or "false".
For multiple choice questions the correctAnswer must be one of the options, copied exactly.

IMPORTANT: Return ONLY the JSON object, without any additional formatting or markdown syntax."#
    )
}

/// Removes a surrounding markdown code fence, with or without a language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) up to the first newline.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

pub fn parse_quiz_response(text: &str) -> Result<GeneratedQuiz> {
    let cleaned = strip_code_fences(text);
    let parsed: JsonValue = serde_json::from_str(cleaned).map_err(|e| Error::MalformedResponse {
        raw: text.to_string(),
        reason: e.to_string(),
    })?;

    let entries = parsed
        .get("questions")
        .and_then(|q| q.as_array())
        .ok_or(Error::InvalidResponseShape)?;

    let questions: Vec<Question> = entries
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| {
            let q = coerce_question(v);
            if q.is_none() {
                tracing::warn!(index = idx, entry = %v, "dropping incomplete question");
            }
            q
        })
        .collect();

    Ok(GeneratedQuiz { questions })
}

fn coerce_question(v: &JsonValue) -> Option<Question> {
    let question_type = v.get("type").and_then(|t| t.as_str()).and_then(QuestionType::from_tag)?;

    let question = v
        .get("question")
        .and_then(|s| s.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let correct_answer = match v.get("correctAnswer")? {
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        _ => return None,
    };

    let explanation = v
        .get("explanation")
        .and_then(|s| s.as_str())
        .unwrap_or_default()
        .to_string();

    let options = match question_type {
        QuestionType::Mcq => {
            let options: Vec<String> = v
                .get("options")
                .and_then(|o| o.as_array())
                .map(|a| a.iter().filter_map(|x| x.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            if options.len() < 2 {
                return None;
            }
            Some(options)
        }
        QuestionType::Tf | QuestionType::Fib => None,
    };

    Some(Question {
        question_type,
        question,
        options,
        correct_answer,
        explanation,
    })
}
