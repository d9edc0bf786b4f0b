use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::notification::Notification;
use crate::models::question::{Question, QuestionType};
use crate::models::quiz_session::QuizSession;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetAnswerRequest {
    #[validate(length(max = 2000))]
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerChoice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub explanation: String,
}

/// What the question screen renders for the current question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCard {
    pub title: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    /// `None` means a free-text answer.
    pub choices: Option<Vec<AnswerChoice>>,
    pub user_answer: Option<String>,
    pub feedback: Option<AnswerFeedback>,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizView {
    pub active: bool,
    pub current_index: usize,
    pub total_questions: usize,
    pub score: usize,
    pub answers: BTreeMap<usize, String>,
    pub busy: bool,
    pub card: Option<QuestionCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub notification: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<QuizView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn choices_for(question: &Question) -> Option<Vec<AnswerChoice>> {
    match question.question_type {
        QuestionType::Mcq => Some(
            question
                .options
                .iter()
                .flatten()
                .map(|o| AnswerChoice {
                    value: o.clone(),
                    label: o.clone(),
                })
                .collect(),
        ),
        QuestionType::Tf => Some(vec![
            AnswerChoice {
                value: "true".into(),
                label: "True".into(),
            },
            AnswerChoice {
                value: "false".into(),
                label: "False".into(),
            },
        ]),
        QuestionType::Fib => None,
    }
}

impl QuizView {
    pub fn from_session(session: &QuizSession, busy: bool) -> Self {
        let total = session.len();
        let card = session.current_question().map(|question| {
            let user_answer = session.answer_at(session.current_index).map(str::to_string);
            // An empty answer shows no verdict yet.
            let feedback = user_answer
                .as_deref()
                .filter(|a| !a.is_empty())
                .map(|a| AnswerFeedback {
                    correct: question.is_correct(a),
                    explanation: question.explanation.clone(),
                });
            QuestionCard {
                title: format!("Question {} of {}", session.current_index + 1, total),
                question_type: question.question_type,
                question: question.question.clone(),
                choices: choices_for(question),
                user_answer,
                feedback,
                can_go_previous: session.current_index > 0,
                can_go_next: session.current_index + 1 < total,
            }
        });

        Self {
            active: session.is_active(),
            current_index: session.current_index,
            total_questions: total,
            score: session.score,
            answers: session.answers.clone(),
            busy,
            card,
        }
    }
}
