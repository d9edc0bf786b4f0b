use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::question::Question;

/// Full state of one quiz-taking attempt. This is also the persisted payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    #[serde(default)]
    pub current_quiz: Option<Vec<Question>>,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub score: usize,
    #[serde(default)]
    pub answers: BTreeMap<usize, String>,
}

impl QuizSession {
    /// A fresh session over `questions`. Nothing from a prior session survives.
    pub fn start(questions: Vec<Question>) -> Self {
        Self {
            current_quiz: Some(questions),
            current_index: 0,
            score: 0,
            answers: BTreeMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.current_quiz.is_some()
    }

    pub fn len(&self) -> usize {
        self.current_quiz.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_quiz.as_ref()?.get(self.current_index)
    }

    pub fn answer_at(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    /// Overwrites the answer at `index` and recomputes the score.
    pub fn record_answer(&mut self, index: usize, answer: String) -> Result<()> {
        let len = match &self.current_quiz {
            Some(questions) => questions.len(),
            None => return Err(Error::NoActiveQuiz),
        };
        if index >= len {
            return Err(Error::BadRequest(format!(
                "question index {} is out of range (quiz has {} questions)",
                index, len
            )));
        }

        self.answers.insert(index, answer);
        self.score = self.compute_score();
        Ok(())
    }

    /// Count of recorded answers that equal their question's correct answer.
    /// Always a full scan; the stored score is never adjusted incrementally.
    pub fn compute_score(&self) -> usize {
        let Some(questions) = &self.current_quiz else {
            return 0;
        };
        self.answers
            .iter()
            .filter(|(idx, answer)| questions.get(**idx).is_some_and(|q| q.is_correct(answer)))
            .count()
    }

    /// Whether the position and recorded answers fit inside the quiz. An
    /// inactive session has neither.
    pub fn is_consistent(&self) -> bool {
        match &self.current_quiz {
            None => self.current_index == 0 && self.answers.is_empty(),
            Some(questions) => {
                !questions.is_empty()
                    && self.current_index < questions.len()
                    && self.answers.keys().all(|idx| *idx < questions.len())
            }
        }
    }

    /// Returns whether the index moved.
    pub fn advance(&mut self) -> bool {
        let len = self.len();
        if len > 0 && self.current_index < len - 1 {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    /// Returns whether the index moved.
    pub fn retreat(&mut self) -> bool {
        if self.current_index > 0 {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }
}
