use serde::{Deserialize, Serialize};

/// One generated quiz question. Field names follow the JSON shape the
/// generator is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Tf,
    Fib,
}

impl QuestionType {
    /// Resolves the tag the model used, tolerating the long spellings it
    /// sometimes emits instead of the short ones it was asked for.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "mcq" | "multiple_choice" => Some(QuestionType::Mcq),
            "tf" | "true_false" | "true_or_false" => Some(QuestionType::Tf),
            "fib" | "fill_in_blank" | "fill_in_the_blank" => Some(QuestionType::Fib),
            _ => None,
        }
    }
}

impl Question {
    /// Exact, case-sensitive comparison. No trimming or normalization.
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}
