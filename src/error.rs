use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("No active quiz")]
    NoActiveQuiz,

    #[error("A quiz is already being generated")]
    Busy,

    #[error("Upload error: {0}")]
    Storage(String),

    #[error("Quiz generation service error: {0}")]
    Service(String),

    #[error("Invalid JSON response: {reason}")]
    MalformedResponse { raw: String, reason: String },

    #[error("Invalid response format from quiz generator")]
    InvalidResponseShape,

    #[error("No questions generated")]
    EmptyQuiz,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::InvalidPayload(_)
            | Error::BadRequest(_)
            | Error::Json(_)
            | Error::Multipart(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NoActiveQuiz => StatusCode::NOT_FOUND,
            Error::Busy => StatusCode::CONFLICT,
            Error::EmptyQuiz => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Storage(_)
            | Error::Service(_)
            | Error::MalformedResponse { .. }
            | Error::InvalidResponseShape
            | Error::Reqwest(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let error_message = match &self {
            Error::Unauthorized(code) => code.clone(),
            Error::Reqwest(err) => format!("External service error: {}", err),
            Error::Config(_) | Error::Io(_) => {
                tracing::error!(error = %self, "request failed");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
