use axum::{
    extract::{Path, State},
    Json,
};

use crate::dto::quiz_dto::{QuizView, SetAnswerRequest};
use crate::error::Result;
use crate::models::quiz_session::QuizSession;
use crate::utils::validation::validate;
use crate::AppState;

fn view(state: &AppState, session: &QuizSession) -> Json<QuizView> {
    Json(QuizView::from_session(session, state.upload_service.is_busy()))
}

#[axum::debug_handler]
pub async fn get_quiz(State(state): State<AppState>) -> Json<QuizView> {
    let session = state.quiz_store.snapshot();
    view(&state, &session)
}

#[axum::debug_handler]
pub async fn set_answer(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(req): Json<SetAnswerRequest>,
) -> Result<Json<QuizView>> {
    validate(&req)?;
    let session = state.quiz_store.set_answer(index, req.answer)?;
    Ok(view(&state, &session))
}

#[axum::debug_handler]
pub async fn next_question(State(state): State<AppState>) -> Json<QuizView> {
    let session = state.quiz_store.next_question();
    view(&state, &session)
}

#[axum::debug_handler]
pub async fn prev_question(State(state): State<AppState>) -> Json<QuizView> {
    let session = state.quiz_store.prev_question();
    view(&state, &session)
}

#[axum::debug_handler]
pub async fn reset_quiz(State(state): State<AppState>) -> Json<QuizView> {
    let session = state.quiz_store.reset_quiz();
    view(&state, &session)
}
