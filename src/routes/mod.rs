pub mod health;
pub mod quiz;
pub mod upload;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};

use crate::middleware::{auth, rate_limit};
use crate::AppState;

/// Every API route with its auth and rate-limit layers. Static file serving,
/// CORS, tracing and body limits are added by the binary.
pub fn api_router(state: AppState, public_rps: u32) -> Router {
    let quiz_api = Router::new()
        .route("/api/quiz", get(quiz::get_quiz).delete(quiz::reset_quiz))
        .route("/api/quiz/answers/:index", put(quiz::set_answer))
        .route("/api/quiz/next", post(quiz::next_question))
        .route("/api/quiz/prev", post(quiz::prev_question))
        .route_layer(from_fn(auth::require_signed_in));

    let upload_api = Router::new().route("/api/quiz/upload", post(upload::upload_pdf));

    quiz_api
        .merge(upload_api)
        .layer(from_fn_with_state(state.clone(), auth::resolve_identity))
        .layer(from_fn_with_state(
            rate_limit::RateLimiter::new(public_rps),
            rate_limit::rps_middleware,
        ))
        .route("/health", get(health::health))
        .with_state(state)
}
