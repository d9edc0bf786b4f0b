use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The browser client calls the API from its own origin with a bearer token.
pub fn api_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any)
}
