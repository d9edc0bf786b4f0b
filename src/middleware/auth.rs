use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::user::Identity;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

fn reject(code: &str) -> Response {
    Error::Unauthorized(code.to_string()).into_response()
}

/// Resolves the caller into an [`Identity`] extension. A request without an
/// `Authorization` header is signed out; a header that is present but not a
/// valid bearer token is rejected outright.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = match req.headers().get(axum::http::header::AUTHORIZATION) {
        None => Identity::SignedOut,
        Some(auth_header) => {
            let Ok(auth_str) = auth_header.to_str() else {
                return reject("bad_authorization");
            };
            let Some(token) = auth_str.strip_prefix("Bearer ") else {
                return reject("unsupported_scheme");
            };
            match decode_claims(token, state.jwt_secret.as_bytes()) {
                Ok(claims) if !claims.sub.is_empty() => Identity::SignedIn {
                    user_id: claims.sub,
                },
                Ok(_) => return reject("invalid_token"),
                Err(e) => {
                    tracing::debug!(error = %e, "rejected bearer token");
                    return reject("invalid_token");
                }
            }
        }
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Must run after [`resolve_identity`].
pub async fn require_signed_in(req: Request, next: Next) -> Response {
    match req.extensions().get::<Identity>() {
        Some(identity) if identity.is_signed_in() => next.run(req).await,
        _ => reject("missing_authorization"),
    }
}

pub fn decode_claims(token: &str, secret: &[u8]) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).map(|data| data.claims)
}
