use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::auth::{Claims, ROLE_USER};
use crate::{error::AppError, state::{AppState, AuthConfig}};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/guest", post(login_guest))
}

/// Signs an HS256 token for `user_id`.
pub fn issue_token(auth: &AuthConfig, user_id: Uuid, role: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_owned(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

/// POST /v1/auth/guest
/// Issues a token for a fresh user id.
async fn login_guest(State(state): State<AppState>) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user_id = Uuid::new_v4();
    let token = issue_token(&state.auth, user_id, ROLE_USER)?;
    tracing::debug!(%user_id, "Issued guest token");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user_id })))
}
