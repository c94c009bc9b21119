use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::Session;
use crate::inbound::http::router::AppState;

const TOKEN_TYPE: &str = "Bearer";

/// Exchange email and password for a bearer token.
pub async fn authenticate(
    State(state): State<AppState>,
    body: Result<Json<AuthenticateRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<AuthenticateResponseData>, ApiError> {
    let Json(body) = body?;

    state
        .user_service
        .authenticate(body.into())
        .await
        .map_err(ApiError::from)
        .map(|ref session| ApiSuccess::new(StatusCode::OK, session.into()))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticateRequestBody {
    email: String,
    password: String,
}

impl From<AuthenticateRequestBody> for LoginCommand {
    fn from(body: AuthenticateRequestBody) -> Self {
        Self {
            email: body.email,
            password: body.password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticateResponseData {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for AuthenticateResponseData {
    fn from(session: &Session) -> Self {
        Self {
            token: session.token.clone(),
            token_type: TOKEN_TYPE,
            expires_at: session.expires_at,
        }
    }
}
