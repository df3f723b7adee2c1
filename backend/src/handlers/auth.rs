//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppError;
use crate::services::auth::{LoginInput, SignupInput};
use crate::services::AuthService;
use crate::AppState;

#[derive(Serialize)]
pub struct SignupResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub name: String,
    pub email: String,
}

/// Signup endpoint handler
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupInput>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    AuthService::new(state.db.clone()).signup(body).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Signup successful.".to_string(),
        }),
    ))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = AuthService::new(state.db.clone()).login(body).await?;

    Ok(Json(LoginResponse {
        message: "Login successful.".to_string(),
        name: user.name,
        email: user.email,
    }))
}
