//! Маршруты аутентификации: вход оператора.

use crate::api::middleware::{self, Role};
use crate::api::AppState;
use crate::config::{verify_password, Account};
use crate::error::AppError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

/// POST /auth/login: выдача JWT администратору или наблюдателю.
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = body?;
    let role = authenticate(&state, &req).ok_or_else(|| {
        tracing::warn!("Неудачная попытка входа для пользователя: {}", req.username);
        AppError::Unauthorized("Неверные учётные данные".into())
    })?;

    let token = middleware::create_token(&req.username, role, &state.jwt_secret)?;
    tracing::info!("Оператор {} вошёл в систему ({role:?})", req.username);

    Ok(Json(LoginResponse { token, role }))
}

fn authenticate(state: &AppState, req: &LoginRequest) -> Option<Role> {
    let matches = |account: &Account| {
        account.username == req.username && verify_password(&req.password, &account.password_hash)
    };

    if matches(&state.admin) {
        Some(Role::Admin)
    } else if state.viewer.as_ref().is_some_and(matches) {
        Some(Role::Viewer)
    } else {
        None
    }
}
