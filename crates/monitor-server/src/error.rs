//! Типы ошибок сервера мониторинга.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Отсутствует API-ключ агента. Передайте заголовок X-API-Key")]
    MissingApiKey,

    #[error("Неверный API-ключ агента")]
    InvalidApiKey,

    #[error("Ошибка конфигурации сервера: {0}")]
    Misconfigured(String),

    #[error("Не авторизован: {0}")]
    Unauthorized(String),

    #[error("Доступ запрещён: {0}")]
    Forbidden(String),

    #[error("Не найдено: {0}")]
    NotFound(String),

    #[error("Слишком много запросов")]
    TooManyRequests,

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),

    #[error("Неверный запрос: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::MissingApiKey => (StatusCode::UNAUTHORIZED, "missing_api_key"),
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "invalid_api_key"),
            AppError::Misconfigured(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_misconfigured")
            }
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, "too_many_requests"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = json!({ "error": self.to_string(), "code": code });
        (status, axum::Json(body)).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_errors_are_distinguishable() {
        let (missing_status, missing) = AppError::MissingApiKey.status_and_code();
        let (invalid_status, invalid) = AppError::InvalidApiKey.status_and_code();
        let (config_status, config) =
            AppError::Misconfigured("AGENT_API_KEY".into()).status_and_code();

        assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
        assert_eq!(invalid_status, StatusCode::UNAUTHORIZED);
        assert_eq!(config_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_ne!(missing, invalid);
        assert_ne!(invalid, config);
    }
}
