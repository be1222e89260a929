//! Экстракторы аутентификации: JWT операторов и общий ключ агентов.

use crate::api::AppState;
use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use monitor_types::API_KEY_HEADER;
use serde::{Deserialize, Serialize};

/// Роль оператора.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Только публичный список серверов
    Viewer,
    /// Полный список и изменение конфигурации
    Admin,
}

/// Claims JWT-токена оператора.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Экстрактор аутентифицированного оператора (любая роль).
pub struct AuthenticatedUser(pub UserClaims);

/// Экстрактор администратора.
pub struct AdminUser(pub UserClaims);

/// Агент с верным общим секретом.
pub struct AgentKey;

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        let claims = decode_token(token, &state.jwt_secret)?;
        Ok(AuthenticatedUser(claims))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if claims.role != Role::Admin {
            tracing::warn!("Оператор {} без прав администратора", claims.sub);
            return Err(AppError::Forbidden("Требуются права администратора".into()));
        }
        Ok(AdminUser(claims))
    }
}

impl FromRequestParts<AppState> for AgentKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        verify_agent_key(state.agent_api_key.as_deref(), provided)?;
        Ok(AgentKey)
    }
}

/// Проверить общий секрет агента.
/// Незаданный секрет на сервере: ошибка конфигурации, а не клиента.
pub fn verify_agent_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        tracing::error!("AGENT_API_KEY не задан, heartbeat отклонён");
        return Err(AppError::Misconfigured("AGENT_API_KEY не задан".into()));
    };

    let Some(provided) = provided.filter(|k| !k.is_empty()) else {
        return Err(AppError::MissingApiKey);
    };

    if provided != expected {
        tracing::warn!("Heartbeat с неверным API-ключом");
        return Err(AppError::InvalidApiKey);
    }

    Ok(())
}

/// Создать JWT-токен оператора (TTL 24 часа).
pub fn create_token(username: &str, role: Role, jwt_secret: &str) -> Result<String, AppError> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = UserClaims {
        sub: username.to_string(),
        role,
        exp: now + 24 * 3600,
        iat: now,
    };
    let key = jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("Ошибка создания токена: {e}")))
}

// ── Вспомогательные функции ──────────────────────────────────────────────────

fn extract_bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Отсутствует заголовок Authorization".into()))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Ожидается Bearer токен".into()))
}

fn decode_token(token: &str, jwt_secret: &str) -> Result<UserClaims, AppError> {
    let key = jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = jsonwebtoken::Validation::default();
    jsonwebtoken::decode::<UserClaims>(token, &key, &validation)
        .map(|d| d.claims)
        .map_err(|e| AppError::Unauthorized(format!("Невалидный токен: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_key_checks() {
        assert!(verify_agent_key(Some("secret"), Some("secret")).is_ok());
        assert!(matches!(
            verify_agent_key(Some("secret"), None),
            Err(AppError::MissingApiKey)
        ));
        assert!(matches!(
            verify_agent_key(Some("secret"), Some("other")),
            Err(AppError::InvalidApiKey)
        ));
        assert!(matches!(
            verify_agent_key(None, Some("secret")),
            Err(AppError::Misconfigured(_))
        ));
        assert!(matches!(
            verify_agent_key(Some(""), Some("")),
            Err(AppError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_token_round_trip_keeps_role() {
        let token = create_token("viewer", Role::Viewer, "jwt").unwrap();
        let claims = decode_token(&token, "jwt").unwrap();
        assert_eq!(claims.sub, "viewer");
        assert_eq!(claims.role, Role::Viewer);

        assert!(decode_token(&token, "other-secret").is_err());
    }
}
