//! HTTP API: маршрутизация и состояние приложения.

pub mod auth_routes;
pub mod fleet_routes;
pub mod heartbeat_routes;
pub mod middleware;
pub mod rate_limit;

use crate::cache::ServerCache;
use crate::config::Account;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rate_limit::RateLimiter;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Общее состояние приложения: соединения с хранилищами и секреты.
/// Создаётся один раз при старте и передаётся всем обработчикам.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cache: Arc<dyn ServerCache>,
    pub agent_api_key: Option<String>,
    pub jwt_secret: String,
    pub admin: Account,
    pub viewer: Option<Account>,
    pub rate_limiter: RateLimiter,
}

/// Построить маршрутизатор Axum.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Перебор паролей ограничивается по IP
    let limiter = state.rate_limiter.clone();
    let auth_routes = auth_routes::routes().layer(axum::middleware::from_fn(move |req, next| {
        let limiter = limiter.clone();
        rate_limit::rate_limit_middleware(limiter, req, next)
    }));

    let api_routes = Router::new()
        .merge(heartbeat_routes::routes())
        .merge(fleet_routes::routes());

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health: проверка работоспособности сервера.
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = state.db.execute_unprepared("SELECT 1").await.is_ok();
    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "error" },
        "database": db_ok,
        "service": "monitor-server"
    }))
}
