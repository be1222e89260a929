//! Маршруты флота: список серверов, карточка, конфигурация, статистика.

use crate::api::middleware::{AdminUser, AuthenticatedUser, Role};
use crate::api::AppState;
use crate::error::AppError;
use crate::services::fleet_service::{self, ConfigPatch, Visibility};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use monitor_entities::servers::{Model, ServerStatus};
use monitor_types::{LoadStats, ServiceStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, alias = "allServers")]
    pub all_servers: bool,
}

/// Строка списка серверов. Поля администратора скрыты в публичном режиме.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRow {
    pub server_id: String,
    pub ip: String,
    pub hostname: String,
    pub country_code: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub services: Vec<ServiceStatus>,
    pub load: LoadStats,
    pub status: ServerStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub gaming: bool,
    pub streaming: bool,
    pub paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_heartbeat: Option<DateTime<Utc>>,
}

impl ServerRow {
    fn new(s: Model, visibility: Visibility) -> Self {
        let admin = visibility == Visibility::Administrative;
        Self {
            server_id: s.server_id,
            ip: s.ip,
            hostname: s.hostname,
            country_code: s.country_code,
            country: s.country,
            region: s.region,
            city: s.city,
            services: s.services.0,
            load: LoadStats {
                cpu: s.cpu,
                ram: s.ram,
                net: s.net,
            },
            status: s.status,
            last_heartbeat: s.last_heartbeat,
            gaming: s.gaming,
            streaming: s.streaming,
            paid: s.paid,
            enabled: admin.then_some(s.enabled),
            pinned: admin.then_some(s.pinned),
            first_heartbeat: admin.then_some(s.first_heartbeat),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResponse {
    pub status: &'static str,
    pub updated_fields: fleet_service::AppliedConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total: u64,
    pub active: u64,
    pub down: u64,
    pub enabled: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/servers", get(list_servers))
        .route("/servers/{ip}", get(get_server))
        .route("/servers/{ip}/config", patch(update_config))
        .route("/stats", get(get_stats))
}

/// GET /api/v1/servers?all_servers=true: по умолчанию только active и enabled.
async fn list_servers(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ServerRow>>, AppError> {
    let visibility = if query.all_servers {
        if claims.role != Role::Admin {
            return Err(AppError::Forbidden(
                "Полный список доступен только администратору".into(),
            ));
        }
        Visibility::Administrative
    } else {
        Visibility::Public
    };

    let servers = fleet_service::list_servers(&state.db, visibility).await?;
    let rows = servers
        .into_iter()
        .map(|s| ServerRow::new(s, visibility))
        .collect();

    Ok(Json(rows))
}

/// GET /api/v1/servers/{ip}: карточка сервера (требует admin JWT).
async fn get_server(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(ip): Path<String>,
) -> Result<Json<ServerRow>, AppError> {
    let server = fleet_service::get_server(&state.db, state.cache.as_ref(), &ip).await?;
    Ok(Json(ServerRow::new(server, Visibility::Administrative)))
}

/// PATCH /api/v1/servers/{ip}/config: частичное изменение конфигурации.
async fn update_config(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(ip): Path<String>,
    body: Result<Json<ConfigPatch>, JsonRejection>,
) -> Result<Json<PatchResponse>, AppError> {
    let Json(patch) = body?;
    let applied =
        fleet_service::patch_config(&state.db, state.cache.as_ref(), &ip, &patch).await?;
    tracing::info!("Оператор {} изменил конфигурацию {ip}", claims.sub);

    Ok(Json(PatchResponse {
        status: "updated",
        updated_fields: applied,
    }))
}

/// GET /api/v1/stats: статистика флота (требует admin JWT).
async fn get_stats(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = fleet_service::get_stats(&state.db).await?;

    Ok(Json(StatsResponse {
        total: stats.total,
        active: stats.active,
        down: stats.down,
        enabled: stats.enabled,
    }))
}
