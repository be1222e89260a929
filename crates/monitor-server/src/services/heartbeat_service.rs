//! Приём heartbeat: идемпотентный upsert в БД и обновление кэша.

use crate::cache::ServerCache;
use crate::error::AppError;
use crate::services::cache_view;
use chrono::{DateTime, Utc};
use monitor_entities::servers::{
    ActiveModel, Column, Entity as ServerEntity, ServerStatus, ServiceList, DEFAULT_ENABLED,
    DEFAULT_GAMING, DEFAULT_PAID, DEFAULT_STREAMING,
};
use monitor_types::{HeartbeatPayload, ServiceStatus};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait};
use serde::Serialize;
use uuid::Uuid;

/// Колонки, которые heartbeat перезаписывает у существующей записи.
/// Конфигурация, server_id и first_heartbeat сюда не входят.
const HEARTBEAT_COLUMNS: [Column; 11] = [
    Column::Hostname,
    Column::CountryCode,
    Column::Country,
    Column::Region,
    Column::City,
    Column::Services,
    Column::Cpu,
    Column::Ram,
    Column::Net,
    Column::Status,
    Column::LastHeartbeat,
];

/// Поля heartbeat в кэше. Имена совпадают с сериализацией `servers::Model`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HeartbeatFields<'a> {
    ip: &'a str,
    hostname: &'a str,
    country_code: &'a str,
    country: &'a str,
    region: &'a str,
    city: &'a str,
    services: &'a [ServiceStatus],
    cpu: f64,
    ram: f64,
    net: f64,
    status: ServerStatus,
    last_heartbeat: DateTime<Utc>,
}

impl<'a> HeartbeatFields<'a> {
    fn new(ip: &'a str, payload: &'a HeartbeatPayload, now: DateTime<Utc>) -> Self {
        Self {
            ip,
            hostname: &payload.hostname,
            country_code: &payload.country_code,
            country: &payload.country,
            region: &payload.region,
            city: &payload.city,
            services: &payload.services,
            cpu: payload.load.cpu,
            ram: payload.load.ram,
            net: payload.load.net,
            status: ServerStatus::Active,
            last_heartbeat: now,
        }
    }
}

/// Принять heartbeat.
///
/// Адрес берётся без окружающих пробелов: это ключ и записи, и кэша.
/// Ошибка БД возвращается вызывающему (heartbeat не засчитан, кэш не трогается).
/// Ошибки кэша только логируются.
pub async fn ingest_heartbeat(
    db: &DatabaseConnection,
    cache: &dyn ServerCache,
    payload: &HeartbeatPayload,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let ip = payload.ip.trim();
    if ip.is_empty() {
        return Err(AppError::BadRequest("ip обязателен".into()));
    }

    let cached = cache_view::read_object(cache, ip).await;

    upsert_record(db, ip, payload, now).await?;

    if let Some(fields) = cache_view::to_object(&HeartbeatFields::new(ip, payload, now)) {
        let merged = cache_view::merge(cached, fields);
        cache_view::write_object(cache, ip, merged).await;
    }

    tracing::debug!(
        "Heartbeat: {} ({}), cpu {}%, ram {}%, net {}%",
        ip,
        payload.hostname,
        payload.load.cpu,
        payload.load.ram,
        payload.load.net
    );
    Ok(())
}

/// Атомарный upsert по адресу: при вставке генерируется server_id,
/// first_heartbeat и конфигурация по умолчанию, при конфликте
/// обновляются только колонки heartbeat.
async fn upsert_record(
    db: &DatabaseConnection,
    ip: &str,
    payload: &HeartbeatPayload,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let model = ActiveModel {
        ip: Set(ip.to_string()),
        server_id: Set(generate_server_id()),
        hostname: Set(payload.hostname.clone()),
        country_code: Set(payload.country_code.clone()),
        country: Set(payload.country.clone()),
        region: Set(payload.region.clone()),
        city: Set(payload.city.clone()),
        services: Set(ServiceList(payload.services.clone())),
        cpu: Set(payload.load.cpu),
        ram: Set(payload.load.ram),
        net: Set(payload.load.net),
        status: Set(ServerStatus::Active),
        first_heartbeat: Set(now),
        last_heartbeat: Set(now),
        gaming: Set(DEFAULT_GAMING),
        streaming: Set(DEFAULT_STREAMING),
        paid: Set(DEFAULT_PAID),
        enabled: Set(DEFAULT_ENABLED),
        pinned: Set(false),
    };

    ServerEntity::insert(model)
        .on_conflict(
            OnConflict::column(Column::Ip)
                .update_columns(HEARTBEAT_COLUMNS)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// Идентификатор вида "srv-1a2b3c4d".
fn generate_server_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("srv-{}", &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fleet_service::CONFIG_FIELDS;

    #[test]
    fn test_server_id_format() {
        let id = generate_server_id();
        assert!(id.starts_with("srv-"));
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_heartbeat_fields_disjoint_from_config() {
        let payload = HeartbeatPayload {
            ip: "10.0.0.1".into(),
            hostname: "vpn-1".into(),
            country_code: "DE".into(),
            country: "Germany".into(),
            region: "Hesse".into(),
            city: "Frankfurt".into(),
            services: vec![],
            load: Default::default(),
        };

        let names = cache_view::to_object(&HeartbeatFields::new("10.0.0.1", &payload, Utc::now())).unwrap();
        assert!(names.contains_key("lastHeartbeat"));
        for field in CONFIG_FIELDS {
            assert!(
                !names.contains_key(field),
                "Heartbeat не должен писать поле конфигурации {field}"
            );
        }
    }
}
