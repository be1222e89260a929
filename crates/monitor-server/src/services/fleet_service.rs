//! Флот серверов: списки, карточка сервера, статистика, изменение конфигурации.

use crate::cache::ServerCache;
use crate::error::AppError;
use crate::services::cache_view;
use monitor_entities::servers::{
    ActiveModel, Column, Entity as ServerEntity, Model, ServerStatus, DEFAULT_ENABLED,
    DEFAULT_GAMING, DEFAULT_PAID, DEFAULT_STREAMING,
};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Поля конфигурации оператора (имена в JSON).
pub const CONFIG_FIELDS: [&str; 4] = ["gaming", "streaming", "paid", "enabled"];

/// Режим выборки списка серверов.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// status = active И enabled = true
    Public,
    /// Без фильтра
    Administrative,
}

impl Visibility {
    fn condition(self) -> Condition {
        match self {
            Visibility::Public => Condition::all()
                .add(Column::Status.eq(ServerStatus::Active))
                .add(Column::Enabled.eq(true)),
            Visibility::Administrative => Condition::all(),
        }
    }
}

/// Получить список серверов в заданном режиме (по адресу).
pub async fn list_servers(
    db: &DatabaseConnection,
    visibility: Visibility,
) -> Result<Vec<Model>, AppError> {
    let servers = ServerEntity::find()
        .filter(visibility.condition())
        .order_by_asc(Column::Ip)
        .all(db)
        .await?;
    Ok(servers)
}

/// Получить сервер по адресу.
///
/// Источник истины для прямого чтения: БД. Кэш не подменяет ответ
/// (очистка меняет статус только в БД), а прогревается полной записью,
/// чтобы последующие heartbeat сохраняли в нём конфигурацию.
pub async fn get_server(
    db: &DatabaseConnection,
    cache: &dyn ServerCache,
    ip: &str,
) -> Result<Model, AppError> {
    let record = ServerEntity::find_by_id(ip.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Сервер не найден: {ip}")))?;

    if let Some(fields) = cache_view::to_object(&record) {
        let existing = cache_view::read_object(cache, ip).await;
        cache_view::write_object(cache, ip, cache_view::merge(existing, fields)).await;
    }

    Ok(record)
}

/// Статистика флота.
pub struct Stats {
    pub total: u64,
    pub active: u64,
    pub down: u64,
    pub enabled: u64,
}

/// Получить статистику по серверам.
pub async fn get_stats(db: &DatabaseConnection) -> Result<Stats, AppError> {
    let total = ServerEntity::find().count(db).await?;
    let active = ServerEntity::find()
        .filter(Column::Status.eq(ServerStatus::Active))
        .count(db)
        .await?;
    let down = ServerEntity::find()
        .filter(Column::Status.eq(ServerStatus::Down))
        .count(db)
        .await?;
    let enabled = ServerEntity::find()
        .filter(Column::Enabled.eq(true))
        .count(db)
        .await?;

    // Счётчики из разных запросов не согласованы между собой
    Ok(Stats {
        total,
        active,
        down,
        enabled,
    })
}

// ── Частичное обновление конфигурации ────────────────────────────────────────

/// Изменение одного поля: отсутствует, сброс к значению по умолчанию (null), значение.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    Absent,
    Reset,
    Value(T),
}

impl FieldUpdate<bool> {
    fn resolve(self, default: bool) -> Option<bool> {
        match self {
            FieldUpdate::Absent => None,
            FieldUpdate::Reset => Some(default),
            FieldUpdate::Value(v) => Some(v),
        }
    }
}

/// Поле присутствует в JSON: `null` → сброс, иначе значение.
fn present<'de, D>(deserializer: D) -> Result<FieldUpdate<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<bool>::deserialize(deserializer)? {
        Some(v) => FieldUpdate::Value(v),
        None => FieldUpdate::Reset,
    })
}

/// Запрос на изменение конфигурации сервера.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPatch {
    #[serde(default, deserialize_with = "present")]
    pub gaming: FieldUpdate<bool>,
    #[serde(default, deserialize_with = "present")]
    pub streaming: FieldUpdate<bool>,
    #[serde(default, deserialize_with = "present")]
    pub paid: FieldUpdate<bool>,
    #[serde(default, deserialize_with = "present")]
    pub enabled: FieldUpdate<bool>,
}

/// Фактически применённые поля.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaming: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl AppliedConfig {
    pub fn is_empty(&self) -> bool {
        self.gaming.is_none()
            && self.streaming.is_none()
            && self.paid.is_none()
            && self.enabled.is_none()
    }

    fn active_model(&self) -> ActiveModel {
        let mut model = ActiveModel::default();
        if let Some(v) = self.gaming {
            model.gaming = Set(v);
        }
        if let Some(v) = self.streaming {
            model.streaming = Set(v);
        }
        if let Some(v) = self.paid {
            model.paid = Set(v);
        }
        if let Some(v) = self.enabled {
            model.enabled = Set(v);
        }
        model
    }
}

impl ConfigPatch {
    pub fn resolve(&self) -> AppliedConfig {
        AppliedConfig {
            gaming: self.gaming.resolve(DEFAULT_GAMING),
            streaming: self.streaming.resolve(DEFAULT_STREAMING),
            paid: self.paid.resolve(DEFAULT_PAID),
            enabled: self.enabled.resolve(DEFAULT_ENABLED),
        }
    }
}

/// Применить конфигурацию к серверу.
///
/// БД обновляется обязательно, кэш: только если запись в нём есть.
pub async fn patch_config(
    db: &DatabaseConnection,
    cache: &dyn ServerCache,
    ip: &str,
    patch: &ConfigPatch,
) -> Result<AppliedConfig, AppError> {
    let applied = patch.resolve();
    if applied.is_empty() {
        return Err(AppError::BadRequest("Нет полей для обновления".into()));
    }

    let result = ServerEntity::update_many()
        .set(applied.active_model())
        .filter(Column::Ip.eq(ip))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Сервер не найден: {ip}")));
    }

    if let Some(cached) = cache_view::read_object(cache, ip).await {
        if let Some(fields) = cache_view::to_object(&applied) {
            cache_view::write_object(cache, ip, cache_view::merge(Some(cached), fields)).await;
        }
    }

    tracing::info!("Конфигурация сервера {ip} обновлена: {applied:?}");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_distinguishes_absent_and_null() {
        let patch: ConfigPatch =
            serde_json::from_str(r#"{"gaming": true, "paid": null}"#).unwrap();

        assert_eq!(patch.gaming, FieldUpdate::Value(true));
        assert_eq!(patch.paid, FieldUpdate::Reset);
        assert_eq!(patch.streaming, FieldUpdate::Absent);

        let applied = patch.resolve();
        assert_eq!(applied.gaming, Some(true));
        assert_eq!(applied.paid, Some(DEFAULT_PAID));
        assert_eq!(applied.streaming, None);
        assert_eq!(applied.enabled, None);
    }

    #[test]
    fn test_explicit_false_is_applied() {
        let patch: ConfigPatch = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert_eq!(patch.resolve().enabled, Some(false));
    }

    #[test]
    fn test_patch_rejects_heartbeat_fields() {
        let result = serde_json::from_str::<ConfigPatch>(r#"{"status": "down"}"#);
        assert!(result.is_err(), "Поля heartbeat нельзя менять через конфигурацию");
    }

    #[test]
    fn test_applied_serializes_only_present_fields() {
        let applied = AppliedConfig {
            streaming: Some(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&applied).unwrap(),
            serde_json::json!({ "streaming": true })
        );
    }
}
