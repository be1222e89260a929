//! Entity для таблицы servers: одна запись на сетевой адрес.

use monitor_types::ServiceStatus;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Состояние живости сервера. Удаление записи: неявное терминальное состояние.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "down")]
    Down,
}

/// Список сервисов, хранится как JSON-массив.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ServiceList(pub Vec<ServiceStatus>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "servers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Сетевой адрес сервера (ключ)
    #[sea_orm(primary_key, auto_increment = false)]
    pub ip: String,

    /// Идентификатор, выдаётся один раз при первом heartbeat
    pub server_id: String,

    pub hostname: String,
    pub country_code: String,
    pub country: String,
    pub region: String,
    pub city: String,

    #[sea_orm(column_type = "Json")]
    pub services: ServiceList,

    /// Нагрузка в процентах, перезаписывается целиком каждым heartbeat
    pub cpu: f64,
    pub ram: f64,
    pub net: f64,

    pub status: ServerStatus,
    pub first_heartbeat: DateTimeUtc,
    pub last_heartbeat: DateTimeUtc,

    // Конфигурация оператора: heartbeat её не трогает
    pub gaming: bool,
    pub streaming: bool,
    pub paid: bool,
    pub enabled: bool,

    /// Зарезервировано: закреплённые записи не удаляются очисткой
    pub pinned: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Значения конфигурации для новой записи.
pub const DEFAULT_GAMING: bool = false;
pub const DEFAULT_STREAMING: bool = false;
pub const DEFAULT_PAID: bool = true;
pub const DEFAULT_ENABLED: bool = true;
