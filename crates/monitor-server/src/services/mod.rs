//! Бизнес-логика поверх БД и кэша.

pub mod cache_view;
pub mod fleet_service;
pub mod heartbeat_service;
pub mod sweeper_service;
