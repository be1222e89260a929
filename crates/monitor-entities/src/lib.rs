//! Сущности SeaORM сервера мониторинга.

pub mod servers;
