//! Общие типы протокола heartbeat: агент ↔ сервер мониторинга.

use serde::{Deserialize, Serialize};

/// Заголовок с общим секретом агента.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Состояние одного сервиса на хосте.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Короткий код сервиса (например "wg")
    pub name: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Нагрузка хоста в процентах (0–100).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadStats {
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub ram: f64,
    #[serde(default)]
    pub net: f64,
}

/// Heartbeat от агента. Никогда не содержит полей конфигурации.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    /// Сетевой адрес: ключ записи сервера
    pub ip: String,
    #[serde(default = "unknown")]
    pub hostname: String,
    #[serde(default = "unknown_country_code")]
    pub country_code: String,
    #[serde(default = "unknown")]
    pub country: String,
    #[serde(default = "unknown")]
    pub region: String,
    #[serde(default = "unknown")]
    pub city: String,
    pub services: Vec<ServiceStatus>,
    #[serde(default)]
    pub load: LoadStats,
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn unknown_country_code() -> String {
    "UN".to_string()
}

/// Округление до двух знаков, как принято для процентов нагрузки.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_defaults() {
        let payload: HeartbeatPayload =
            serde_json::from_str(r#"{"ip":"10.0.0.1","services":[]}"#).unwrap();

        assert_eq!(payload.hostname, "Unknown");
        assert_eq!(payload.country_code, "UN");
        assert_eq!(payload.city, "Unknown");
        assert_eq!(payload.load, LoadStats::default());
    }

    #[test]
    fn test_payload_camel_case() {
        let payload: HeartbeatPayload = serde_json::from_str(
            r#"{"ip":"1.2.3.4","countryCode":"DE","services":[{"name":"wg","active":true}],
                "load":{"cpu":12.5,"ram":40.0,"net":1.25}}"#,
        )
        .unwrap();

        assert_eq!(payload.country_code, "DE");
        assert_eq!(payload.services[0].details, None);
        assert_eq!(payload.load.cpu, 12.5);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round2(0.0), 0.0);
    }
}
