//! Конфигурация агента и идентичность хоста (адрес + геоданные).

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Сервис systemd и его короткий код в heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub unit: String,
    pub code: String,
}

impl std::str::FromStr for ServiceUnit {
    type Err = String;

    /// Формат: "unit=code", например "wg-quick@wg0=wg".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((unit, code)) if !unit.is_empty() && !code.is_empty() => Ok(ServiceUnit {
                unit: unit.to_string(),
                code: code.to_string(),
            }),
            _ => Err(format!("Ожидается unit=code, получено: {s}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// URL приёма heartbeat
    pub api_url: String,

    /// Общий секрет (заголовок X-API-Key)
    pub api_key: String,

    /// Файл с сохранённой идентичностью хоста
    pub identity_file: PathBuf,

    /// URL сервиса геолокации по IP
    pub geo_lookup_url: String,

    /// Период отправки усреднённой нагрузки
    pub report_interval: Duration,

    /// Период снятия одного замера
    pub sample_interval: Duration,

    pub services: Vec<ServiceUnit>,

    /// Пропускная способность канала для расчёта загрузки сети
    pub link_speed_mbps: u64,

    /// Интерфейс для замера сети (по умолчанию все, кроме lo)
    pub iface: Option<String>,
}

/// Адрес и геоданные хоста, определяются один раз.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostIdentity {
    pub ip: String,
    pub country_code: String,
    pub country: String,
    pub region: String,
    pub city: String,
}

/// Ответ ip-api.com/json.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoLookupResponse {
    query: Option<String>,
    country_code: Option<String>,
    country: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
}

impl GeoLookupResponse {
    fn into_identity(self) -> Result<HostIdentity, AgentError> {
        let ip = self
            .query
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AgentError::GeoLookup("в ответе нет адреса".into()))?;
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "Unknown".to_string());

        Ok(HostIdentity {
            ip,
            country_code: self.country_code.unwrap_or_else(|| "UN".to_string()),
            country: or_unknown(self.country),
            region: or_unknown(self.region_name),
            city: or_unknown(self.city),
        })
    }
}

/// Прочитать идентичность из файла, либо определить и сохранить.
pub async fn load_or_init_identity(
    path: &Path,
    lookup_url: &str,
) -> Result<HostIdentity, AgentError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => return Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(AgentError::IdentityIo {
                path: path.display().to_string(),
                source,
            })
        }
    }

    tracing::info!("Файл идентичности не найден, определяю адрес через {lookup_url}");
    let identity = lookup_identity(lookup_url).await?;

    let json = serde_json::to_vec_pretty(&identity)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| AgentError::IdentityIo {
            path: path.display().to_string(),
            source,
        })?;

    Ok(identity)
}

async fn lookup_identity(lookup_url: &str) -> Result<HostIdentity, AgentError> {
    let res = reqwest::get(lookup_url).await?;
    if !res.status().is_success() {
        return Err(AgentError::GeoLookup(format!("статус {}", res.status())));
    }
    res.json::<GeoLookupResponse>().await?.into_identity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parse_service_unit() {
        let unit: ServiceUnit = "wg-quick@wg0=wg".parse().unwrap();
        assert_eq!(unit.unit, "wg-quick@wg0");
        assert_eq!(unit.code, "wg");

        assert!("squid".parse::<ServiceUnit>().is_err());
        assert!("=sq".parse::<ServiceUnit>().is_err());
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("monitor-agent-{}-{name}.json", std::process::id()))
    }

    #[tokio::test]
    async fn test_identity_fetched_and_persisted() {
        let server = MockServer::start_async().await;
        let lookup = server
            .mock_async(|when, then| {
                when.method(GET).path("/json/");
                then.status(200).json_body(json!({
                    "status": "success",
                    "query": "203.0.113.7",
                    "countryCode": "FI",
                    "country": "Finland",
                    "regionName": "Uusimaa",
                    "city": "Helsinki"
                }));
            })
            .await;

        let path = temp_path("fetch");
        let _ = std::fs::remove_file(&path);

        let identity = load_or_init_identity(&path, &server.url("/json/")).await.unwrap();
        assert_eq!(identity.ip, "203.0.113.7");
        assert_eq!(identity.region, "Uusimaa");

        // Второй запуск читает файл, без обращения к сервису
        let again = load_or_init_identity(&path, &server.url("/json/")).await.unwrap();
        assert_eq!(again, identity);
        lookup.assert_hits_async(1).await;

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_lookup_without_address_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/json/");
                then.status(200).json_body(json!({ "status": "fail" }));
            })
            .await;

        let path = temp_path("fail");
        let _ = std::fs::remove_file(&path);

        let result = load_or_init_identity(&path, &server.url("/json/")).await;
        assert!(matches!(result, Err(AgentError::GeoLookup(_))));
        assert!(!path.exists());
    }
}
