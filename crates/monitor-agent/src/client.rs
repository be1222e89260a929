//! HTTP-клиент отправки heartbeat на сервер мониторинга.

use crate::error::AgentError;
use monitor_types::{HeartbeatPayload, API_KEY_HEADER};
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub struct HeartbeatClient {
    http: Client,
    url: String,
    api_key: String,
}

impl HeartbeatClient {
    pub fn new(url: String, api_key: String) -> Result<Self, AgentError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, url, api_key })
    }

    /// Отправить heartbeat. Любой ответ кроме 2xx: heartbeat не засчитан.
    pub async fn send(&self, payload: &HeartbeatPayload) -> Result<(), AgentError> {
        let res = self
            .http
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }

        let body = res.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AgentError::Unauthorized(body));
        }
        Err(AgentError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use monitor_types::LoadStats;
    use serde_json::json;

    fn payload() -> HeartbeatPayload {
        HeartbeatPayload {
            ip: "198.51.100.4".into(),
            hostname: "edge-4".into(),
            country_code: "SE".into(),
            country: "Sweden".into(),
            region: "Stockholm".into(),
            city: "Stockholm".into(),
            services: vec![],
            load: LoadStats {
                cpu: 3.5,
                ram: 20.0,
                net: 0.5,
            },
        }
    }

    #[tokio::test]
    async fn test_send_heartbeat_with_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/heartbeat")
                    .header("X-API-Key", "agent-key")
                    .json_body_partial(r#"{"ip":"198.51.100.4","load":{"cpu":3.5}}"#);
                then.status(200).json_body(json!({ "status": "ok" }));
            })
            .await;

        let client =
            HeartbeatClient::new(server.url("/api/v1/heartbeat"), "agent-key".into()).unwrap();
        client.send(&payload()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/heartbeat");
                then.status(401)
                    .json_body(json!({ "error": "invalid", "code": "invalid_api_key" }));
            })
            .await;

        let client = HeartbeatClient::new(server.url("/api/v1/heartbeat"), "bad".into()).unwrap();
        let result = client.send(&payload()).await;

        assert!(matches!(result, Err(AgentError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/heartbeat");
                then.status(500).body("db down");
            })
            .await;

        let client = HeartbeatClient::new(server.url("/api/v1/heartbeat"), "key".into()).unwrap();
        let result = client.send(&payload()).await;

        assert!(matches!(
            result,
            Err(AgentError::UnexpectedStatus { status: 500, .. })
        ));
    }
}
