//! Агент мониторинга: замеры нагрузки хоста и периодическая отправка heartbeat.

pub mod client;
pub mod config;
pub mod error;
pub mod sampler;
pub mod window;

use client::HeartbeatClient;
use config::{AgentConfig, HostIdentity};
use monitor_types::{HeartbeatPayload, LoadStats};
use sampler::{LoadSampler, SysinfoSampler};
use tokio::time::MissedTickBehavior;
use tracing::info;
use window::LoadWindow;

/// Запустить агент до Ctrl-C.
pub async fn run(config: AgentConfig) -> anyhow::Result<()> {
    let identity = config::load_or_init_identity(&config.identity_file, &config.geo_lookup_url).await?;
    info!("Агент запущен для IP: {}", identity.ip);

    let client = HeartbeatClient::new(config.api_url.clone(), config.api_key.clone())?;
    let hostname = sysinfo::System::host_name().unwrap_or_else(|| "Unknown".to_string());
    let mut sampler = SysinfoSampler::new(config.iface.clone(), config.link_speed_mbps);

    // Первый heartbeat сразу: для CPU ещё нет базы замера
    let initial = LoadStats {
        cpu: 0.0,
        ..sampler.sample()
    };
    report(&client, &config, &identity, &hostname, initial).await;

    let mut window = LoadWindow::default();
    let mut ticker = tokio::time::interval(config.sample_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Получен сигнал завершения, агент остановлен");
                return Ok(());
            }
        }

        window.push(sampler.sample());

        if window.is_due(config.sample_interval, config.report_interval) {
            let load = window.drain();
            report(&client, &config, &identity, &hostname, load).await;
        }
    }
}

/// Собрать и отправить heartbeat. Ошибки только логируются: следующее окно повторит отправку.
async fn report(
    client: &HeartbeatClient,
    config: &AgentConfig,
    identity: &HostIdentity,
    hostname: &str,
    load: LoadStats,
) {
    let services = sampler::service_statuses(&config.services).await;
    let payload = build_payload(identity, hostname, services, load);

    info!("Отправка heartbeat... нагрузка CPU: {}%", load.cpu);
    match client.send(&payload).await {
        Ok(()) => tracing::debug!("Heartbeat принят"),
        Err(error::AgentError::Unauthorized(body)) => {
            tracing::error!("Ошибка аутентификации, проверьте AGENT_API_KEY: {body}")
        }
        Err(e) => tracing::warn!("Heartbeat не отправлен: {e}"),
    }
}

pub fn build_payload(
    identity: &HostIdentity,
    hostname: &str,
    services: Vec<monitor_types::ServiceStatus>,
    load: LoadStats,
) -> HeartbeatPayload {
    HeartbeatPayload {
        ip: identity.ip.clone(),
        hostname: hostname.to_string(),
        country_code: identity.country_code.clone(),
        country: identity.country.clone(),
        region: identity.region.clone(),
        city: identity.city.clone(),
        services,
        load,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_payload_uses_identity() {
        let identity = HostIdentity {
            ip: "192.0.2.10".into(),
            country_code: "JP".into(),
            country: "Japan".into(),
            region: "Tokyo".into(),
            city: "Tokyo".into(),
        };

        let payload = build_payload(&identity, "node-10", vec![], LoadStats::default());

        assert_eq!(payload.ip, "192.0.2.10");
        assert_eq!(payload.hostname, "node-10");
        assert_eq!(payload.country_code, "JP");
        assert!(payload.services.is_empty());
    }
}
