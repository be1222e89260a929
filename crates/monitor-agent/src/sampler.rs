//! Замеры нагрузки хоста (sysinfo) и состояния сервисов (systemctl).

use crate::config::ServiceUnit;
use monitor_types::{round2, LoadStats, ServiceStatus};
use std::time::Instant;
use sysinfo::{Networks, System};
use tokio::process::Command;

/// Источник мгновенных замеров нагрузки.
pub trait LoadSampler {
    fn sample(&mut self) -> LoadStats;
}

pub struct SysinfoSampler {
    system: System,
    networks: Networks,
    last_network_refresh: Instant,
    iface: Option<String>,
    link_speed_mbps: u64,
}

impl SysinfoSampler {
    pub fn new(iface: Option<String>, link_speed_mbps: u64) -> Self {
        let mut system = System::new();
        // Первый замер CPU нужен как база для следующего
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
            last_network_refresh: Instant::now(),
            iface,
            link_speed_mbps,
        }
    }

    fn cpu_percent(&mut self) -> f64 {
        self.system.refresh_cpu_usage();
        round2(f64::from(self.system.global_cpu_usage()))
    }

    fn ram_percent(&mut self) -> f64 {
        self.system.refresh_memory();
        percent(self.system.used_memory(), self.system.total_memory())
    }

    fn net_percent(&mut self) -> f64 {
        self.networks.refresh(true);
        let elapsed = self.last_network_refresh.elapsed().as_secs_f64();
        self.last_network_refresh = Instant::now();

        let bytes: u64 = self
            .networks
            .iter()
            .filter(|(name, _)| match &self.iface {
                Some(iface) => *name == iface,
                None => name.as_str() != "lo",
            })
            .map(|(_, data)| data.received() + data.transmitted())
            .sum();

        utilization_percent(bytes, elapsed, self.link_speed_mbps)
    }
}

impl LoadSampler for SysinfoSampler {
    fn sample(&mut self) -> LoadStats {
        LoadStats {
            cpu: self.cpu_percent(),
            ram: self.ram_percent(),
            net: self.net_percent(),
        }
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(used as f64 / total as f64 * 100.0)
}

/// Загрузка канала: байты за интервал против пропускной способности.
pub fn utilization_percent(bytes: u64, elapsed_secs: f64, link_speed_mbps: u64) -> f64 {
    if elapsed_secs <= 0.0 || link_speed_mbps == 0 {
        return 0.0;
    }
    let bits_per_sec = bytes as f64 * 8.0 / elapsed_secs;
    let capacity = link_speed_mbps as f64 * 1_000_000.0;
    round2(bits_per_sec / capacity * 100.0)
}

/// Активен ли сервис systemd. Без systemctl сервис считается неактивным.
pub async fn service_active(unit: &str) -> bool {
    match Command::new("systemctl").arg("is-active").arg(unit).output().await {
        Ok(output) => String::from_utf8_lossy(&output.stdout).trim() == "active",
        Err(e) => {
            tracing::debug!("systemctl недоступен для {unit}: {e}");
            false
        }
    }
}

/// Состояние всех настроенных сервисов.
pub async fn service_statuses(services: &[ServiceUnit]) -> Vec<ServiceStatus> {
    let mut statuses = Vec::with_capacity(services.len());
    for service in services {
        statuses.push(ServiceStatus {
            name: service.code.clone(),
            active: service_active(&service.unit).await,
            details: None,
        });
    }
    statuses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization_percent() {
        // 12.5 МБ/с = 100 Мбит/с на канале 1 Гбит/с
        assert_eq!(utilization_percent(12_500_000, 1.0, 1000), 10.0);
        assert_eq!(utilization_percent(1_000, 0.0, 1000), 0.0);
        assert_eq!(utilization_percent(1_000, 1.0, 0), 0.0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 3), 33.33);
        assert_eq!(percent(5, 0), 0.0);
    }

    #[test]
    fn test_sysinfo_sample_in_range() {
        let mut sampler = SysinfoSampler::new(None, 1000);
        let load = sampler.sample();

        assert!((0.0..=100.0).contains(&load.ram));
        assert!(load.cpu >= 0.0);
        assert!(load.net >= 0.0);
    }

    #[tokio::test]
    async fn test_unknown_service_is_inactive() {
        let statuses = service_statuses(&[ServiceUnit {
            unit: "monitor-agent-test-missing.service".into(),
            code: "zz".into(),
        }])
        .await;

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].name, "zz");
        assert!(!statuses[0].active);
    }
}
