//! Точка входа агента мониторинга.

use clap::Parser;
use monitor_agent::config::{AgentConfig, ServiceUnit};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "monitor-agent",
    about = "Fleet monitor agent: замеры нагрузки и отправка heartbeat"
)]
struct Cli {
    /// URL приёма heartbeat
    #[arg(
        long,
        env = "API_URL",
        default_value = "http://localhost:8000/api/v1/heartbeat"
    )]
    api_url: String,

    /// Общий секрет агентов
    #[arg(long, env = "AGENT_API_KEY")]
    api_key: String,

    /// Файл с адресом и геоданными хоста
    #[arg(long, default_value = "/usr/local/bin/agent/agent_config.json")]
    identity_file: PathBuf,

    /// Сервис геолокации по IP
    #[arg(long, default_value = "http://ip-api.com/json/")]
    geo_lookup_url: String,

    /// Период отправки heartbeat, секунды
    #[arg(long, default_value_t = 120)]
    report_interval: u64,

    /// Период замеров, секунды
    #[arg(long, default_value_t = 30)]
    sample_interval: u64,

    /// Сервис в формате unit=code (можно несколько раз)
    #[arg(
        long = "service",
        default_values = ["wg-quick@wg0=wg", "openvpn@server=ov", "squid=sq", "x-ui=vr"]
    )]
    services: Vec<ServiceUnit>,

    /// Пропускная способность канала, Мбит/с
    #[arg(long, default_value_t = 1000)]
    link_speed_mbps: u64,

    /// Сетевой интерфейс для замера (по умолчанию все, кроме lo)
    #[arg(long)]
    iface: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.api_key.is_empty() {
        anyhow::bail!("AGENT_API_KEY не задан");
    }
    if cli.sample_interval == 0 {
        anyhow::bail!("--sample-interval должен быть больше нуля");
    }

    let config = AgentConfig {
        api_url: cli.api_url,
        api_key: cli.api_key,
        identity_file: cli.identity_file,
        geo_lookup_url: cli.geo_lookup_url,
        report_interval: Duration::from_secs(cli.report_interval),
        sample_interval: Duration::from_secs(cli.sample_interval),
        services: cli.services,
        link_speed_mbps: cli.link_speed_mbps,
        iface: cli.iface,
    };

    monitor_agent::run(config).await
}
