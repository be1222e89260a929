//! Точка входа сервера мониторинга флота.

use clap::Parser;
use monitor_server::config::{hash_password, random_secret, Account, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "monitor-server",
    about = "Fleet monitor: приём heartbeat агентов и статус серверов"
)]
struct Cli {
    /// Адрес для прослушивания (host:port)
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen: String,

    /// URL базы данных
    #[arg(
        long,
        default_value = "sqlite:./monitor.db?mode=rwc",
        env = "DATABASE_URL"
    )]
    db_url: String,

    /// Общий секрет агентов (заголовок X-API-Key)
    #[arg(long, env = "AGENT_API_KEY")]
    agent_api_key: Option<String>,

    /// Секрет JWT (случайный если не задан)
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Имя пользователя администратора
    #[arg(long, default_value = "admin")]
    admin_username: String,

    /// Пароль администратора
    #[arg(long, env = "ADMIN_PASSWORD")]
    admin_password: Option<String>,

    /// Имя пользователя наблюдателя (только публичный список)
    #[arg(long, env = "VIEWER_USERNAME")]
    viewer_username: Option<String>,

    /// Пароль наблюдателя
    #[arg(long, env = "VIEWER_PASSWORD")]
    viewer_password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логгера
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let jwt_secret = match cli.jwt_secret {
        Some(secret) => secret,
        None => random_secret()?,
    };

    let admin_password = cli.admin_password.unwrap_or_else(|| {
        tracing::warn!("Пароль администратора не задан, используется 'admin' (небезопасно!)");
        "admin".to_string()
    });

    let viewer = match (cli.viewer_username, cli.viewer_password) {
        (Some(username), Some(password)) => Some(Account {
            username,
            password_hash: hash_password(&password),
        }),
        (Some(username), None) => {
            anyhow::bail!("Для наблюдателя {username} не задан VIEWER_PASSWORD")
        }
        _ => None,
    };

    let config = ServerConfig {
        listen: cli.listen,
        db_url: cli.db_url,
        agent_api_key: cli.agent_api_key.filter(|k| !k.is_empty()),
        jwt_secret,
        admin: Account {
            username: cli.admin_username,
            password_hash: hash_password(&admin_password),
        },
        viewer,
    };

    monitor_server::run(config).await
}
