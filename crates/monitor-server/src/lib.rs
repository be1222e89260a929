//! Ядро сервера мониторинга флота: приём heartbeat, список серверов, очистка.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod services;


use api::AppState;
use cache::MemoryCache;
use config::ServerConfig;
use monitor_migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Запустить сервер мониторинга.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    // 1. Подключение к БД
    info!("Подключение к базе данных: {}", config.db_url);
    let db: DatabaseConnection = Database::connect(&config.db_url).await?;

    // 2. Автоматические миграции
    info!("Выполнение миграций...");
    Migrator::up(&db, None).await?;

    if config.agent_api_key.is_none() {
        tracing::warn!("AGENT_API_KEY не задан: все heartbeat будут отклонены");
    }

    // 3. Состояние приложения
    let state = AppState {
        db: db.clone(),
        cache: Arc::new(MemoryCache::new()),
        agent_api_key: config.agent_api_key.clone(),
        jwt_secret: config.jwt_secret.clone(),
        admin: config.admin.clone(),
        viewer: config.viewer.clone(),
        rate_limiter: api::rate_limit::RateLimiter::new(10, Duration::from_secs(60)),
    };

    // 4. Маршрутизатор
    let app = api::build_router(state);

    // 5. Graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Получен сигнал завершения, останавливаю сервер...");
        let _ = shutdown_tx_clone.send(true);
    });

    // 6. Фоновая очистка устаревших серверов
    let sweeper = tokio::spawn(services::sweeper_service::run_sweeper(
        db.clone(),
        shutdown_rx.clone(),
    ));

    // 7. Запуск сервера
    let addr: SocketAddr = config.listen.parse()?;
    info!("Сервер мониторинга запущен на {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let mut server_shutdown = shutdown_rx;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        while !*server_shutdown.borrow_and_update() {
            if server_shutdown.changed().await.is_err() {
                break;
            }
        }
    })
    .await?;

    // 8. Остановка очистки и закрытие соединений
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!("Задача очистки завершилась с ошибкой: {e}");
    }
    db.close().await?;

    info!("Сервер мониторинга остановлен");
    Ok(())
}
