//! Фоновая очистка: перевод устаревших серверов в down и удаление давно молчащих.

use chrono::{DateTime, Duration, Utc};
use monitor_entities::servers::{ActiveModel, Column, Entity as ServerEntity, ServerStatus};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Период цикла очистки.
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Без heartbeat дольше этого: active → down.
pub const STALE_AFTER_MINUTES: i64 = 4;

/// Без heartbeat дольше этого: запись удаляется.
pub const PURGE_AFTER_DAYS: i64 = 30;

/// Итог одного цикла.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub marked_down: u64,
    pub purged: u64,
}

/// Цикл очистки до сигнала завершения.
/// Ошибка цикла логируется, следующий тик пробует снова.
pub async fn run_sweeper(db: DatabaseConnection, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown_rx.changed() => break,
        }

        match sweep_once(&db, Utc::now()).await {
            Ok(report) if report != SweepReport::default() => {
                tracing::info!(
                    "Очистка: {} серверов переведено в down, {} удалено",
                    report.marked_down,
                    report.purged
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Ошибка очистки реестра серверов: {e}"),
        }
    }

    tracing::info!("Очистка реестра остановлена");
}

/// Один цикл относительно момента `now`. Сначала down, затем удаление.
pub async fn sweep_once(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<SweepReport, DbErr> {
    let stale_before = now - Duration::minutes(STALE_AFTER_MINUTES);
    let marked_down = ServerEntity::update_many()
        .set(ActiveModel {
            status: Set(ServerStatus::Down),
            ..Default::default()
        })
        .filter(Column::Status.eq(ServerStatus::Active))
        .filter(Column::LastHeartbeat.lt(stale_before))
        .exec(db)
        .await?
        .rows_affected;

    // pinned зарезервирован: сейчас ни одна запись его не выставляет
    let purge_before = now - Duration::days(PURGE_AFTER_DAYS);
    let purged = ServerEntity::delete_many()
        .filter(Column::LastHeartbeat.lt(purge_before))
        .filter(Column::Pinned.eq(false))
        .exec(db)
        .await?
        .rows_affected;

    Ok(SweepReport {
        marked_down,
        purged,
    })
}
