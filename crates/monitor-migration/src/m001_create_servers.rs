//! Миграция: создание таблицы servers.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_create_servers"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Servers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Servers::Ip).string().not_null().primary_key())
                    .col(ColumnDef::new(Servers::ServerId).string().not_null())
                    .col(ColumnDef::new(Servers::Hostname).string().not_null())
                    .col(ColumnDef::new(Servers::CountryCode).string().not_null())
                    .col(ColumnDef::new(Servers::Country).string().not_null())
                    .col(ColumnDef::new(Servers::Region).string().not_null())
                    .col(ColumnDef::new(Servers::City).string().not_null())
                    .col(ColumnDef::new(Servers::Services).json().not_null())
                    .col(ColumnDef::new(Servers::Cpu).double().not_null().default(0.0))
                    .col(ColumnDef::new(Servers::Ram).double().not_null().default(0.0))
                    .col(ColumnDef::new(Servers::Net).double().not_null().default(0.0))
                    .col(
                        ColumnDef::new(Servers::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Servers::FirstHeartbeat)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Servers::LastHeartbeat)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Servers::Gaming).boolean().not_null().default(false))
                    .col(ColumnDef::new(Servers::Streaming).boolean().not_null().default(false))
                    .col(ColumnDef::new(Servers::Paid).boolean().not_null().default(true))
                    .col(ColumnDef::new(Servers::Enabled).boolean().not_null().default(true))
                    .col(ColumnDef::new(Servers::Pinned).boolean().not_null().default(false))
                    .to_owned(),
            )
            .await?;

        // server_id генерируется случайно и не обязан быть уникальным
        manager
            .create_index(
                Index::create()
                    .table(Servers::Table)
                    .col(Servers::ServerId)
                    .name("idx_servers_server_id")
                    .to_owned(),
            )
            .await?;

        // Очистка фильтрует по last_heartbeat каждую минуту
        manager
            .create_index(
                Index::create()
                    .table(Servers::Table)
                    .col(Servers::LastHeartbeat)
                    .name("idx_servers_last_heartbeat")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Servers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Servers {
    Table,
    Ip,
    ServerId,
    Hostname,
    CountryCode,
    Country,
    Region,
    City,
    Services,
    Cpu,
    Ram,
    Net,
    Status,
    FirstHeartbeat,
    LastHeartbeat,
    Gaming,
    Streaming,
    Paid,
    Enabled,
    Pinned,
}
