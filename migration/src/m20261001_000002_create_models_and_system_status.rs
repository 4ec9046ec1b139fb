use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Models::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Models::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Models::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Models::Provider).string_len(50).not_null())
                    .col(ColumnDef::new(Models::Version).string_len(50).not_null())
                    .col(ColumnDef::new(Models::Hyperparameters).text().not_null()) // JSON document
                    .col(ColumnDef::new(Models::Status).string_len(20).not_null().default("training")) // "training", "trained", "failed", "active", "standby"
                    .col(ColumnDef::new(Models::Accuracy).double().null())
                    .col(ColumnDef::new(Models::Metrics).text().null()) // JSON document
                    .col(ColumnDef::new(Models::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(Models::Timeframe).string_len(10).not_null())
                    .col(ColumnDef::new(Models::TrainingStartedAt).timestamp().null())
                    .col(ColumnDef::new(Models::TrainingCompletedAt).timestamp().null())
                    .col(ColumnDef::new(Models::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Models::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SystemStatus::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SystemStatus::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(SystemStatus::Mt5Connected).boolean().not_null().default(false))
                    .col(ColumnDef::new(SystemStatus::AiActive).boolean().not_null().default(false))
                    .col(ColumnDef::new(SystemStatus::RiskMonitorActive).boolean().not_null().default(false))
                    .col(ColumnDef::new(SystemStatus::DegradedMode).boolean().not_null().default(false))
                    .col(ColumnDef::new(SystemStatus::LastHeartbeat).timestamp().not_null())
                    .col(ColumnDef::new(SystemStatus::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SystemStatus::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Models::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Models {
    Table,
    Id,
    Name,
    Provider,
    Version,
    Hyperparameters,
    Status,
    Accuracy,
    Metrics,
    Symbol,
    Timeframe,
    TrainingStartedAt,
    TrainingCompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SystemStatus {
    Table,
    Id,
    #[sea_orm(iden = "mt5_connected")]
    Mt5Connected,
    AiActive,
    RiskMonitorActive,
    DegradedMode,
    LastHeartbeat,
    CreatedAt,
}
