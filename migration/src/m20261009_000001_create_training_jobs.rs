use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrainingJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TrainingJobs::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(TrainingJobs::ModelId).integer().not_null())
                    .col(ColumnDef::new(TrainingJobs::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(TrainingJobs::Timeframe).string_len(10).not_null())
                    .col(ColumnDef::new(TrainingJobs::BarsUsed).integer().not_null().default(0))
                    .col(ColumnDef::new(TrainingJobs::Status).string_len(20).not_null().default("queued")) // "queued", "running", "completed", "failed", "cancelled"
                    .col(ColumnDef::new(TrainingJobs::RunAfter).timestamp().not_null())
                    .col(ColumnDef::new(TrainingJobs::Error).text().null())
                    .col(ColumnDef::new(TrainingJobs::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(TrainingJobs::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_training_jobs_model")
                            .from(TrainingJobs::Table, TrainingJobs::ModelId)
                            .to(Models::Table, Models::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_training_jobs_status")
                    .table(TrainingJobs::Table)
                    .col(TrainingJobs::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrainingJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TrainingJobs {
    Table,
    Id,
    ModelId,
    Symbol,
    Timeframe,
    BarsUsed,
    Status,
    RunAfter,
    Error,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Models {
    Table,
    Id,
}
