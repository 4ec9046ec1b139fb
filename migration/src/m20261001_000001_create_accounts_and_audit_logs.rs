use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Accounts::Broker).string_len(100).not_null())
                    .col(ColumnDef::new(Accounts::Server).string_len(100).not_null())
                    .col(ColumnDef::new(Accounts::Login).string_len(50).not_null())
                    .col(ColumnDef::new(Accounts::Alias).string_len(100).null())
                    .col(ColumnDef::new(Accounts::Balance).double().not_null().default(0.0))
                    .col(ColumnDef::new(Accounts::Equity).double().not_null().default(0.0))
                    .col(ColumnDef::new(Accounts::MarginLevel).double().not_null().default(0.0))
                    .col(ColumnDef::new(Accounts::Status).string_len(20).not_null().default("disconnected")) // "connected", "disconnected"
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Backstop for the upsert existence check
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_identity")
                    .table(Accounts::Table)
                    .col(Accounts::Broker)
                    .col(Accounts::Server)
                    .col(Accounts::Login)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_created")
                    .table(Accounts::Table)
                    .col(Accounts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuditLogs::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(AuditLogs::Timestamp).timestamp().not_null())
                    .col(ColumnDef::new(AuditLogs::Category).string_len(50).not_null()) // "account", "model", "system"
                    .col(ColumnDef::new(AuditLogs::Action).string_len(100).not_null())
                    .col(ColumnDef::new(AuditLogs::Details).text().not_null())
                    .col(ColumnDef::new(AuditLogs::RefType).string_len(50).null())
                    .col(ColumnDef::new(AuditLogs::RefId).integer().null())
                    .col(ColumnDef::new(AuditLogs::Level).string_len(10).not_null().default("info")) // "info", "error"
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_logs_category_timestamp")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::Category)
                    .col(AuditLogs::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Broker,
    Server,
    Login,
    Alias,
    Balance,
    Equity,
    MarginLevel,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    Timestamp,
    Category,
    Action,
    Details,
    RefType,
    RefId,
    Level,
}
