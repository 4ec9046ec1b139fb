use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PriceBars::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PriceBars::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(PriceBars::Symbol).string_len(20).not_null()) // "XAUUSD"
                    .col(ColumnDef::new(PriceBars::Timeframe).string_len(10).not_null()) // "1m", "1h", "1d", etc.
                    .col(ColumnDef::new(PriceBars::Time).timestamp().not_null())
                    .col(ColumnDef::new(PriceBars::Open).double().not_null())
                    .col(ColumnDef::new(PriceBars::High).double().not_null())
                    .col(ColumnDef::new(PriceBars::Low).double().not_null())
                    .col(ColumnDef::new(PriceBars::Close).double().not_null())
                    .col(ColumnDef::new(PriceBars::TickVolume).big_integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_price_bars_symbol_timeframe_time")
                    .table(PriceBars::Table)
                    .col(PriceBars::Symbol)
                    .col(PriceBars::Timeframe)
                    .col(PriceBars::Time)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceBars::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PriceBars {
    Table,
    Id,
    Symbol,
    Timeframe,
    Time,
    Open,
    High,
    Low,
    Close,
    TickVolume,
}
