use sea_orm_migration::prelude::*;

/// Read-mostly dashboard tables. They are populated by seed scripts and only ever
/// read by the dashboard, so they carry no foreign keys to `accounts`.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Signals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Signals::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Signals::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(Signals::Direction).string_len(10).not_null()) // "buy", "sell", "hold"
                    .col(ColumnDef::new(Signals::Confidence).double().not_null().default(0.0))
                    .col(ColumnDef::new(Signals::EntryPrice).double().null())
                    .col(ColumnDef::new(Signals::StopLoss).double().null())
                    .col(ColumnDef::new(Signals::TakeProfit).double().null())
                    .col(ColumnDef::new(Signals::ModelId).integer().null())
                    .col(ColumnDef::new(Signals::Status).string_len(20).not_null().default("pending")) // "pending", "executed", "expired"
                    .col(ColumnDef::new(Signals::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TradeJournal::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TradeJournal::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(TradeJournal::AccountId).integer().null())
                    .col(ColumnDef::new(TradeJournal::Ticket).big_integer().null())
                    .col(ColumnDef::new(TradeJournal::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(TradeJournal::TradeType).string_len(10).not_null()) // "buy", "sell"
                    .col(ColumnDef::new(TradeJournal::Volume).double().not_null())
                    .col(ColumnDef::new(TradeJournal::EntryPrice).double().not_null())
                    .col(ColumnDef::new(TradeJournal::ExitPrice).double().null())
                    .col(ColumnDef::new(TradeJournal::StopLoss).double().null())
                    .col(ColumnDef::new(TradeJournal::TakeProfit).double().null())
                    .col(ColumnDef::new(TradeJournal::Profit).double().null())
                    .col(ColumnDef::new(TradeJournal::Comment).text().null())
                    .col(ColumnDef::new(TradeJournal::Status).string_len(20).not_null().default("open")) // "open", "closed"
                    .col(ColumnDef::new(TradeJournal::OpenedAt).timestamp().not_null())
                    .col(ColumnDef::new(TradeJournal::ClosedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DrawdownHistory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DrawdownHistory::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(DrawdownHistory::AccountId).integer().null())
                    .col(ColumnDef::new(DrawdownHistory::Equity).double().not_null())
                    .col(ColumnDef::new(DrawdownHistory::PeakEquity).double().not_null())
                    .col(ColumnDef::new(DrawdownHistory::DrawdownPct).double().not_null())
                    .col(ColumnDef::new(DrawdownHistory::RecordedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PerformanceMetrics::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PerformanceMetrics::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(PerformanceMetrics::AccountId).integer().null())
                    .col(ColumnDef::new(PerformanceMetrics::Period).string_len(20).not_null()) // "daily", "weekly", "monthly"
                    .col(ColumnDef::new(PerformanceMetrics::TotalTrades).integer().not_null().default(0))
                    .col(ColumnDef::new(PerformanceMetrics::WinRate).double().not_null().default(0.0))
                    .col(ColumnDef::new(PerformanceMetrics::ProfitFactor).double().not_null().default(0.0))
                    .col(ColumnDef::new(PerformanceMetrics::SharpeRatio).double().null())
                    .col(ColumnDef::new(PerformanceMetrics::MaxDrawdown).double().not_null().default(0.0))
                    .col(ColumnDef::new(PerformanceMetrics::NetProfit).double().not_null().default(0.0))
                    .col(ColumnDef::new(PerformanceMetrics::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NewsItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NewsItems::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(NewsItems::Headline).text().not_null())
                    .col(ColumnDef::new(NewsItems::Source).string_len(100).null())
                    .col(ColumnDef::new(NewsItems::Impact).string_len(10).not_null().default("low")) // "low", "medium", "high"
                    .col(ColumnDef::new(NewsItems::Currency).string_len(10).null())
                    .col(ColumnDef::new(NewsItems::PublishedAt).timestamp().not_null())
                    .col(ColumnDef::new(NewsItems::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RiskLimits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RiskLimits::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(RiskLimits::AccountId).integer().null())
                    .col(ColumnDef::new(RiskLimits::MaxRiskPerTrade).double().not_null().default(0.02))
                    .col(ColumnDef::new(RiskLimits::MaxPositions).integer().not_null().default(3))
                    .col(ColumnDef::new(RiskLimits::MaxDailyLoss).double().not_null().default(0.05))
                    .col(ColumnDef::new(RiskLimits::MaxDrawdown).double().not_null().default(0.10))
                    .col(ColumnDef::new(RiskLimits::MinMarginLevel).double().not_null().default(200.0))
                    .col(ColumnDef::new(RiskLimits::MinLotSize).double().not_null().default(0.01))
                    .col(ColumnDef::new(RiskLimits::MaxLotSize).double().not_null().default(10.0))
                    .col(ColumnDef::new(RiskLimits::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AutoTradingConfig::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AutoTradingConfig::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(AutoTradingConfig::AccountId).integer().null())
                    .col(ColumnDef::new(AutoTradingConfig::Enabled).boolean().not_null().default(false))
                    .col(ColumnDef::new(AutoTradingConfig::Symbol).string_len(20).not_null().default("XAUUSD"))
                    .col(ColumnDef::new(AutoTradingConfig::Timeframe).string_len(10).not_null().default("1h"))
                    .col(ColumnDef::new(AutoTradingConfig::LotSize).double().not_null().default(0.01))
                    .col(ColumnDef::new(AutoTradingConfig::DefaultSlPoints).double().not_null().default(10.0))
                    .col(ColumnDef::new(AutoTradingConfig::DefaultTpPoints).double().not_null().default(20.0))
                    .col(ColumnDef::new(AutoTradingConfig::PriceCheckInterval).integer().not_null().default(5)) // seconds
                    .col(ColumnDef::new(AutoTradingConfig::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AutoTradingConfig::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RiskLimits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NewsItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PerformanceMetrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DrawdownHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TradeJournal::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Signals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Signals {
    Table,
    Id,
    Symbol,
    Direction,
    Confidence,
    EntryPrice,
    StopLoss,
    TakeProfit,
    ModelId,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TradeJournal {
    Table,
    Id,
    AccountId,
    Ticket,
    Symbol,
    TradeType,
    Volume,
    EntryPrice,
    ExitPrice,
    StopLoss,
    TakeProfit,
    Profit,
    Comment,
    Status,
    OpenedAt,
    ClosedAt,
}

#[derive(DeriveIden)]
enum DrawdownHistory {
    Table,
    Id,
    AccountId,
    Equity,
    PeakEquity,
    DrawdownPct,
    RecordedAt,
}

#[derive(DeriveIden)]
enum PerformanceMetrics {
    Table,
    Id,
    AccountId,
    Period,
    TotalTrades,
    WinRate,
    ProfitFactor,
    SharpeRatio,
    MaxDrawdown,
    NetProfit,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NewsItems {
    Table,
    Id,
    Headline,
    Source,
    Impact,
    Currency,
    PublishedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RiskLimits {
    Table,
    Id,
    AccountId,
    MaxRiskPerTrade,
    MaxPositions,
    MaxDailyLoss,
    MaxDrawdown,
    MinMarginLevel,
    MinLotSize,
    MaxLotSize,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AutoTradingConfig {
    Table,
    Id,
    AccountId,
    Enabled,
    Symbol,
    Timeframe,
    LotSize,
    DefaultSlPoints,
    DefaultTpPoints,
    PriceCheckInterval,
    UpdatedAt,
}
