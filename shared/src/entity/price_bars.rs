//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

use crate::models::HistoricalBar;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "price_bars")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub symbol: String,
    pub timeframe: String, // "1m", "5m", "15m", "30m", "1h", "4h", "1d"
    pub time: DateTimeUtc,
    #[sea_orm(column_type = "Double")]
    pub open: f64,
    #[sea_orm(column_type = "Double")]
    pub high: f64,
    #[sea_orm(column_type = "Double")]
    pub low: f64,
    #[sea_orm(column_type = "Double")]
    pub close: f64,
    pub tick_volume: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for HistoricalBar {
    fn from(bar: Model) -> Self {
        HistoricalBar {
            time: bar.time,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            tick_volume: bar.tick_volume,
        }
    }
}
