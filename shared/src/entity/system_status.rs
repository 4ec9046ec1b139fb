//! `SeaORM` Entity, @generated manually
//!
//! Rows are only ever inserted; the current status is the row with the highest id.

use sea_orm::entity::prelude::*;

use crate::models::SystemStatusView;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "system_status")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub mt5_connected: bool,
    pub ai_active: bool,
    pub risk_monitor_active: bool,
    pub degraded_mode: bool,
    pub last_heartbeat: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SystemStatusView {
    fn from(row: Model) -> Self {
        SystemStatusView {
            id: Some(row.id),
            mt5_connected: row.mt5_connected,
            ai_active: row.ai_active,
            risk_monitor_active: row.risk_monitor_active,
            degraded_mode: row.degraded_mode,
            last_heartbeat: Some(row.last_heartbeat),
        }
    }
}
