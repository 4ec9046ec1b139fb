use std::sync::Arc;

use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::{ActiveValue, QueryOrder};
use shared::entity::system_status;
use shared::validation::ToggleInput;
use shared::SystemStatusView;

pub struct SystemStatusRepository {
    db: Arc<DatabaseConnection>,
}

impl SystemStatusRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The current status is whichever snapshot was inserted last.
    pub async fn latest(&self) -> Result<Option<system_status::Model>, DbErr> {
        system_status::Entity::find()
            .order_by_desc(system_status::Column::Id)
            .one(self.db.as_ref())
            .await
    }

    /// Appends a snapshot derived from `previous`. The MT5 connection and degraded
    /// flags are owned by the bridge process and always carried forward.
    pub async fn append_toggle(
        &self,
        previous: &SystemStatusView,
        toggle: &ToggleInput,
    ) -> Result<system_status::Model, DbErr> {
        let now = Utc::now();
        system_status::ActiveModel {
            mt5_connected: ActiveValue::Set(previous.mt5_connected),
            degraded_mode: ActiveValue::Set(previous.degraded_mode),
            ai_active: ActiveValue::Set(toggle.ai_active.unwrap_or(previous.ai_active)),
            risk_monitor_active: ActiveValue::Set(
                toggle.risk_monitor_active.unwrap_or(previous.risk_monitor_active),
            ),
            last_heartbeat: ActiveValue::Set(now),
            created_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
    }
}
