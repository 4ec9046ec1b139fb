use std::sync::Arc;

use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue, QueryOrder};
use shared::entity::ai_models;
use shared::validation::TrainRequest;
use shared::{ModelStatus, TrainingMetrics};

pub struct ModelRepository {
    db: Arc<DatabaseConnection>,
}

impl ModelRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<ai_models::Model>, DbErr> {
        ai_models::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
    }

    pub async fn list_all(&self) -> Result<Vec<ai_models::Model>, DbErr> {
        ai_models::Entity::find()
            .order_by_desc(ai_models::Column::CreatedAt)
            .order_by_desc(ai_models::Column::Id)
            .all(self.db.as_ref())
            .await
    }

    /// Inserts a model in `training` status. Takes any connection so the caller can
    /// pair it with the job row inside one transaction.
    pub async fn insert_training<C>(
        db: &C,
        request: &TrainRequest,
        hyperparameters: &serde_json::Value,
    ) -> Result<ai_models::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        ai_models::ActiveModel {
            name: ActiveValue::Set(request.name.clone()),
            provider: ActiveValue::Set(request.provider.clone()),
            version: ActiveValue::Set(request.version.clone()),
            hyperparameters: ActiveValue::Set(hyperparameters.to_string()),
            status: ActiveValue::Set(ModelStatus::Training.to_string()),
            accuracy: ActiveValue::Set(None),
            metrics: ActiveValue::Set(None),
            symbol: ActiveValue::Set(request.symbol.clone()),
            timeframe: ActiveValue::Set(request.timeframe.to_string()),
            training_started_at: ActiveValue::Set(Some(now)),
            training_completed_at: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// training -> trained. Returns false when the model already left `training`
    /// (cancelled or failed in the meantime).
    pub async fn mark_trained(&self, id: i32, metrics: &TrainingMetrics) -> Result<bool, DbErr> {
        let now = Utc::now();
        let result = ai_models::Entity::update_many()
            .col_expr(ai_models::Column::Status, Expr::value(ModelStatus::Trained.as_str()))
            .col_expr(ai_models::Column::Accuracy, Expr::value(metrics.accuracy))
            .col_expr(ai_models::Column::Metrics, Expr::value(metrics.to_json().to_string()))
            .col_expr(ai_models::Column::TrainingCompletedAt, Expr::value(now))
            .col_expr(ai_models::Column::UpdatedAt, Expr::value(now))
            .filter(ai_models::Column::Id.eq(id))
            .filter(ai_models::Column::Status.eq(ModelStatus::Training.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// training -> failed, same guard as [`Self::mark_trained`].
    pub async fn mark_failed(&self, id: i32) -> Result<bool, DbErr> {
        let now = Utc::now();
        let result = ai_models::Entity::update_many()
            .col_expr(ai_models::Column::Status, Expr::value(ModelStatus::Failed.as_str()))
            .col_expr(ai_models::Column::TrainingCompletedAt, Expr::value(now))
            .col_expr(ai_models::Column::UpdatedAt, Expr::value(now))
            .filter(ai_models::Column::Id.eq(id))
            .filter(ai_models::Column::Status.eq(ModelStatus::Training.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }
}
