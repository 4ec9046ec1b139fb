//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "models")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub provider: String,
    pub version: String,
    #[sea_orm(column_type = "Text")]
    pub hyperparameters: String, // JSON document
    pub status: String, // "training", "trained", "failed", "active", "standby"
    #[sea_orm(column_type = "Double", nullable)]
    pub accuracy: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub metrics: Option<String>, // JSON document, set once training finishes
    pub symbol: String,
    pub timeframe: String,
    pub training_started_at: Option<DateTimeUtc>,
    pub training_completed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::training_jobs::Entity")]
    TrainingJobs,
}

impl Related<super::training_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrainingJobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
