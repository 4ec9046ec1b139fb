pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_accounts_and_audit_logs;
mod m20261001_000002_create_models_and_system_status;
mod m20261002_000001_create_trading_reference_tables;
mod m20261008_000001_create_price_bars;
mod m20261009_000001_create_training_jobs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_accounts_and_audit_logs::Migration),
            Box::new(m20261001_000002_create_models_and_system_status::Migration),
            Box::new(m20261002_000001_create_trading_reference_tables::Migration),
            Box::new(m20261008_000001_create_price_bars::Migration),
            Box::new(m20261009_000001_create_training_jobs::Migration),
        ]
    }
}
