pub mod accounts;
pub mod ai_models;
pub mod audit_logs;
pub mod price_bars;
pub mod system_status;
pub mod training_jobs;
