pub mod audit;
pub mod config;
pub mod database;
pub mod entity;
pub mod models;
pub mod validation;

pub use audit::{AuditEntry, AuditLogger};
pub use config::Config;
pub use database::{connect_with_options, get_db_connection};
pub use models::*;
