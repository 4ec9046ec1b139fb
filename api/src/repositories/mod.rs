pub mod account_repository;
pub mod model_repository;
pub mod system_status_repository;

pub use account_repository::AccountRepository;
pub use model_repository::ModelRepository;
pub use system_status_repository::SystemStatusRepository;
