pub mod error;
pub mod market;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod training;

pub use routes::router;
pub use state::{AppState, BackgroundTasks};
