//! HTTP API and worker host for Tabularium.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::Config;
pub use errors::{AppError, AppResult};
pub use routes::create_router;
pub use state::AppState;
