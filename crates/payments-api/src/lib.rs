pub mod config;
pub mod cors;
pub mod db;
pub mod error;
pub mod jsonapi;
pub mod metrics;
pub mod model;
pub mod negotiation;
pub mod repository;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::ApiConfig;
pub use db::Database;
pub use error::ApiError;
pub use model::{Payment, PaymentAttributes, PaymentPatch};
pub use repository::{MemoryRepository, PaymentRepository};
pub use state::AppState;
