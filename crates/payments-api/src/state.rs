use crate::config::ApiConfig;
use crate::repository::PaymentRepository;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub payments: Arc<dyn PaymentRepository>,
}

impl AppState {
    pub fn new(config: ApiConfig, payments: impl PaymentRepository + 'static) -> Self {
        Self {
            config: Arc::new(config),
            payments: Arc::new(payments),
        }
    }
}
