use std::sync::RwLock;

use crate::error::ApiError;
use crate::model::Payment;

/// Storage capability the payment handlers depend on.
///
/// `update` and `delete` fail with [`ApiError::NotFound`] when no payment has
/// the given id.
pub trait PaymentRepository: Send + Sync {
    /// All payments in insertion order.
    fn list(&self) -> Result<Vec<Payment>, ApiError>;

    fn find(&self, id: &str) -> Result<Option<Payment>, ApiError>;

    fn insert(&self, payment: &Payment) -> Result<(), ApiError>;

    /// Overwrite every stored attribute of an existing payment.
    fn update(&self, payment: &Payment) -> Result<(), ApiError>;

    /// Hard delete.
    fn delete(&self, id: &str) -> Result<(), ApiError>;

    fn count(&self) -> Result<usize, ApiError>;
}

/// In-process payment store, used for tests and `STORAGE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryRepository {
    payments: RwLock<Vec<Payment>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> ApiError {
    ApiError::Internal("payment store lock poisoned".to_string())
}

impl PaymentRepository for MemoryRepository {
    fn list(&self) -> Result<Vec<Payment>, ApiError> {
        Ok(self.payments.read().map_err(poisoned)?.clone())
    }

    fn find(&self, id: &str) -> Result<Option<Payment>, ApiError> {
        let payments = self.payments.read().map_err(poisoned)?;
        Ok(payments.iter().find(|p| p.id == id).cloned())
    }

    fn insert(&self, payment: &Payment) -> Result<(), ApiError> {
        let mut payments = self.payments.write().map_err(poisoned)?;
        if payments.iter().any(|p| p.id == payment.id) {
            return Err(ApiError::Conflict(format!(
                "payment '{}' already exists",
                payment.id
            )));
        }
        payments.push(payment.clone());
        Ok(())
    }

    fn update(&self, payment: &Payment) -> Result<(), ApiError> {
        let mut payments = self.payments.write().map_err(poisoned)?;
        let stored = payments
            .iter_mut()
            .find(|p| p.id == payment.id)
            .ok_or_else(|| ApiError::NotFound(payment.id.clone()))?;
        stored.attributes = payment.attributes.clone();
        stored.updated_at = payment.updated_at;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut payments = self.payments.write().map_err(poisoned)?;
        let index = payments
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        payments.remove(index);
        Ok(())
    }

    fn count(&self) -> Result<usize, ApiError> {
        Ok(self.payments.read().map_err(poisoned)?.len())
    }
}
