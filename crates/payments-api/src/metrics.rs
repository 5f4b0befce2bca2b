use prometheus::{IntCounter, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Lifecycle counters
pub static PAYMENTS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("payments_created_total", "Total number of payments created").unwrap()
});

pub static PAYMENTS_UPDATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("payments_updated_total", "Total number of payments updated").unwrap()
});

pub static PAYMENTS_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("payments_deleted_total", "Total number of payments deleted").unwrap()
});

// Rejections
pub static VALIDATION_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "payments_validation_failures_total",
        "Writes rejected by attribute validation",
    )
    .unwrap()
});

pub static UNSUPPORTED_MEDIA_TYPE: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "payments_unsupported_media_type_total",
        "Requests rejected for a missing JSON:API Accept header",
    )
    .unwrap()
});

/// Register all metrics with the registry
pub fn register_metrics() {
    REGISTRY
        .register(Box::new(PAYMENTS_CREATED.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(PAYMENTS_UPDATED.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(PAYMENTS_DELETED.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(VALIDATION_FAILURES.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(UNSUPPORTED_MEDIA_TYPE.clone()))
        .unwrap();
}
