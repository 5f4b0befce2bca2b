use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use prometheus::{Encoder, TextEncoder};

use crate::metrics::REGISTRY;
use crate::state::AppState;

/// GET /health - Health check endpoint
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let mut response = serde_json::json!({
        "status": "ok",
        "service": "payments-api",
        "version": env!("CARGO_PKG_VERSION"),
    });

    match state.payments.count() {
        Ok(count) => {
            response["storage_status"] = serde_json::json!("ok");
            response["payments"] = serde_json::json!(count);
        }
        Err(e) => {
            tracing::warn!("Health check could not reach payment storage: {}", e);
            response["status"] = serde_json::json!("degraded");
            response["storage_status"] = serde_json::json!("degraded");
        }
    }

    if response["status"] == "degraded" {
        HttpResponse::ServiceUnavailable().json(response)
    } else {
        HttpResponse::Ok().json(response)
    }
}

/// Constant-time byte comparison that does not leak input lengths.
/// Both inputs are hashed to fixed-length digests before comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use sha2::{Digest, Sha256};
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    let mut result = 0u8;
    for (x, y) in ha.iter().zip(hb.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// GET /metrics - Prometheus text exposition, gated by METRICS_TOKEN when set
pub async fn metrics(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(ref expected) = state.config.metrics_token {
        let authorized = bearer_token(&req)
            .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()));

        if !authorized {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "unauthorized",
                "message": "Valid Bearer token required for /metrics"
            }));
        }
    }

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().body("Failed to encode metrics");
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::repository::MemoryRepository;
    use actix_web::{test as actix_test, App};
    use serde_json::Value;

    fn state(metrics_token: Option<&str>) -> web::Data<AppState> {
        let config = ApiConfig {
            metrics_token: metrics_token.map(String::from),
            ..Default::default()
        };
        web::Data::new(AppState::new(config, MemoryRepository::new()))
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"token", b"token"));
        assert!(!constant_time_eq(b"token", b"other"));
        assert!(!constant_time_eq(b"token", b"token-longer"));
    }

    #[actix_web::test]
    async fn test_health_reports_payment_count() {
        let app =
            actix_test::init_service(App::new().app_data(state(None)).configure(configure)).await;
        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["payments"], 0);
    }

    #[actix_web::test]
    async fn test_metrics_requires_token_when_configured() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(Some("s3cret")))
                .configure(configure),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/metrics").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let req = actix_test::TestRequest::get()
            .uri("/metrics")
            .insert_header(("Authorization", "Bearer s3cret"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
