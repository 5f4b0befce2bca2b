use actix_web::http::header;
use actix_web::middleware::from_fn;
use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::jsonapi::{self, RequestDocument};
use crate::metrics::{PAYMENTS_CREATED, PAYMENTS_DELETED, PAYMENTS_UPDATED, VALIDATION_FAILURES};
use crate::model::{Payment, PaymentAttributes, PaymentPatch};
use crate::negotiation::require_jsonapi;
use crate::state::AppState;
use crate::validation::validate_payment;

/// Request bodies larger than this are rejected
const MAX_BODY_BYTES: usize = 1024 * 1024;

fn validated(
    attributes: &PaymentAttributes,
    previous: Option<&PaymentAttributes>,
) -> Result<(), ApiError> {
    validate_payment(attributes, previous).inspect_err(|e| {
        VALIDATION_FAILURES.inc();
        tracing::debug!("Rejected payment write: {}", e);
    })
}

/// GET /payments - List all payments
pub async fn list_payments(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let payments = state.payments.list()?;

    Ok(jsonapi::respond(
        &mut HttpResponse::Ok(),
        &jsonapi::collection(&payments),
    ))
}

/// GET /payments/{id} - Get a single payment
pub async fn get_payment(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let payment = state
        .payments
        .find(&id)?
        .ok_or_else(|| ApiError::NotFound(id.clone()))?;

    Ok(jsonapi::respond(
        &mut HttpResponse::Ok(),
        &jsonapi::single(&payment),
    ))
}

/// POST /payments - Create a payment
pub async fn create_payment(
    body: web::Json<RequestDocument<PaymentAttributes>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let attributes = body.into_inner().into_attributes(None)?;
    validated(&attributes, None)?;

    let payment = Payment::new(attributes);
    state.payments.insert(&payment)?;

    PAYMENTS_CREATED.inc();
    tracing::info!(id = %payment.id, "Payment created");

    let location = format!("/payments/{}", payment.id);
    Ok(jsonapi::respond(
        HttpResponse::Created().insert_header((header::LOCATION, location)),
        &jsonapi::single(&payment),
    ))
}

/// PATCH /payments/{id} - Partially update a payment
pub async fn update_payment(
    path: web::Path<String>,
    body: web::Json<RequestDocument<PaymentPatch>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    // Check payment exists
    let mut payment = state
        .payments
        .find(&id)?
        .ok_or_else(|| ApiError::NotFound(id.clone()))?;

    let patch = body.into_inner().into_attributes(Some(&id))?;
    let previous = payment.attributes.clone();
    patch.apply_to(&mut payment.attributes);
    validated(&payment.attributes, Some(&previous))?;

    payment.updated_at = chrono::Utc::now();
    state.payments.update(&payment)?;

    PAYMENTS_UPDATED.inc();
    tracing::info!(id = %payment.id, "Payment updated");

    Ok(jsonapi::respond(
        &mut HttpResponse::Ok(),
        &jsonapi::single(&payment),
    ))
}

/// DELETE /payments/{id} - Permanently remove a payment
pub async fn delete_payment(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    state.payments.delete(&id)?;

    PAYMENTS_DELETED.inc();
    tracing::info!(id = %id, "Payment deleted");

    Ok(HttpResponse::NoContent().finish())
}

/// Malformed or oversized bodies become JSON:API 400 documents.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .wrap(from_fn(require_jsonapi))
            .app_data(json_config())
            .service(
                web::resource("")
                    .route(web::get().to(list_payments))
                    .route(web::post().to(create_payment)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_payment))
                    .route(web::patch().to(update_payment))
                    .route(web::delete().to(delete_payment)),
            ),
    );
}
