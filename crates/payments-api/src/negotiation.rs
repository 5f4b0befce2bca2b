//! Accept-header gate for the JSON:API resource routes.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderMap, ACCEPT};
use actix_web::middleware::Next;
use actix_web::ResponseError;

use crate::error::ApiError;
use crate::jsonapi::JSONAPI_MEDIA_TYPE;
use crate::metrics::UNSUPPORTED_MEDIA_TYPE;

/// True when any media range in the `Accept` header(s) is the JSON:API media
/// type with a non-zero quality. Other parameters are ignored; wildcards do
/// not count.
pub fn accepts_jsonapi(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(is_acceptable_jsonapi_range)
}

fn is_acceptable_jsonapi_range(range: &str) -> bool {
    let mut parts = range.split(';');
    let essence = parts.next().unwrap_or("").trim();
    if !essence.eq_ignore_ascii_case(JSONAPI_MEDIA_TYPE) {
        return false;
    }

    // q=0 means "not acceptable"
    !parts.any(|param| match param.split_once('=') {
        Some((name, value)) if name.trim().eq_ignore_ascii_case("q") => value
            .trim()
            .parse::<f32>()
            .map_or(false, |q| q <= 0.0),
        _ => false,
    })
}

/// Middleware: answer 415 before any handler runs unless the client accepts
/// JSON:API.
pub async fn require_jsonapi(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<EitherBody<impl MessageBody>>, actix_web::Error> {
    if accepts_jsonapi(req.headers()) {
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    }

    UNSUPPORTED_MEDIA_TYPE.inc();
    tracing::debug!(
        method = %req.method(),
        path = %req.path(),
        "Rejected request without JSON:API Accept header"
    );

    let response = ApiError::UnsupportedMediaType.error_response();
    Ok(req.into_response(response).map_into_right_body())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(values: &[&'static str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &value in values {
            map.append(ACCEPT, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_exact_media_type() {
        assert!(accepts_jsonapi(&headers(&["application/vnd.api+json"])));
    }

    #[test]
    fn test_media_type_in_list_or_with_params() {
        assert!(accepts_jsonapi(&headers(&[
            "text/html, application/vnd.api+json;q=0.9"
        ])));
        assert!(accepts_jsonapi(&headers(&["Application/VND.API+JSON"])));
        assert!(accepts_jsonapi(&headers(&[
            "application/json",
            "application/vnd.api+json"
        ])));
    }

    #[test]
    fn test_zero_quality_is_not_acceptable() {
        assert!(!accepts_jsonapi(&headers(&["application/vnd.api+json;q=0"])));
        assert!(!accepts_jsonapi(&headers(&[
            "application/vnd.api+json; Q=0.000"
        ])));
        assert!(accepts_jsonapi(&headers(&["application/vnd.api+json;q=0.1"])));
        assert!(accepts_jsonapi(&headers(&[
            "application/vnd.api+json;q=0, application/vnd.api+json"
        ])));
    }

    #[test]
    fn test_rejects_other_media_types() {
        assert!(!accepts_jsonapi(&headers(&[])));
        assert!(!accepts_jsonapi(&headers(&["application/json"])));
        assert!(!accepts_jsonapi(&headers(&["*/*"])));
        assert!(!accepts_jsonapi(&headers(&["application/*"])));
        assert!(!accepts_jsonapi(&headers(&["application/vnd.api+jsonx"])));
    }
}
