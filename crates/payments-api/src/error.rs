use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::jsonapi::{self, ErrorDocument, ErrorObject, ErrorSource};
use crate::validation::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("payment not found: {0}")]
    NotFound(String),

    #[error("payment invalid: {}", summarize(.0))]
    Invalid(Vec<FieldError>),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("Accept header must include {}", jsonapi::JSONAPI_MEDIA_TYPE)]
    UnsupportedMediaType,

    #[error("internal error: {0}")]
    Internal(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::full_message)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    /// JSON:API `type` member for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "Resource Not Found",
            ApiError::Invalid(_) => "Resource Invalid",
            ApiError::Conflict(_) => "Resource Conflict",
            ApiError::BadRequest(_) => "Bad Request",
            ApiError::UnsupportedMediaType => "Unsupported Media Type",
            ApiError::Database(_) | ApiError::Internal(_) => "Internal Server Error",
        }
    }

    fn error_objects(&self) -> Vec<ErrorObject> {
        let status = self.status_code().as_u16().to_string();
        let object = |detail: String, source: Option<ErrorSource>| ErrorObject {
            status: status.clone(),
            kind: self.kind().to_string(),
            detail,
            source,
        };

        match self {
            ApiError::Invalid(errors) => errors
                .iter()
                .map(|e| {
                    object(
                        e.full_message(),
                        Some(ErrorSource {
                            pointer: format!("/data/attributes/{}", e.field),
                        }),
                    )
                })
                .collect(),
            ApiError::NotFound(id) => {
                vec![object(format!("Payment '{}' not found", id), None)]
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                vec![object("An internal error occurred".to_string(), None)]
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                vec![object("An internal error occurred".to_string(), None)]
            }
            ApiError::Conflict(msg) | ApiError::BadRequest(msg) => {
                vec![object(msg.clone(), None)]
            }
            ApiError::UnsupportedMediaType => vec![object(self.to_string(), None)],
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let document = ErrorDocument {
            errors: self.error_objects(),
        };
        jsonapi::respond(&mut HttpResponse::build(self.status_code()), &document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_renders_one_entry_per_field() {
        let err = ApiError::Invalid(vec![
            FieldError::new("amount", "can't be blank"),
            FieldError::new("organisation_id", "is not a valid UUID"),
        ]);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let objects = err.error_objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].kind, "Resource Invalid");
        assert_eq!(objects[0].status, "422");
        assert_eq!(objects[0].detail, "Amount can't be blank");
        assert_eq!(
            objects[0].source.as_ref().unwrap().pointer,
            "/data/attributes/amount"
        );
        assert_eq!(objects[1].detail, "Organisation is not a valid UUID");
    }

    #[test]
    fn test_not_found_kind() {
        let err = ApiError::NotFound("XYZ".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let objects = err.error_objects();
        assert_eq!(objects[0].kind, "Resource Not Found");
        assert!(objects[0].source.is_none());
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::Internal("lock poisoned".to_string());
        let objects = err.error_objects();
        assert_eq!(objects[0].detail, "An internal error occurred");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_uses_jsonapi_content_type() {
        let response = ApiError::UnsupportedMediaType.error_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let content_type = response
            .headers()
            .get(actix_web::http::header::CONTENT_TYPE)
            .unwrap();
        assert_eq!(content_type, jsonapi::JSONAPI_MEDIA_TYPE);
    }
}
