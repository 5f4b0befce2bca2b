//! JSON:API document shapes for payments and errors.

use actix_web::{HttpResponse, HttpResponseBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::{Payment, PaymentAttributes};

pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Resource type name used in `data.type`.
pub const PAYMENT_TYPE: &str = "Payment";

/// Top-level `{ "data": ... }` envelope
#[derive(Debug, Serialize)]
pub struct Document<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ResourceObject<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: ResourceAttributes<'a>,
}

#[derive(Debug, Serialize)]
pub struct ResourceAttributes<'a> {
    #[serde(flatten)]
    pub fields: &'a PaymentAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Payment> for ResourceObject<'a> {
    fn from(payment: &'a Payment) -> Self {
        Self {
            id: &payment.id,
            kind: PAYMENT_TYPE,
            attributes: ResourceAttributes {
                fields: &payment.attributes,
                created_at: payment.created_at,
                updated_at: payment.updated_at,
            },
        }
    }
}

pub fn single(payment: &Payment) -> Document<ResourceObject<'_>> {
    Document {
        data: ResourceObject::from(payment),
    }
}

pub fn collection(payments: &[Payment]) -> Document<Vec<ResourceObject<'_>>> {
    Document {
        data: payments.iter().map(ResourceObject::from).collect(),
    }
}

/// Finish a response with a JSON:API body and content type.
pub fn respond<T: Serialize>(builder: &mut HttpResponseBuilder, document: &T) -> HttpResponse {
    builder.content_type(JSONAPI_MEDIA_TYPE).json(document)
}

/// `{ "errors": [...] }` envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorSource {
    pub pointer: String,
}

/// Inbound `{ "data": { "type", "id"?, "attributes" } }` document
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct RequestDocument<T> {
    pub data: RequestData<T>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct RequestData<T> {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: T,
}

impl<T> RequestDocument<T> {
    /// Unwrap the attributes after checking `data.type` and, for updates,
    /// that `data.id` matches the addressed resource.
    pub fn into_attributes(self, target_id: Option<&str>) -> Result<T, ApiError> {
        let data = self.data;

        if let Some(ref kind) = data.kind {
            if kind != PAYMENT_TYPE {
                return Err(ApiError::Conflict(format!(
                    "resource type '{}' does not match '{}'",
                    kind, PAYMENT_TYPE
                )));
            }
        }

        if let (Some(target), Some(id)) = (target_id, data.id.as_deref()) {
            if id != target {
                return Err(ApiError::Conflict(format!(
                    "resource id '{}' does not match '{}'",
                    id, target
                )));
            }
        }

        Ok(data.attributes)
    }
}
