//! Attribute rules applied to payments before they are written.

use crate::error::ApiError;
use crate::model::PaymentAttributes;

/// A rule violation on a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// Message prefixed with the humanized field name, e.g. "Amount can't be blank".
    pub fn full_message(&self) -> String {
        format!("{} {}", humanize(self.field), self.message)
    }
}

/// "organisation_id" -> "Organisation", "end_to_end_reference" -> "End to end reference"
pub fn humanize(field: &str) -> String {
    let base = field.strip_suffix("_id").unwrap_or(field);
    let spaced = base.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Unsigned decimal: digits with an optional fractional part.
fn is_decimal(value: &str) -> bool {
    let mut parts = value.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && fraction.map_or(true, digits)
}

fn is_currency_code(value: &str) -> bool {
    value.len() == 3 && value.bytes().all(|b| b.is_ascii_uppercase())
}

/// Validate a payment's attributes. `previous` is the stored state when the
/// payment is being updated.
pub fn validate_payment(
    attributes: &PaymentAttributes,
    previous: Option<&PaymentAttributes>,
) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    let amount = attributes.amount.as_deref();
    if is_blank(amount) {
        errors.push(FieldError::new("amount", "can't be blank"));
    } else if let Some(amount) = amount {
        if !is_decimal(amount.trim()) {
            errors.push(FieldError::new("amount", "is not a number"));
        }
    }

    if let Some(ref currency) = attributes.currency {
        if !is_currency_code(currency) {
            errors.push(FieldError::new("currency", "is invalid"));
        }
    }

    if let Some(ref organisation_id) = attributes.organisation_id {
        if uuid::Uuid::parse_str(organisation_id).is_err() {
            errors.push(FieldError::new("organisation_id", "is not a valid UUID"));
        }
    }

    let stored_version = previous.and_then(|p| p.version);
    match attributes.version {
        Some(version) => {
            let floor = stored_version.unwrap_or(0).max(0);
            if version < floor {
                errors.push(FieldError::new(
                    "version",
                    format!("must be greater than or equal to {}", floor),
                ));
            }
        }
        // Once set, a version can only move forward
        None if stored_version.is_some() => {
            errors.push(FieldError::new("version", "can't be blank"));
        }
        None => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Invalid(errors))
    }
}
