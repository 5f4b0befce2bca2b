//! Payment record and the attribute sets used to create and patch it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A stored payment. `id` is assigned at creation and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: String,
    pub attributes: PaymentAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Build a new payment with a freshly generated identifier.
    pub fn new(attributes: PaymentAttributes) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            attributes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Client-writable payment fields.
///
/// Top-level fields that are not set serialize as `null`; nested groups are
/// stored and returned as whole values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentAttributes {
    #[serde(default, deserialize_with = "amount")]
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub end_to_end_reference: Option<String>,
    pub numeric_reference: Option<String>,
    pub payment_id: Option<String>,
    pub payment_purpose: Option<String>,
    pub payment_scheme: Option<String>,
    pub payment_type: Option<String>,
    pub processing_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub scheme_payment_sub_type: Option<String>,
    pub scheme_payment_type: Option<String>,
    pub version: Option<i64>,
    pub organisation_id: Option<String>,
    pub beneficiary_party: Option<Party>,
    pub debtor_party: Option<Party>,
    pub sponsor_party: Option<Party>,
    pub charges_information: Option<ChargesInformation>,
    pub fx: Option<ForeignExchange>,
}

/// Account and bank details of a party to the payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_id_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargesInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_charges: Option<Vec<Charge>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_charges_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_charges_currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Foreign-exchange details (`fx` on the wire).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignExchange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
}

/// Partial update of a payment.
///
/// Outer `None` means the key was absent from the payload and the stored value
/// is kept. `Some(None)` means the key was sent as `null` and the value is
/// cleared. Nested groups are replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PaymentPatch {
    #[serde(default, deserialize_with = "present_amount")]
    pub amount: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub currency: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub end_to_end_reference: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub numeric_reference: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub payment_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub payment_purpose: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub payment_scheme: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub payment_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub processing_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub reference: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub scheme_payment_sub_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub scheme_payment_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub version: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub organisation_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub beneficiary_party: Option<Option<Party>>,
    #[serde(default, deserialize_with = "present")]
    pub debtor_party: Option<Option<Party>>,
    #[serde(default, deserialize_with = "present")]
    pub sponsor_party: Option<Option<Party>>,
    #[serde(default, deserialize_with = "present")]
    pub charges_information: Option<Option<ChargesInformation>>,
    #[serde(default, deserialize_with = "present")]
    pub fx: Option<Option<ForeignExchange>>,
}

/// Marks a key as present; `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Amounts arrive as decimal strings, but bare JSON numbers are taken too.
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountValue {
    Text(String),
    Number(serde_json::Number),
}

impl From<AmountValue> for String {
    fn from(value: AmountValue) -> Self {
        match value {
            AmountValue::Text(text) => text,
            AmountValue::Number(number) => number.to_string(),
        }
    }
}

fn amount<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<AmountValue>::deserialize(deserializer).map(|value| value.map(String::from))
}

fn present_amount<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    amount(deserializer).map(Some)
}

fn replace<T>(target: &mut Option<T>, value: Option<Option<T>>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl PaymentPatch {
    /// Apply the supplied fields onto `attributes`, leaving the rest untouched.
    pub fn apply_to(self, attributes: &mut PaymentAttributes) {
        replace(&mut attributes.amount, self.amount);
        replace(&mut attributes.currency, self.currency);
        replace(&mut attributes.end_to_end_reference, self.end_to_end_reference);
        replace(&mut attributes.numeric_reference, self.numeric_reference);
        replace(&mut attributes.payment_id, self.payment_id);
        replace(&mut attributes.payment_purpose, self.payment_purpose);
        replace(&mut attributes.payment_scheme, self.payment_scheme);
        replace(&mut attributes.payment_type, self.payment_type);
        replace(&mut attributes.processing_date, self.processing_date);
        replace(&mut attributes.reference, self.reference);
        replace(
            &mut attributes.scheme_payment_sub_type,
            self.scheme_payment_sub_type,
        );
        replace(&mut attributes.scheme_payment_type, self.scheme_payment_type);
        replace(&mut attributes.version, self.version);
        replace(&mut attributes.organisation_id, self.organisation_id);
        replace(&mut attributes.beneficiary_party, self.beneficiary_party);
        replace(&mut attributes.debtor_party, self.debtor_party);
        replace(&mut attributes.sponsor_party, self.sponsor_party);
        replace(&mut attributes.charges_information, self.charges_information);
        replace(&mut attributes.fx, self.fx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> PaymentAttributes {
        PaymentAttributes {
            amount: Some("99.99".to_string()),
            currency: Some("GBP".to_string()),
            reference: Some("Payment for Em's piano lessons".to_string()),
            fx: Some(ForeignExchange {
                contract_reference: Some("FX123".to_string()),
                exchange_rate: Some("2.00000".to_string()),
                original_amount: Some("200.42".to_string()),
                original_currency: Some("USD".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_patch_distinguishes_absent_from_null() {
        let patch: PaymentPatch =
            serde_json::from_str(r#"{"amount": null, "currency": "EUR"}"#).unwrap();
        assert_eq!(patch.amount, Some(None));
        assert_eq!(patch.currency, Some(Some("EUR".to_string())));
        assert_eq!(patch.reference, None);
    }

    #[test]
    fn test_numeric_amount_is_read_as_text() {
        let attributes: PaymentAttributes =
            serde_json::from_str(r#"{"amount": 123.45}"#).unwrap();
        assert_eq!(attributes.amount.as_deref(), Some("123.45"));

        let patch: PaymentPatch = serde_json::from_str(r#"{"amount": 100}"#).unwrap();
        assert_eq!(patch.amount, Some(Some("100".to_string())));

        let patch: PaymentPatch = serde_json::from_str(r#"{"amount": null}"#).unwrap();
        assert_eq!(patch.amount, Some(None));

        assert!(serde_json::from_str::<PaymentAttributes>(r#"{"amount": true}"#).is_err());
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let patch: PaymentPatch = serde_json::from_str(r#"{"amount": "666.66"}"#).unwrap();
        let mut attributes = stored();
        patch.apply_to(&mut attributes);

        assert_eq!(attributes.amount.as_deref(), Some("666.66"));
        assert_eq!(attributes.currency.as_deref(), Some("GBP"));
        assert_eq!(attributes.fx, stored().fx);
    }

    #[test]
    fn test_patch_replaces_nested_group_wholesale() {
        let patch: PaymentPatch = serde_json::from_str(
            r#"{"fx": {"original_amount": "550.00", "original_currency": "GBP"}}"#,
        )
        .unwrap();
        let mut attributes = stored();
        patch.apply_to(&mut attributes);

        let fx = serde_json::to_value(attributes.fx.unwrap()).unwrap();
        assert_eq!(
            fx,
            serde_json::json!({"original_amount": "550.00", "original_currency": "GBP"})
        );
    }

    #[test]
    fn test_patch_null_clears_value() {
        let patch: PaymentPatch = serde_json::from_str(r#"{"fx": null}"#).unwrap();
        let mut attributes = stored();
        patch.apply_to(&mut attributes);
        assert!(attributes.fx.is_none());
    }

    #[test]
    fn test_attributes_ignore_unknown_and_read_only_keys() {
        let attributes: PaymentAttributes = serde_json::from_str(
            r#"{"amount": "1.00", "id": "client-id", "created_at": "2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(attributes.amount.as_deref(), Some("1.00"));
    }

    #[test]
    fn test_new_payment_gets_unique_id() {
        let a = Payment::new(stored());
        let b = Payment::new(stored());
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
    }
}
