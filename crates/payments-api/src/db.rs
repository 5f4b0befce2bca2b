use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ApiError;
use crate::model::{Payment, PaymentAttributes};
use crate::repository::PaymentRepository;

const PAYMENT_COLUMNS: &str = r#"
    id, amount, currency, end_to_end_reference, numeric_reference, payment_id,
    payment_purpose, payment_scheme, payment_type, processing_date, reference,
    scheme_payment_sub_type, scheme_payment_type, version, organisation_id,
    beneficiary_party, debtor_party, sponsor_party, charges_information, fx,
    created_at, updated_at
"#;

/// SQLite database wrapper
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.conn
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }

    fn init_schema(&self) -> Result<(), ApiError> {
        let conn = self.lock()?;

        // Enable WAL mode for better concurrent read/write performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        // Nested groups are stored as JSON text
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY NOT NULL,
                amount TEXT NOT NULL,
                currency TEXT,
                end_to_end_reference TEXT,
                numeric_reference TEXT,
                payment_id TEXT,
                payment_purpose TEXT,
                payment_scheme TEXT,
                payment_type TEXT,
                processing_date TEXT,
                reference TEXT,
                scheme_payment_sub_type TEXT,
                scheme_payment_type TEXT,
                version INTEGER,
                organisation_id TEXT,
                beneficiary_party TEXT,
                debtor_party TEXT,
                sponsor_party TEXT,
                charges_information TEXT,
                fx TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_payments_organisation ON payments(organisation_id)",
            [],
        )?;

        Ok(())
    }
}

fn to_json<T: Serialize>(value: &Option<T>) -> Result<Option<String>, ApiError> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ApiError::Internal(format!("failed to encode nested attribute: {e}")))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        text.parse::<NaiveDate>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn row_to_payment(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        attributes: PaymentAttributes {
            amount: row.get(1)?,
            currency: row.get(2)?,
            end_to_end_reference: row.get(3)?,
            numeric_reference: row.get(4)?,
            payment_id: row.get(5)?,
            payment_purpose: row.get(6)?,
            payment_scheme: row.get(7)?,
            payment_type: row.get(8)?,
            processing_date: date_column(row, 9)?,
            reference: row.get(10)?,
            scheme_payment_sub_type: row.get(11)?,
            scheme_payment_type: row.get(12)?,
            version: row.get(13)?,
            organisation_id: row.get(14)?,
            beneficiary_party: json_column(row, 15)?,
            debtor_party: json_column(row, 16)?,
            sponsor_party: json_column(row, 17)?,
            charges_information: json_column(row, 18)?,
            fx: json_column(row, 19)?,
        },
        created_at: timestamp_column(row, 20)?,
        updated_at: timestamp_column(row, 21)?,
    })
}

impl PaymentRepository for Database {
    fn list(&self) -> Result<Vec<Payment>, ApiError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM payments ORDER BY rowid ASC",
            PAYMENT_COLUMNS
        ))?;

        let payments = stmt
            .query_map([], row_to_payment)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(payments)
    }

    fn find(&self, id: &str) -> Result<Option<Payment>, ApiError> {
        let conn = self.lock()?;

        let payment = conn
            .query_row(
                &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS),
                params![id],
                row_to_payment,
            )
            .optional()?;

        Ok(payment)
    }

    fn insert(&self, payment: &Payment) -> Result<(), ApiError> {
        let a = &payment.attributes;
        let (beneficiary, debtor, sponsor) = (
            to_json(&a.beneficiary_party)?,
            to_json(&a.debtor_party)?,
            to_json(&a.sponsor_party)?,
        );
        let (charges, fx) = (to_json(&a.charges_information)?, to_json(&a.fx)?);
        let conn = self.lock()?;

        conn.execute(
            &format!(
                r#"
                INSERT INTO payments ({})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                        ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
                "#,
                PAYMENT_COLUMNS
            ),
            params![
                payment.id,
                a.amount,
                a.currency,
                a.end_to_end_reference,
                a.numeric_reference,
                a.payment_id,
                a.payment_purpose,
                a.payment_scheme,
                a.payment_type,
                a.processing_date.map(|d| d.to_string()),
                a.reference,
                a.scheme_payment_sub_type,
                a.scheme_payment_type,
                a.version,
                a.organisation_id,
                beneficiary,
                debtor,
                sponsor,
                charges,
                fx,
                payment.created_at.timestamp_millis(),
                payment.updated_at.timestamp_millis(),
            ],
        )?;

        Ok(())
    }

    fn update(&self, payment: &Payment) -> Result<(), ApiError> {
        let a = &payment.attributes;
        let (beneficiary, debtor, sponsor) = (
            to_json(&a.beneficiary_party)?,
            to_json(&a.debtor_party)?,
            to_json(&a.sponsor_party)?,
        );
        let (charges, fx) = (to_json(&a.charges_information)?, to_json(&a.fx)?);
        let conn = self.lock()?;

        let rows_affected = conn.execute(
            r#"
            UPDATE payments SET
                amount = ?2, currency = ?3, end_to_end_reference = ?4,
                numeric_reference = ?5, payment_id = ?6, payment_purpose = ?7,
                payment_scheme = ?8, payment_type = ?9, processing_date = ?10,
                reference = ?11, scheme_payment_sub_type = ?12,
                scheme_payment_type = ?13, version = ?14, organisation_id = ?15,
                beneficiary_party = ?16, debtor_party = ?17, sponsor_party = ?18,
                charges_information = ?19, fx = ?20, updated_at = ?21
            WHERE id = ?1
            "#,
            params![
                payment.id,
                a.amount,
                a.currency,
                a.end_to_end_reference,
                a.numeric_reference,
                a.payment_id,
                a.payment_purpose,
                a.payment_scheme,
                a.payment_type,
                a.processing_date.map(|d| d.to_string()),
                a.reference,
                a.scheme_payment_sub_type,
                a.scheme_payment_type,
                a.version,
                a.organisation_id,
                beneficiary,
                debtor,
                sponsor,
                charges,
                fx,
                payment.updated_at.timestamp_millis(),
            ],
        )?;

        if rows_affected == 0 {
            return Err(ApiError::NotFound(payment.id.clone()));
        }

        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), ApiError> {
        let conn = self.lock()?;

        let rows_affected = conn.execute("DELETE FROM payments WHERE id = ?1", params![id])?;

        if rows_affected == 0 {
            return Err(ApiError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn count(&self) -> Result<usize, ApiError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Charge, ChargesInformation, ForeignExchange, Party};

    fn full_payment() -> Payment {
        Payment::new(PaymentAttributes {
            amount: Some("99.99".to_string()),
            currency: Some("GBP".to_string()),
            processing_date: NaiveDate::from_ymd_opt(2017, 1, 18),
            version: Some(0),
            organisation_id: Some("743d5b63-8e6f-432e-a8fa-c5d8d2ee5fcb".to_string()),
            beneficiary_party: Some(Party {
                account_name: Some("W Owens".to_string()),
                account_number: Some("31926819".to_string()),
                account_type: Some(0),
                ..Default::default()
            }),
            charges_information: Some(ChargesInformation {
                bearer_code: Some("SHAR".to_string()),
                sender_charges: Some(vec![
                    Charge {
                        amount: Some("5.00".to_string()),
                        currency: Some("GBP".to_string()),
                    },
                    Charge {
                        amount: Some("10.00".to_string()),
                        currency: Some("USD".to_string()),
                    },
                ]),
                ..Default::default()
            }),
            fx: Some(ForeignExchange {
                contract_reference: Some("FX123".to_string()),
                exchange_rate: Some("2.00000".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// Timestamps are stored at millisecond precision.
    fn truncated(mut payment: Payment) -> Payment {
        payment.created_at =
            DateTime::from_timestamp_millis(payment.created_at.timestamp_millis()).unwrap();
        payment.updated_at =
            DateTime::from_timestamp_millis(payment.updated_at.timestamp_millis()).unwrap();
        payment
    }

    #[test]
    fn test_insert_and_find_round_trips_nested_groups() {
        let db = Database::new(":memory:").unwrap();
        let payment = full_payment();
        db.insert(&payment).unwrap();

        let fetched = db.find(&payment.id).unwrap().unwrap();
        assert_eq!(fetched, truncated(payment));
    }

    #[test]
    fn test_find_missing() {
        let db = Database::new(":memory:").unwrap();
        assert!(db.find("XYZ").unwrap().is_none());
    }

    #[test]
    fn test_list_in_insertion_order() {
        let db = Database::new(":memory:").unwrap();
        let first = full_payment();
        let second = full_payment();
        db.insert(&first).unwrap();
        db.insert(&second).unwrap();

        let payments = db.list().unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].id, first.id);
        assert_eq!(payments[1].id, second.id);
        assert_eq!(db.count().unwrap(), 2);
    }

    #[test]
    fn test_update_replaces_nested_group() {
        let db = Database::new(":memory:").unwrap();
        let mut payment = full_payment();
        db.insert(&payment).unwrap();

        payment.attributes.amount = Some("666.66".to_string());
        payment.attributes.fx = Some(ForeignExchange {
            original_amount: Some("550.00".to_string()),
            original_currency: Some("GBP".to_string()),
            ..Default::default()
        });
        payment.attributes.beneficiary_party = None;
        db.update(&payment).unwrap();

        let fetched = db.find(&payment.id).unwrap().unwrap();
        assert_eq!(fetched.attributes.amount.as_deref(), Some("666.66"));
        assert_eq!(
            serde_json::to_value(fetched.attributes.fx).unwrap(),
            serde_json::json!({"original_amount": "550.00", "original_currency": "GBP"})
        );
        assert!(fetched.attributes.beneficiary_party.is_none());
    }

    #[test]
    fn test_update_missing() {
        let db = Database::new(":memory:").unwrap();
        let ghost = full_payment();
        assert!(matches!(db.update(&ghost), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_delete_is_hard_delete() {
        let db = Database::new(":memory:").unwrap();
        let payment = full_payment();
        db.insert(&payment).unwrap();

        db.delete(&payment.id).unwrap();
        assert!(db.find(&payment.id).unwrap().is_none());
        assert_eq!(db.count().unwrap(), 0);
        assert!(matches!(db.delete(&payment.id), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let db = Database::new(":memory:").unwrap();
        let payment = full_payment();
        db.insert(&payment).unwrap();
        assert!(db.insert(&payment).is_err());
    }
}
