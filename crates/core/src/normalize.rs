//! Record normalization.
//!
//! Maps the connector's record shape onto [`DomainRecord`]:
//!
//! | external             | canonical      |
//! |----------------------|----------------|
//! | `id`                 | `id`           |
//! | `name`               | `full_name`    |
//! | `fields.email`       | `email`        |
//! | `fields.phone`       | `phone`        |
//! | `fields.company`     | `company_name` |
//! | `fields.salutation`  | `pronouns`     |
//! | `createdTime`        | `created_at` (RFC 3339 or epoch millis) |
//! | `uri`                | `uri`          |
//!
//! The input is taken as a raw JSON value rather than a typed struct so that
//! a connector returning `null`, a number, or nothing at all for any key still
//! yields a record.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{DomainRecord, RecordId};

/// Normalize one raw connector record.
///
/// Total over any JSON value: missing or non-scalar text fields become empty
/// strings, a missing or unparseable `createdTime` becomes `None`, and a
/// missing or empty `uri` becomes `None`. Normalized records are never
/// provisional.
#[must_use]
pub fn normalize(raw: &Value) -> DomainRecord {
    DomainRecord {
        id: RecordId::new(text_at(raw, "/id")),
        full_name: text_at(raw, "/name"),
        email: text_at(raw, "/fields/email"),
        phone: text_at(raw, "/fields/phone"),
        company_name: text_at(raw, "/fields/company"),
        pronouns: text_at(raw, "/fields/salutation"),
        created_at: timestamp_at(raw, "/createdTime"),
        uri: Some(text_at(raw, "/uri")).filter(|uri| !uri.is_empty()),
        provisional: false,
    }
}

/// Scalar at `pointer` rendered as text; anything else is empty.
fn text_at(raw: &Value, pointer: &str) -> String {
    match raw.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// RFC 3339 text, or Unix epoch milliseconds as a number or digit string.
fn timestamp_at(raw: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    match raw.pointer(pointer)? {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|t| t.with_timezone(&Utc))
            .or_else(|| text.trim().parse().ok().and_then(DateTime::from_timestamp_millis)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_full_record() {
        let raw = json!({
            "id": "1",
            "name": "Ann",
            "fields": {
                "email": "a@x.com",
                "phone": "555",
                "company": "Acme",
                "salutation": "she/her"
            },
            "createdTime": "2024-01-01T00:00:00Z",
            "uri": "/1"
        });

        let record = normalize(&raw);

        assert_eq!(record.id.as_str(), "1");
        assert_eq!(record.full_name, "Ann");
        assert_eq!(record.email, "a@x.com");
        assert_eq!(record.phone, "555");
        assert_eq!(record.company_name, "Acme");
        assert_eq!(record.pronouns, "she/her");
        assert_eq!(
            record.created_at,
            Some("2024-01-01T00:00:00Z".parse().unwrap())
        );
        assert_eq!(record.uri.as_deref(), Some("/1"));
    }

    #[test]
    fn test_serialized_shape_matches_presentation_contract() {
        let raw = json!({
            "id": "1",
            "name": "Ann",
            "fields": {"email": "a@x.com", "phone": "555", "company": "Acme", "salutation": "she/her"},
            "createdTime": "2024-01-01T00:00:00Z",
            "uri": "/1"
        });

        assert_eq!(
            serde_json::to_value(normalize(&raw)).unwrap(),
            json!({
                "id": "1",
                "fullName": "Ann",
                "email": "a@x.com",
                "phone": "555",
                "companyName": "Acme",
                "pronouns": "she/her",
                "createdAt": "2024-01-01T00:00:00Z",
                "uri": "/1"
            })
        );
    }

    #[test]
    fn test_missing_optional_fields() {
        let record = normalize(&json!({"id": "7"}));

        assert_eq!(record.id.as_str(), "7");
        assert!(record.full_name.is_empty());
        assert!(record.email.is_empty());
        assert!(record.phone.is_empty());
        assert!(record.company_name.is_empty());
        assert!(record.pronouns.is_empty());
        assert_eq!(record.created_at, None);
        assert_eq!(record.uri, None);
    }

    #[test]
    fn test_nulls_and_odd_types_do_not_fail() {
        let record = normalize(&json!({
            "id": 42,
            "name": null,
            "fields": {"phone": 5_551_234, "email": ["a@x.com"]},
            "createdTime": "yesterday",
            "uri": ""
        }));

        assert_eq!(record.id.as_str(), "42");
        assert!(record.full_name.is_empty());
        assert_eq!(record.phone, "5551234");
        assert!(record.email.is_empty());
        assert_eq!(record.created_at, None);
        assert_eq!(record.uri, None);
    }

    #[test]
    fn test_non_object_input() {
        for raw in [json!(null), json!("x"), json!([1, 2]), json!({"fields": "flat"})] {
            let record = normalize(&raw);
            assert!(record.id.as_str().is_empty());
            assert!(record.email.is_empty());
        }
    }

    #[test]
    fn test_epoch_millis_timestamps() {
        let expected = Some("2024-01-01T00:00:00Z".parse().unwrap());

        let record = normalize(&json!({"createdTime": 1_704_067_200_000_i64}));
        assert_eq!(record.created_at, expected);

        let record = normalize(&json!({"createdTime": "1704067200000"}));
        assert_eq!(record.created_at, expected);

        let record = normalize(&json!({"createdTime": 1.5}));
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn test_remote_id_with_provisional_prefix_is_not_provisional() {
        let record = normalize(&json!({"id": "provisional-123", "name": "Ann"}));

        assert_eq!(record.id.as_str(), "provisional-123");
        assert!(!record.is_provisional());
    }

    #[test]
    fn test_offset_timestamps_are_converted_to_utc() {
        let record = normalize(&json!({"createdTime": "2024-01-01T02:00:00+02:00"}));
        assert_eq!(
            record.created_at,
            Some("2024-01-01T00:00:00Z".parse().unwrap())
        );
    }
}
