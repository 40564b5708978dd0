//! Canonical contact record.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::RecordId;

/// Canonical contact representation used by the cache and presentation.
///
/// `id` is the only identity field; everything else is display data and may
/// repeat across records. Text fields are empty strings, never absent, so
/// presentation does not branch on missing values. `created_at` and `uri`
/// stay nullable because "unknown" is meaningfully different from a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    /// External-system identity, unique within the resource type.
    pub id: RecordId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company_name: String,
    /// Free-form, e.g. `she/her`.
    pub pronouns: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Deep link into the CRM.
    pub uri: Option<String>,
    /// Set only on the local stand-in for an unconfirmed create. Records
    /// read from the connector never carry it, whatever their id looks like.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub provisional: bool,
}

impl DomainRecord {
    /// Whether this record is an unconfirmed optimistic insert.
    #[must_use]
    pub const fn is_provisional(&self) -> bool {
        self.provisional
    }

    /// Ordering for "newest first" lists. Records without a timestamp sink to
    /// the end; ties keep their relative order when used with a stable sort.
    #[must_use]
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        match (a.created_at, b.created_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(id: &str, created_at: Option<&str>) -> DomainRecord {
        DomainRecord {
            id: RecordId::new(id),
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            company_name: String::new(),
            pronouns: String::new(),
            created_at: created_at.map(|s| s.parse().unwrap()),
            uri: None,
            provisional: false,
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(record("1", Some("2024-01-01T00:00:00Z"))).unwrap();

        assert_eq!(json["fullName"], "");
        assert_eq!(json["companyName"], "");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
        assert!(json["uri"].is_null());
        assert!(json.get("provisional").is_none());
    }

    #[test]
    fn test_newest_first() {
        let mut records = vec![
            record("old", Some("2024-01-01T00:00:00Z")),
            record("none", None),
            record("new", Some("2024-06-01T00:00:00Z")),
        ];
        records.sort_by(DomainRecord::newest_first);

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "none"]);
    }
}
