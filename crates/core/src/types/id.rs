//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_string_id!` macro to create ID wrappers that prevent
//! accidentally mixing identifiers from different systems. Both ids in this
//! crate are opaque strings minted by external systems (the CRM connector and
//! the identity provider).

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use contactdeck_core::define_string_id;
/// define_string_id!(DealId);
/// define_string_id!(TicketId);
///
/// let deal = DealId::new("42");
/// let ticket = TicketId::new("42");
///
/// // These are different types, so this won't compile:
/// // let _: DealId = ticket;
/// # let _ = (deal, ticket);
/// ```
#[macro_export]
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(RecordId);
define_string_id!(SubjectId);

/// Prefix carried by locally-minted ids of records that the remote store has
/// not confirmed yet. Provisional status itself lives on
/// [`DomainRecord`](crate::DomainRecord), not in the id.
pub const PROVISIONAL_PREFIX: &str = "provisional-";

impl RecordId {
    /// Mint a locally unique id for an optimistic insert.
    ///
    /// Provisional ids are never sent to the connector and never survive
    /// reconciliation.
    #[must_use]
    pub fn provisional() -> Self {
        Self(format!("{PROVISIONAL_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisional_ids_are_unique() {
        let a = RecordId::provisional();
        let b = RecordId::provisional();

        assert_ne!(a, b);
        assert!(a.as_str().starts_with(PROVISIONAL_PREFIX));
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = RecordId::new("101");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"101\""));
    }
}
