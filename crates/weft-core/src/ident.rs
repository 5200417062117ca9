// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record identity and back-reference types.

use serde::{Deserialize, Serialize};

/// Identity of a record: a `(type, id)` pair.
///
/// Equality and ordering are component-wise (type first, then id). A "null"
/// identity is modelled as `Option<RecordIdentity>::None` and compares equal
/// only to itself.
///
/// Identities are caller-supplied strings; the cache never derives or
/// rewrites them. Alternative identifiers (remote keys) live in
/// [`crate::Record::keys`] and are resolved through the key map.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct RecordIdentity {
    /// Model type name declared by the schema (e.g. `"planet"`).
    pub ty: String,
    /// Unique identifier within the type's bucket.
    pub id: String,
}

impl RecordIdentity {
    /// Creates an identity from a type name and an id.
    #[must_use]
    pub fn new(ty: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            id: id.into(),
        }
    }
}

impl core::fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.ty, self.id)
    }
}

/// Entry in the inverse-relationship index.
///
/// A back-ref `(record, relationship)` stored at identity `x` means: "the
/// record `record` points at `x` through its relationship `relationship`".
/// Back-refs are stored only for relationships whose schema declaration has a
/// named inverse.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct InverseRef {
    /// Identity of the record holding the forward pointer.
    pub record: RecordIdentity,
    /// Name of the relationship on `record` that holds the pointer.
    pub relationship: String,
}

impl InverseRef {
    /// Creates a back-ref for the given owner identity and relationship name.
    #[must_use]
    pub fn new(record: RecordIdentity, relationship: impl Into<String>) -> Self {
        Self {
            record,
            relationship: relationship.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_equality_is_component_wise() {
        let a = RecordIdentity::new("planet", "jupiter");
        let b = RecordIdentity::new("planet", "jupiter");
        let c = RecordIdentity::new("moon", "jupiter");
        let d = RecordIdentity::new("planet", "io");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn identity_orders_by_type_then_id() {
        let mut ids = vec![
            RecordIdentity::new("planet", "b"),
            RecordIdentity::new("moon", "z"),
            RecordIdentity::new("planet", "a"),
        ];
        ids.sort();
        assert_eq!(ids[0].ty, "moon");
        assert_eq!(ids[1].id, "a");
        assert_eq!(ids[2].id, "b");
    }

    #[test]
    fn display_joins_type_and_id() {
        let id = RecordIdentity::new("planet", "jupiter");
        assert_eq!(id.to_string(), "planet:jupiter");
    }
}
