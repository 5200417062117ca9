// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record types: normalized entities with keys, attributes, and relationships.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ident::RecordIdentity;

/// Relationship payload stored on a record.
///
/// The variant is dictated by the declared relationship kind:
/// - `One` for `hasOne` (a single target identity or null),
/// - `Many` for `hasMany` (an ordered sequence of target identities).
///
/// Duplicates in a `Many` list are preserved on input, but all equality tests
/// treat the sequence as a multiset of identities (see
/// [`RelationshipData::same_data`]).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum RelationshipData {
    /// `hasOne` payload: a single target identity, or null.
    One(Option<RecordIdentity>),
    /// `hasMany` payload: an ordered sequence of target identities.
    Many(Vec<RecordIdentity>),
}

impl RelationshipData {
    /// Shorthand for a `hasOne` payload pointing at `identity`.
    #[must_use]
    pub fn one(identity: RecordIdentity) -> Self {
        Self::One(Some(identity))
    }

    /// Shorthand for a `hasMany` payload over `identities`.
    #[must_use]
    pub fn many(identities: impl IntoIterator<Item = RecordIdentity>) -> Self {
        Self::Many(identities.into_iter().collect())
    }

    /// All target identities named by this payload, in stored order.
    pub fn identities(&self) -> impl Iterator<Item = &RecordIdentity> {
        match self {
            Self::One(data) => Identities::One(data.iter()),
            Self::Many(data) => Identities::Many(data.iter()),
        }
    }

    /// Returns an empty payload of the same shape (`One(None)` or `Many([])`).
    #[must_use]
    pub fn empty_like(&self) -> Self {
        match self {
            Self::One(_) => Self::One(None),
            Self::Many(_) => Self::Many(Vec::new()),
        }
    }

    /// Data equality as defined for inverse computation: identity equality
    /// for `One`, multiset-of-identities equality for `Many`. Mismatched
    /// shapes are never equal.
    #[must_use]
    pub fn same_data(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::One(a), Self::One(b)) => a == b,
            (Self::Many(a), Self::Many(b)) => identity_multiset_eq(a, b),
            _ => false,
        }
    }
}

/// Iterator adapter for [`RelationshipData::identities`].
enum Identities<'a> {
    One(core::option::Iter<'a, RecordIdentity>),
    Many(core::slice::Iter<'a, RecordIdentity>),
}

impl<'a> Iterator for Identities<'a> {
    type Item = &'a RecordIdentity;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::One(it) => it.next(),
            Self::Many(it) => it.next(),
        }
    }
}

/// A normalized record: an identity plus three optional field groupings.
///
/// Empty maps mean "grouping absent". Key values of `None` and attribute
/// values of JSON `null` are tombstones written by inverse operations; reads
/// through [`Record::key`] and [`Record::attribute`] treat them as unset.
///
/// Attribute values are opaque to the cache; they are compared structurally
/// and never interpreted.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Record {
    /// The record's `(type, id)` identity.
    pub identity: RecordIdentity,
    /// Alternative string identifiers, keyed by key name.
    pub keys: BTreeMap<String, Option<String>>,
    /// Opaque attribute values, keyed by attribute name.
    pub attributes: BTreeMap<String, Value>,
    /// Relationship payloads, keyed by relationship name.
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl Record {
    /// Creates a record with the given identity and no fields.
    #[must_use]
    pub fn new(identity: RecordIdentity) -> Self {
        Self {
            identity,
            keys: BTreeMap::new(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Synthesizes a bare skeleton record carrying only an identity.
    ///
    /// Relationship-only writes against a non-existent record start from a
    /// skeleton so that a pointer can exist before the full record arrives.
    #[must_use]
    pub fn skeleton(identity: RecordIdentity) -> Self {
        Self::new(identity)
    }

    /// Builder-style: sets key `name` to `value`.
    #[must_use]
    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(name.into(), Some(value.into()));
        self
    }

    /// Builder-style: sets attribute `name` to `value`.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style: sets a `hasOne` relationship to `target`.
    #[must_use]
    pub fn with_has_one(mut self, name: impl Into<String>, target: RecordIdentity) -> Self {
        self.relationships
            .insert(name.into(), RelationshipData::one(target));
        self
    }

    /// Builder-style: sets a `hasMany` relationship to `targets`.
    #[must_use]
    pub fn with_has_many(
        mut self,
        name: impl Into<String>,
        targets: impl IntoIterator<Item = RecordIdentity>,
    ) -> Self {
        self.relationships
            .insert(name.into(), RelationshipData::many(targets));
        self
    }

    /// Reads key `name`, treating a tombstone as unset.
    #[must_use]
    pub fn key(&self, name: &str) -> Option<&str> {
        self.keys.get(name).and_then(Option::as_deref)
    }

    /// Reads attribute `name`, treating JSON `null` as unset.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    /// Reads the raw relationship payload for `name`, if present.
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&RelationshipData> {
        self.relationships.get(name)
    }
}

/// Merges `incoming` into `existing` per grouping: for `keys`, `attributes`,
/// and `relationships`, each field present in `incoming` overrides the
/// existing field; fields absent from `incoming` are preserved. The identity
/// is taken from `existing`.
#[must_use]
pub(crate) fn merge_records(existing: &Record, incoming: &Record) -> Record {
    let mut merged = existing.clone();
    for (name, value) in &incoming.keys {
        merged.keys.insert(name.clone(), value.clone());
    }
    for (name, value) in &incoming.attributes {
        merged.attributes.insert(name.clone(), value.clone());
    }
    for (name, data) in &incoming.relationships {
        merged.relationships.insert(name.clone(), data.clone());
    }
    merged
}

/// Multiset equality over identity sequences: equal lengths and the same
/// identities with the same multiplicities, ignoring order.
#[must_use]
pub fn identity_multiset_eq(a: &[RecordIdentity], b: &[RecordIdentity]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted: Vec<&RecordIdentity> = a.iter().collect();
    let mut b_sorted: Vec<&RecordIdentity> = b.iter().collect();
    a_sorted.sort();
    b_sorted.sort();
    a_sorted == b_sorted
}

/// Identity-set difference `a \ b`: the distinct identities of `a` that do
/// not appear in `b`, in `a`'s order.
#[must_use]
pub fn identity_difference(a: &[RecordIdentity], b: &[RecordIdentity]) -> Vec<RecordIdentity> {
    let mut out: Vec<RecordIdentity> = Vec::new();
    for identity in a {
        if !b.contains(identity) && !out.contains(identity) {
            out.push(identity.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn planet(id: &str) -> RecordIdentity {
        RecordIdentity::new("planet", id)
    }

    #[test]
    fn merge_overrides_per_field_and_preserves_the_rest() {
        let existing = Record::new(planet("jupiter"))
            .with_attribute("name", json!("Jupiter"))
            .with_has_many("moons", [RecordIdentity::new("moon", "io")]);
        let incoming = Record::new(planet("jupiter"))
            .with_attribute("classification", json!("gas giant"))
            .with_has_one("solarSystem", RecordIdentity::new("solarSystem", "ss1"));

        let merged = merge_records(&existing, &incoming);
        assert_eq!(merged.attribute("name"), Some(&json!("Jupiter")));
        assert_eq!(merged.attribute("classification"), Some(&json!("gas giant")));
        assert!(merged.relationship("moons").is_some());
        assert!(merged.relationship("solarSystem").is_some());
    }

    #[test]
    fn merge_field_level_override_replaces_relationship_data_wholesale() {
        let existing =
            Record::new(planet("jupiter")).with_has_many("moons", [RecordIdentity::new("moon", "io")]);
        let incoming = Record::new(planet("jupiter"))
            .with_has_many("moons", [RecordIdentity::new("moon", "europa")]);

        let merged = merge_records(&existing, &incoming);
        let RelationshipData::Many(moons) = merged.relationship("moons").unwrap() else {
            panic!("expected hasMany data");
        };
        assert_eq!(moons.len(), 1);
        assert_eq!(moons[0].id, "europa");
    }

    #[test]
    fn multiset_equality_ignores_order_but_not_multiplicity() {
        let io = RecordIdentity::new("moon", "io");
        let europa = RecordIdentity::new("moon", "europa");
        assert!(identity_multiset_eq(
            &[io.clone(), europa.clone()],
            &[europa.clone(), io.clone()]
        ));
        assert!(!identity_multiset_eq(
            &[io.clone(), io.clone()],
            &[io.clone(), europa]
        ));
        assert!(!identity_multiset_eq(&[io.clone()], &[io.clone(), io]));
    }

    #[test]
    fn difference_is_distinct_and_order_preserving() {
        let io = RecordIdentity::new("moon", "io");
        let europa = RecordIdentity::new("moon", "europa");
        let ganymede = RecordIdentity::new("moon", "ganymede");
        let diff = identity_difference(
            &[io.clone(), europa.clone(), io.clone(), ganymede.clone()],
            &[europa],
        );
        assert_eq!(diff, vec![io, ganymede]);
    }

    #[test]
    fn tombstones_read_as_unset() {
        let mut record = Record::new(planet("jupiter"));
        record.keys.insert("remoteId".into(), None);
        record.attributes.insert("name".into(), Value::Null);
        assert_eq!(record.key("remoteId"), None);
        assert_eq!(record.attribute("name"), None);
    }

    #[test]
    fn empty_like_matches_shape() {
        let one = RelationshipData::one(planet("jupiter"));
        let many = RelationshipData::many([planet("jupiter")]);
        assert_eq!(one.empty_like(), RelationshipData::One(None));
        assert_eq!(many.empty_like(), RelationshipData::Many(Vec::new()));
    }
}
