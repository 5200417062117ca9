// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ephemeral in-memory accessor backed by nested ordered maps.

use std::collections::BTreeMap;

use crate::accessor::RecordAccessor;
use crate::ident::{InverseRef, RecordIdentity};
use crate::record::Record;
use crate::schema::Schema;

/// In-memory record store: `type -> (id -> record)` plus the inverse index
/// `type -> (id -> back-refs)`.
///
/// All maps are `BTreeMap` so iteration order is deterministic. Buckets for
/// every schema-declared type are pre-populated at construction and restored
/// by [`RecordAccessor::reset`].
#[derive(Debug, Clone)]
pub struct MemoryAccessor {
    records: BTreeMap<String, BTreeMap<String, Record>>,
    inverse: BTreeMap<String, BTreeMap<String, Vec<InverseRef>>>,
    declared: Vec<String>,
}

impl MemoryAccessor {
    /// Creates an empty accessor with one bucket per schema-declared model.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        let mut accessor = Self {
            records: BTreeMap::new(),
            inverse: BTreeMap::new(),
            declared: schema.model_names().map(str::to_owned).collect(),
        };
        accessor.reset();
        accessor
    }
}

impl RecordAccessor for MemoryAccessor {
    fn record(&self, identity: &RecordIdentity) -> Option<&Record> {
        self.records.get(&identity.ty)?.get(&identity.id)
    }

    fn records(&self, ty: &str) -> Vec<&Record> {
        self.records
            .get(ty)
            .map(|bucket| bucket.values().collect())
            .unwrap_or_default()
    }

    fn set_record(&mut self, record: Record) {
        self.records
            .entry(record.identity.ty.clone())
            .or_default()
            .insert(record.identity.id.clone(), record);
    }

    fn set_records(&mut self, ty: &str, records: Vec<Record>) {
        let bucket = self.records.entry(ty.to_owned()).or_default();
        for record in records {
            debug_assert_eq!(record.identity.ty, ty, "bulk upsert across type buckets");
            bucket.insert(record.identity.id.clone(), record);
        }
    }

    fn remove_record(&mut self, identity: &RecordIdentity) -> Option<Record> {
        self.records.get_mut(&identity.ty)?.remove(&identity.id)
    }

    fn remove_records(&mut self, ty: &str, identities: &[RecordIdentity]) -> Vec<Record> {
        let Some(bucket) = self.records.get_mut(ty) else {
            return Vec::new();
        };
        identities
            .iter()
            .filter_map(|identity| bucket.remove(&identity.id))
            .collect()
    }

    fn inversely_related(&self, identity: &RecordIdentity) -> Vec<InverseRef> {
        self.inverse
            .get(&identity.ty)
            .and_then(|bucket| bucket.get(&identity.id))
            .cloned()
            .unwrap_or_default()
    }

    fn add_inversely_related(&mut self, identity: &RecordIdentity, inverse: InverseRef) {
        self.inverse
            .entry(identity.ty.clone())
            .or_default()
            .entry(identity.id.clone())
            .or_default()
            .push(inverse);
    }

    fn remove_inversely_related(&mut self, identity: &RecordIdentity, inverse: &InverseRef) {
        if let Some(refs) = self
            .inverse
            .get_mut(&identity.ty)
            .and_then(|bucket| bucket.get_mut(&identity.id))
        {
            refs.retain(|entry| {
                entry.record != inverse.record || entry.relationship != inverse.relationship
            });
        }
    }

    fn clear_inversely_related(&mut self, identity: &RecordIdentity) {
        if let Some(bucket) = self.inverse.get_mut(&identity.ty) {
            bucket.remove(&identity.id);
        }
    }

    fn reset(&mut self) {
        self.records.clear();
        self.inverse.clear();
        for ty in &self.declared {
            self.records.insert(ty.clone(), BTreeMap::new());
            self.inverse.insert(ty.clone(), BTreeMap::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::builder()
            .model("planet", |m| m.attribute("name"))
            .model("moon", |m| m)
            .build()
    }

    fn planet(id: &str) -> RecordIdentity {
        RecordIdentity::new("planet", id)
    }

    #[test]
    fn buckets_are_prepopulated_for_declared_types() {
        let accessor = MemoryAccessor::new(&schema());
        assert!(accessor.records("planet").is_empty());
        assert!(accessor.records("moon").is_empty());
    }

    #[test]
    fn set_and_remove_round_trip() {
        let mut accessor = MemoryAccessor::new(&schema());
        let record = Record::new(planet("jupiter"));
        accessor.set_record(record.clone());
        assert_eq!(accessor.record(&planet("jupiter")), Some(&record));

        let removed = accessor.remove_record(&planet("jupiter"));
        assert_eq!(removed, Some(record));
        assert_eq!(accessor.record(&planet("jupiter")), None);
        assert_eq!(accessor.remove_record(&planet("jupiter")), None);
    }

    #[test]
    fn remove_records_returns_only_records_that_existed() {
        let mut accessor = MemoryAccessor::new(&schema());
        accessor.set_record(Record::new(planet("jupiter")));
        let removed = accessor.remove_records("planet", &[planet("jupiter"), planet("saturn")]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].identity.id, "jupiter");
    }

    #[test]
    fn inverse_index_removal_matches_owner_and_relationship() {
        let mut accessor = MemoryAccessor::new(&schema());
        let target = planet("jupiter");
        let a = InverseRef::new(RecordIdentity::new("moon", "io"), "planet");
        let b = InverseRef::new(RecordIdentity::new("moon", "europa"), "planet");
        accessor.add_inversely_related(&target, a.clone());
        accessor.add_inversely_related(&target, a.clone());
        accessor.add_inversely_related(&target, b.clone());

        accessor.remove_inversely_related(&target, &a);
        let remaining = accessor.inversely_related(&target);
        assert_eq!(remaining, vec![b]);

        accessor.clear_inversely_related(&target);
        assert!(accessor.inversely_related(&target).is_empty());
    }

    #[test]
    fn reset_restores_empty_declared_buckets() {
        let mut accessor = MemoryAccessor::new(&schema());
        accessor.set_record(Record::new(planet("jupiter")));
        accessor.add_inversely_related(
            &planet("jupiter"),
            InverseRef::new(RecordIdentity::new("moon", "io"), "planet"),
        );
        accessor.reset();
        assert!(accessor.records("planet").is_empty());
        assert!(accessor.inversely_related(&planet("jupiter")).is_empty());
    }

    #[test]
    fn related_helpers_are_pure_reads_over_record() {
        use crate::record::RelationshipData;

        let mut accessor = MemoryAccessor::new(&schema());
        let io = RecordIdentity::new("moon", "io");
        let record = Record::new(planet("jupiter"))
            .with_has_many("moons", [io.clone()])
            .with_has_one("solarSystem", RecordIdentity::new("solarSystem", "ss"));
        accessor.set_record(record);

        assert!(accessor.related_records_include(&planet("jupiter"), "moons", &io));
        assert_eq!(
            accessor.related_record(&planet("jupiter"), "solarSystem"),
            Some(Some(RecordIdentity::new("solarSystem", "ss")))
        );
        // hasMany shape read through the hasOne helper is absent, not null.
        assert_eq!(accessor.related_record(&planet("jupiter"), "moons"), None);
        assert!(accessor.related_record_eq(&planet("saturn"), "solarSystem", None));

        let mut record = Record::new(planet("neptune"));
        record
            .relationships
            .insert("solarSystem".into(), RelationshipData::One(None));
        accessor.set_record(record);
        assert_eq!(
            accessor.related_record(&planet("neptune"), "solarSystem"),
            Some(None)
        );
    }
}
