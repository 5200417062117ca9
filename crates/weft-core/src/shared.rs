// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structurally-shared accessor supporting cheap forking.
//!
//! Buckets are held behind `Arc`: [`SharedAccessor::fork`] clones the outer
//! maps while sharing every bucket allocation, so forking is `O(types)`
//! regardless of record count. The first write to a bucket after a fork
//! copies that bucket (`Arc::make_mut`); identity uniqueness within a bucket
//! (and every other store invariant) holds independently in each fork.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::accessor::RecordAccessor;
use crate::ident::{InverseRef, RecordIdentity};
use crate::record::Record;
use crate::schema::Schema;

type RecordBucket = BTreeMap<String, Record>;
type InverseBucket = BTreeMap<String, Vec<InverseRef>>;

/// Copy-on-write record store with bucket-level structural sharing.
#[derive(Debug, Clone)]
pub struct SharedAccessor {
    records: BTreeMap<String, Arc<RecordBucket>>,
    inverse: BTreeMap<String, Arc<InverseBucket>>,
    declared: Vec<String>,
}

impl SharedAccessor {
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

    /// Forks this accessor, sharing all bucket allocations with the original.
    ///
    /// Subsequent writes to either side copy only the touched bucket.
    #[must_use]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Resets this accessor to share `base`'s state.
    pub fn reset_from(&mut self, base: &Self) {
        *self = base.fork();
    }
}

impl RecordAccessor for SharedAccessor {
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
        let bucket = self
            .records
            .entry(record.identity.ty.clone())
            .or_default();
        Arc::make_mut(bucket).insert(record.identity.id.clone(), record);
    }

    fn set_records(&mut self, ty: &str, records: Vec<Record>) {
        let bucket = Arc::make_mut(self.records.entry(ty.to_owned()).or_default());
        for record in records {
            debug_assert_eq!(record.identity.ty, ty, "bulk upsert across type buckets");
            bucket.insert(record.identity.id.clone(), record);
        }
    }

    fn remove_record(&mut self, identity: &RecordIdentity) -> Option<Record> {
        let bucket = self.records.get_mut(&identity.ty)?;
        if !bucket.contains_key(&identity.id) {
            // Avoid copying a shared bucket just to discover the id is absent.
            return None;
        }
        Arc::make_mut(bucket).remove(&identity.id)
    }

    fn remove_records(&mut self, ty: &str, identities: &[RecordIdentity]) -> Vec<Record> {
        let Some(bucket) = self.records.get_mut(ty) else {
            return Vec::new();
        };
        if !identities.iter().any(|i| bucket.contains_key(&i.id)) {
            return Vec::new();
        }
        let bucket = Arc::make_mut(bucket);
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
        let bucket = self.inverse.entry(identity.ty.clone()).or_default();
        Arc::make_mut(bucket)
            .entry(identity.id.clone())
            .or_default()
            .push(inverse);
    }

    fn remove_inversely_related(&mut self, identity: &RecordIdentity, inverse: &InverseRef) {
        let Some(bucket) = self.inverse.get_mut(&identity.ty) else {
            return;
        };
        if !bucket.contains_key(&identity.id) {
            return;
        }
        if let Some(refs) = Arc::make_mut(bucket).get_mut(&identity.id) {
            refs.retain(|entry| {
                entry.record != inverse.record || entry.relationship != inverse.relationship
            });
        }
    }

    fn clear_inversely_related(&mut self, identity: &RecordIdentity) {
        let Some(bucket) = self.inverse.get_mut(&identity.ty) else {
            return;
        };
        if bucket.contains_key(&identity.id) {
            Arc::make_mut(bucket).remove(&identity.id);
        }
    }

    fn reset(&mut self) {
        self.records.clear();
        self.inverse.clear();
        for ty in &self.declared {
            self.records.insert(ty.clone(), Arc::new(BTreeMap::new()));
            self.inverse.insert(ty.clone(), Arc::new(BTreeMap::new()));
        }
    }
}
