// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Primitive read/write surface over a typed record store and its
//! inverse-relationship index.
//!
//! Concrete backends plug in different storage strategies (see
//! [`crate::MemoryAccessor`] and [`crate::SharedAccessor`]); the patch
//! pipeline and the query evaluator only ever speak this trait. Every
//! implementation must uphold the store invariants: records stored under a
//! type bucket carry that type, a bucket never holds two records with the
//! same id, and back-ref lists exist only for identities that have (or had)
//! inbound pointers.

use crate::ident::{InverseRef, RecordIdentity};
use crate::record::{Record, RelationshipData};

/// Primitive accessor over a record store plus an inverse-relationship index.
///
/// All operations are synchronous and infallible. `record` distinguishes
/// "absent" from "present but empty": a stored skeleton record returns
/// `Some`, a never-stored identity returns `None`.
///
/// The derived helpers (`related_record` and friends) are pure functions over
/// `record` and must not be overridden with semantics that disagree with the
/// primitives.
pub trait RecordAccessor {
    /// Returns the record stored for `identity`, if any.
    fn record(&self, identity: &RecordIdentity) -> Option<&Record>;

    /// Returns every record stored under type `ty`.
    ///
    /// Order is unspecified; callers must not assume insertion order.
    fn records(&self, ty: &str) -> Vec<&Record>;

    /// Inserts or replaces `record` in its type bucket.
    fn set_record(&mut self, record: Record);

    /// Bulk upsert into the bucket for `ty`.
    ///
    /// All records must already carry `identity.ty == ty`. No pipeline
    /// operator calls this; it exists for backend loaders.
    fn set_records(&mut self, ty: &str, records: Vec<Record>);

    /// Removes the record for `identity`, returning the prior record if one
    /// was present.
    fn remove_record(&mut self, identity: &RecordIdentity) -> Option<Record>;

    /// Removes every listed identity from the bucket for `ty`, returning the
    /// prior records that existed.
    fn remove_records(&mut self, ty: &str, identities: &[RecordIdentity]) -> Vec<Record>;

    /// Returns the back-refs recorded against `identity`.
    fn inversely_related(&self, identity: &RecordIdentity) -> Vec<InverseRef>;

    /// Appends a back-ref for `identity`.
    ///
    /// Duplicates are not collapsed; correct pipeline use does not create
    /// them.
    fn add_inversely_related(&mut self, identity: &RecordIdentity, inverse: InverseRef);

    /// Removes every back-ref for `identity` matching `inverse`'s owner and
    /// relationship.
    fn remove_inversely_related(&mut self, identity: &RecordIdentity, inverse: &InverseRef);

    /// Clears the entire back-ref list for `identity`.
    fn clear_inversely_related(&mut self, identity: &RecordIdentity);

    /// Clears the store and index back to empty, schema-declared buckets.
    fn reset(&mut self);

    /// Reads the `hasOne` pointer of `relationship` on `identity`.
    ///
    /// `None` means the record or the relationship is absent (or has
    /// `hasMany` shape); `Some(None)` is an explicit null pointer.
    fn related_record(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
    ) -> Option<Option<RecordIdentity>> {
        match self.record(identity)?.relationships.get(relationship)? {
            RelationshipData::One(data) => Some(data.clone()),
            RelationshipData::Many(_) => None,
        }
    }

    /// Reads the `hasMany` members of `relationship` on `identity`, in stored
    /// order. `None` means the record or relationship is absent (or has
    /// `hasOne` shape).
    fn related_records(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
    ) -> Option<Vec<RecordIdentity>> {
        match self.record(identity)?.relationships.get(relationship)? {
            RelationshipData::Many(data) => Some(data.clone()),
            RelationshipData::One(_) => None,
        }
    }

    /// Returns `true` when the `hasOne` pointer of `relationship` on
    /// `identity` equals `expected`. An absent record or relationship counts
    /// as a null pointer.
    fn related_record_eq(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
        expected: Option<&RecordIdentity>,
    ) -> bool {
        match self.related_record(identity, relationship) {
            Some(current) => current.as_ref() == expected,
            None => expected.is_none(),
        }
    }

    /// Returns `true` when the `hasMany` members of `relationship` on
    /// `identity` include `needle`.
    fn related_records_include(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
        needle: &RecordIdentity,
    ) -> bool {
        self.related_records(identity, relationship)
            .is_some_and(|members| members.contains(needle))
    }
}
