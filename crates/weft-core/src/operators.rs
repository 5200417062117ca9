// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Forward patch operators: one pure mutation function per operation kind.
//!
//! Operators realize an operation against the accessor and return the
//! resulting record (the stored post-state, or the prior record for
//! removals). They are only ever invoked by the pipeline *after* the inverse
//! operator produced an inverse — the "no inverse" case doubles as "skip the
//! main operator", so operators may assume the mutation is meaningful.

use std::collections::BTreeMap;

use crate::accessor::RecordAccessor;
use crate::error::CacheError;
use crate::operation::{OperationKind, RecordOperation};
use crate::record::{merge_records, Record, RelationshipData};

/// A forward patch operator.
///
/// Returns the record the operation produced: the stored record for writes,
/// the removed record for `removeRecord`.
pub type PatchOperator = fn(&mut dyn RecordAccessor, &RecordOperation) -> Option<Record>;

/// Dispatch table mapping operation tags to forward operators.
///
/// The table is fixed at construction ([`PatchOperators::standard`] registers
/// every kind); a lookup miss surfaces as [`CacheError::OperatorNotFound`].
pub struct PatchOperators {
    entries: BTreeMap<OperationKind, PatchOperator>,
}

impl PatchOperators {
    /// Builds the standard table covering every operation kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut entries: BTreeMap<OperationKind, PatchOperator> = BTreeMap::new();
        entries.insert(OperationKind::AddRecord, add_record);
        entries.insert(OperationKind::ReplaceRecord, replace_record);
        entries.insert(OperationKind::RemoveRecord, remove_record);
        entries.insert(OperationKind::ReplaceKey, replace_key);
        entries.insert(OperationKind::ReplaceAttribute, replace_attribute);
        entries.insert(OperationKind::AddToRelatedRecords, add_to_related_records);
        entries.insert(
            OperationKind::RemoveFromRelatedRecords,
            remove_from_related_records,
        );
        entries.insert(
            OperationKind::ReplaceRelatedRecords,
            replace_related_records,
        );
        entries.insert(OperationKind::ReplaceRelatedRecord, replace_related_record);
        Self { entries }
    }

    /// Looks up the operator for `kind`.
    ///
    /// # Errors
    /// Returns [`CacheError::OperatorNotFound`] when no operator is
    /// registered for `kind`.
    pub fn get(&self, kind: OperationKind) -> Result<PatchOperator, CacheError> {
        self.entries
            .get(&kind)
            .copied()
            .ok_or_else(|| CacheError::OperatorNotFound {
                tag: kind.name().to_owned(),
            })
    }
}

/// Loads the current record for `identity` or synthesizes a bare skeleton.
fn load_or_skeleton(accessor: &dyn RecordAccessor, identity: &crate::ident::RecordIdentity) -> Record {
    accessor
        .record(identity)
        .cloned()
        .unwrap_or_else(|| Record::skeleton(identity.clone()))
}

fn add_record(accessor: &mut dyn RecordAccessor, operation: &RecordOperation) -> Option<Record> {
    let RecordOperation::AddRecord { record } = operation else {
        unreachable!("addRecord operator dispatched for {}", operation.kind());
    };
    accessor.set_record(record.clone());
    Some(record.clone())
}

fn replace_record(accessor: &mut dyn RecordAccessor, operation: &RecordOperation) -> Option<Record> {
    let RecordOperation::ReplaceRecord { record } = operation else {
        unreachable!("replaceRecord operator dispatched for {}", operation.kind());
    };
    let merged = match accessor.record(&record.identity) {
        Some(existing) => merge_records(existing, record),
        None => record.clone(),
    };
    accessor.set_record(merged.clone());
    Some(merged)
}

fn remove_record(accessor: &mut dyn RecordAccessor, operation: &RecordOperation) -> Option<Record> {
    let RecordOperation::RemoveRecord { record } = operation else {
        unreachable!("removeRecord operator dispatched for {}", operation.kind());
    };
    accessor.remove_record(record)
}

fn replace_key(accessor: &mut dyn RecordAccessor, operation: &RecordOperation) -> Option<Record> {
    let RecordOperation::ReplaceKey { record, key, value } = operation else {
        unreachable!("replaceKey operator dispatched for {}", operation.kind());
    };
    let mut stored = load_or_skeleton(&*accessor, record);
    stored.keys.insert(key.clone(), value.clone());
    accessor.set_record(stored.clone());
    Some(stored)
}

fn replace_attribute(
    accessor: &mut dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<Record> {
    let RecordOperation::ReplaceAttribute {
        record,
        attribute,
        value,
    } = operation
    else {
        unreachable!(
            "replaceAttribute operator dispatched for {}",
            operation.kind()
        );
    };
    let mut stored = load_or_skeleton(&*accessor, record);
    stored.attributes.insert(attribute.clone(), value.clone());
    accessor.set_record(stored.clone());
    Some(stored)
}

fn add_to_related_records(
    accessor: &mut dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<Record> {
    let RecordOperation::AddToRelatedRecords {
        record,
        relationship,
        related_record,
    } = operation
    else {
        unreachable!(
            "addToRelatedRecords operator dispatched for {}",
            operation.kind()
        );
    };
    let mut stored = load_or_skeleton(&*accessor, record);
    match stored.relationships.get_mut(relationship) {
        Some(RelationshipData::Many(members)) => members.push(related_record.clone()),
        _ => {
            stored.relationships.insert(
                relationship.clone(),
                RelationshipData::Many(vec![related_record.clone()]),
            );
        }
    }
    accessor.set_record(stored.clone());
    Some(stored)
}

fn remove_from_related_records(
    accessor: &mut dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<Record> {
    let RecordOperation::RemoveFromRelatedRecords {
        record,
        relationship,
        related_record,
    } = operation
    else {
        unreachable!(
            "removeFromRelatedRecords operator dispatched for {}",
            operation.kind()
        );
    };
    let mut stored = accessor.record(record).cloned()?;
    if let Some(RelationshipData::Many(members)) = stored.relationships.get_mut(relationship) {
        members.retain(|member| member != related_record);
    }
    accessor.set_record(stored.clone());
    Some(stored)
}

fn replace_related_records(
    accessor: &mut dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<Record> {
    let RecordOperation::ReplaceRelatedRecords {
        record,
        relationship,
        related_records,
    } = operation
    else {
        unreachable!(
            "replaceRelatedRecords operator dispatched for {}",
            operation.kind()
        );
    };
    let mut stored = load_or_skeleton(&*accessor, record);
    stored.relationships.insert(
        relationship.clone(),
        RelationshipData::Many(related_records.clone()),
    );
    accessor.set_record(stored.clone());
    Some(stored)
}

fn replace_related_record(
    accessor: &mut dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<Record> {
    let RecordOperation::ReplaceRelatedRecord {
        record,
        relationship,
        related_record,
    } = operation
    else {
        unreachable!(
            "replaceRelatedRecord operator dispatched for {}",
            operation.kind()
        );
    };
    let mut stored = load_or_skeleton(&*accessor, record);
    stored.relationships.insert(
        relationship.clone(),
        RelationshipData::One(related_record.clone()),
    );
    accessor.set_record(stored.clone());
    Some(stored)
}
