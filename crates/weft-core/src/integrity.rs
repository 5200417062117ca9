// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache integrity: maintains the inverse-relationship index and cleans up
//! dead references.
//!
//! The index is the authoritative structure for "who points at me": entry
//! `(owner, relationship)` stored at identity `x` mirrors the forward pointer
//! `owner.relationship ∋ x`. Entries exist only for relationships with a
//! declared inverse.
//!
//! `after` runs before the main mutation and deletes the entries for
//! pointers about to be dropped; `finally` runs after and inserts entries
//! for the pointers now in place. Removing a record additionally returns
//! cleanup ops that erase every forward pointer aimed at it.

use crate::accessor::RecordAccessor;
use crate::ident::{InverseRef, RecordIdentity};
use crate::operation::RecordOperation;
use crate::processor::OperationProcessor;
use crate::record::Record;
use crate::schema::{RelationshipKind, Schema};

/// Maintains the inverse-relationship index and referential integrity on
/// removal.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheIntegrityProcessor;

impl OperationProcessor for CacheIntegrityProcessor {
    fn after(
        &self,
        schema: &Schema,
        accessor: &mut dyn RecordAccessor,
        operation: &RecordOperation,
    ) -> Vec<RecordOperation> {
        match operation {
            RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                ..
            } => {
                if schema
                    .inverse_relationship(&record.ty, relationship)
                    .is_some()
                {
                    if let Some(previous) = accessor.related_record(record, relationship).flatten()
                    {
                        accessor.remove_inversely_related(
                            &previous,
                            &InverseRef::new(record.clone(), relationship.clone()),
                        );
                    }
                }
                Vec::new()
            }
            RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                ..
            } => {
                if schema
                    .inverse_relationship(&record.ty, relationship)
                    .is_some()
                {
                    let previous = accessor
                        .related_records(record, relationship)
                        .unwrap_or_default();
                    for target in previous {
                        accessor.remove_inversely_related(
                            &target,
                            &InverseRef::new(record.clone(), relationship.clone()),
                        );
                    }
                }
                Vec::new()
            }
            RecordOperation::RemoveFromRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                if schema
                    .inverse_relationship(&record.ty, relationship)
                    .is_some()
                    && accessor.related_records_include(record, relationship, related_record)
                {
                    accessor.remove_inversely_related(
                        related_record,
                        &InverseRef::new(record.clone(), relationship.clone()),
                    );
                }
                Vec::new()
            }
            RecordOperation::RemoveRecord { record } => {
                let mut ops = Vec::new();
                // Every forward pointer aimed at this record gets erased on
                // its owner; this realizes referential integrity on removal.
                for back_ref in accessor.inversely_related(record) {
                    match schema
                        .relationship(&back_ref.record.ty, &back_ref.relationship)
                        .map(|def| def.kind)
                    {
                        Some(RelationshipKind::HasMany) => {
                            ops.push(RecordOperation::RemoveFromRelatedRecords {
                                record: back_ref.record,
                                relationship: back_ref.relationship,
                                related_record: record.clone(),
                            });
                        }
                        Some(RelationshipKind::HasOne) => {
                            ops.push(RecordOperation::ReplaceRelatedRecord {
                                record: back_ref.record,
                                relationship: back_ref.relationship,
                                related_record: None,
                            });
                        }
                        // Stale entry for a relationship no longer declared.
                        None => {}
                    }
                }
                if let Some(current) = accessor.record(record).cloned() {
                    remove_outbound_entries(schema, accessor, &current);
                }
                ops
            }
            RecordOperation::ReplaceRecord { record } => {
                // Outbound entries are re-inserted in `finally` from the
                // merged record.
                if let Some(current) = accessor.record(&record.identity).cloned() {
                    remove_outbound_entries(schema, accessor, &current);
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn finally(
        &self,
        schema: &Schema,
        accessor: &mut dyn RecordAccessor,
        operation: &RecordOperation,
    ) -> Vec<RecordOperation> {
        match operation {
            RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                related_record: Some(target),
            } => {
                if schema
                    .inverse_relationship(&record.ty, relationship)
                    .is_some()
                {
                    accessor.add_inversely_related(
                        target,
                        InverseRef::new(record.clone(), relationship.clone()),
                    );
                }
            }
            RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                related_records,
            } => {
                if schema
                    .inverse_relationship(&record.ty, relationship)
                    .is_some()
                {
                    for target in related_records {
                        accessor.add_inversely_related(
                            target,
                            InverseRef::new(record.clone(), relationship.clone()),
                        );
                    }
                }
            }
            RecordOperation::AddToRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                if schema
                    .inverse_relationship(&record.ty, relationship)
                    .is_some()
                {
                    accessor.add_inversely_related(
                        related_record,
                        InverseRef::new(record.clone(), relationship.clone()),
                    );
                }
            }
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                // Read the post-mutation record: for merges it differs from
                // the operation payload.
                if let Some(stored) = accessor.record(&record.identity).cloned() {
                    add_outbound_entries(schema, accessor, &stored);
                }
            }
            _ => {}
        }
        Vec::new()
    }
}

/// Deletes the index entries for every pointer `record` currently holds
/// through relationships with a declared inverse.
fn remove_outbound_entries(schema: &Schema, accessor: &mut dyn RecordAccessor, record: &Record) {
    for_each_outbound(schema, record, |target, relationship| {
        accessor.remove_inversely_related(
            target,
            &InverseRef::new(record.identity.clone(), relationship),
        );
    });
}

/// Inserts index entries for every pointer `record` holds through
/// relationships with a declared inverse.
fn add_outbound_entries(schema: &Schema, accessor: &mut dyn RecordAccessor, record: &Record) {
    for_each_outbound(schema, record, |target, relationship| {
        accessor.add_inversely_related(
            target,
            InverseRef::new(record.identity.clone(), relationship),
        );
    });
}

fn for_each_outbound(
    schema: &Schema,
    record: &Record,
    mut visit: impl FnMut(&RecordIdentity, String),
) {
    for (relationship, data) in &record.relationships {
        if schema
            .inverse_relationship(&record.identity.ty, relationship)
            .is_none()
        {
            continue;
        }
        for target in data.identities() {
            visit(target, relationship.clone());
        }
    }
}
