// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema consistency: propagates relationship edits to the inverse side.
//!
//! For every relationship `R` with a declared inverse `R'`, a change on side
//! A injects the matching change on side B: additions become additions (or
//! `hasOne` assignments), removals become removals (or null assignments).
//!
//! All injections are staged through `after`: they are computed against
//! pre-mutation state and applied after the main mutation. The cascade is
//! self-terminating — a propagated op that arrives back where it started
//! finds the pointer already in place, produces no inverse, and is skipped
//! by the pipeline.

use crate::accessor::RecordAccessor;
use crate::ident::RecordIdentity;
use crate::operation::RecordOperation;
use crate::processor::OperationProcessor;
use crate::record::identity_difference;
use crate::schema::{RelationshipKind, Schema};

/// Maintains inverse-relationship symmetry by injecting propagation ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaConsistencyProcessor;

impl OperationProcessor for SchemaConsistencyProcessor {
    fn after(
        &self,
        schema: &Schema,
        accessor: &mut dyn RecordAccessor,
        operation: &RecordOperation,
    ) -> Vec<RecordOperation> {
        match operation {
            RecordOperation::AddToRelatedRecords {
                record,
                relationship,
                related_record,
            } => attach_op(schema, record, relationship, related_record)
                .into_iter()
                .collect(),
            RecordOperation::RemoveFromRelatedRecords {
                record,
                relationship,
                related_record,
            } => detach_op(schema, &*accessor, record, relationship, related_record)
                .into_iter()
                .collect(),
            RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                related_record,
            } => {
                let current = accessor.related_record(record, relationship).flatten();
                let mut ops = Vec::new();
                if let Some(previous) = &current {
                    if Some(previous) != related_record.as_ref() {
                        ops.extend(detach_op(schema, &*accessor, record, relationship, previous));
                    }
                }
                if let Some(next) = related_record {
                    if current.as_ref() != Some(next) {
                        ops.extend(attach_op(schema, record, relationship, next));
                    }
                }
                ops
            }
            RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                related_records,
            } => {
                let current = accessor
                    .related_records(record, relationship)
                    .unwrap_or_default();
                let mut ops = Vec::new();
                for removed in identity_difference(&current, related_records) {
                    ops.extend(detach_op(schema, &*accessor, record, relationship, &removed));
                }
                for added in identity_difference(related_records, &current) {
                    ops.extend(attach_op(schema, record, relationship, &added));
                }
                ops
            }
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                let replace_wholesale = matches!(operation, RecordOperation::AddRecord { .. });
                record_delta_ops(schema, &*accessor, record, replace_wholesale)
            }
            RecordOperation::RemoveRecord { record } => {
                let Some(current) = accessor.record(record).cloned() else {
                    return Vec::new();
                };
                let mut ops = Vec::new();
                for (relationship, data) in &current.relationships {
                    for target in data.identities() {
                        ops.extend(detach_op(schema, &*accessor, record, relationship, target));
                    }
                }
                ops
            }
            RecordOperation::ReplaceKey { .. } | RecordOperation::ReplaceAttribute { .. } => {
                Vec::new()
            }
        }
    }
}

/// Injection for "`record.relationship` now includes `related`": the peer
/// gains the dual pointer.
fn attach_op(
    schema: &Schema,
    record: &RecordIdentity,
    relationship: &str,
    related: &RecordIdentity,
) -> Option<RecordOperation> {
    let link = schema.inverse_relationship(&record.ty, relationship)?;
    Some(match link.kind {
        RelationshipKind::HasMany => RecordOperation::AddToRelatedRecords {
            record: related.clone(),
            relationship: link.name.to_owned(),
            related_record: record.clone(),
        },
        RelationshipKind::HasOne => RecordOperation::ReplaceRelatedRecord {
            record: related.clone(),
            relationship: link.name.to_owned(),
            related_record: Some(record.clone()),
        },
    })
}

/// Injection for "`record.relationship` no longer includes `related`": the
/// peer drops the dual pointer.
///
/// A `hasOne` dual is only nulled while it still points at `record`;
/// otherwise a later assignment in the same cascade would be clobbered.
fn detach_op(
    schema: &Schema,
    accessor: &dyn RecordAccessor,
    record: &RecordIdentity,
    relationship: &str,
    related: &RecordIdentity,
) -> Option<RecordOperation> {
    let link = schema.inverse_relationship(&record.ty, relationship)?;
    match link.kind {
        RelationshipKind::HasMany => Some(RecordOperation::RemoveFromRelatedRecords {
            record: related.clone(),
            relationship: link.name.to_owned(),
            related_record: record.clone(),
        }),
        RelationshipKind::HasOne => {
            if accessor.related_record_eq(related, link.name, Some(record)) {
                Some(RecordOperation::ReplaceRelatedRecord {
                    record: related.clone(),
                    relationship: link.name.to_owned(),
                    related_record: None,
                })
            } else {
                None
            }
        }
    }
}

/// Propagation for record-level writes: for each declared relationship with
/// an inverse, diff the incoming payload against current state and inject
/// attach/detach ops for the delta.
///
/// `replace_wholesale` distinguishes `addRecord` (unmentioned relationships
/// are dropped by the main operator, so they count as removals) from
/// `replaceRecord` (unmentioned relationships survive the merge untouched).
fn record_delta_ops(
    schema: &Schema,
    accessor: &dyn RecordAccessor,
    record: &crate::record::Record,
    replace_wholesale: bool,
) -> Vec<RecordOperation> {
    let Some(model) = schema.model(&record.identity.ty) else {
        return Vec::new();
    };
    let mut ops = Vec::new();
    for (relationship, def) in &model.relationships {
        if def.inverse.is_none() {
            continue;
        }
        let mentioned = record.relationships.get(relationship);
        if mentioned.is_none() && !replace_wholesale {
            continue;
        }
        let next: Vec<RecordIdentity> = mentioned
            .map(|data| data.identities().cloned().collect())
            .unwrap_or_default();
        let current: Vec<RecordIdentity> = match def.kind {
            RelationshipKind::HasMany => accessor
                .related_records(&record.identity, relationship)
                .unwrap_or_default(),
            RelationshipKind::HasOne => accessor
                .related_record(&record.identity, relationship)
                .flatten()
                .into_iter()
                .collect(),
        };
        for removed in identity_difference(&current, &next) {
            ops.extend(detach_op(
                schema,
                accessor,
                &record.identity,
                relationship,
                &removed,
            ));
        }
        for added in identity_difference(&next, &current) {
            ops.extend(attach_op(schema, &record.identity, relationship, &added));
        }
    }
    ops
}
