// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Inverse-patch operators: pre-image a pending mutation into its undo.
//!
//! Each operator inspects the accessor *before* the forward mutation runs and
//! returns the operation that would undo it, or `None` when the pending
//! mutation is meaningless against current state (a no-op). The pipeline
//! treats an absent inverse as "skip the main operator" as well — the two
//! meanings are intentionally coupled (see the design notes).
//!
//! All inverse operators are pure reads; none mutate the accessor.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::accessor::RecordAccessor;
use crate::error::CacheError;
use crate::operation::{OperationKind, RecordOperation};
use crate::record::{identity_multiset_eq, Record};

/// An inverse-patch operator: reads current state, emits the undo op.
pub type InverseOperator = fn(&dyn RecordAccessor, &RecordOperation) -> Option<RecordOperation>;

/// Dispatch table mapping operation tags to inverse operators.
pub struct InverseOperators {
    entries: BTreeMap<OperationKind, InverseOperator>,
}

impl InverseOperators {
    /// Builds the standard table covering every operation kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut entries: BTreeMap<OperationKind, InverseOperator> = BTreeMap::new();
        entries.insert(OperationKind::AddRecord, add_record_inverse);
        entries.insert(OperationKind::ReplaceRecord, replace_record_inverse);
        entries.insert(OperationKind::RemoveRecord, remove_record_inverse);
        entries.insert(OperationKind::ReplaceKey, replace_key_inverse);
        entries.insert(OperationKind::ReplaceAttribute, replace_attribute_inverse);
        entries.insert(
            OperationKind::AddToRelatedRecords,
            add_to_related_records_inverse,
        );
        entries.insert(
            OperationKind::RemoveFromRelatedRecords,
            remove_from_related_records_inverse,
        );
        entries.insert(
            OperationKind::ReplaceRelatedRecords,
            replace_related_records_inverse,
        );
        entries.insert(
            OperationKind::ReplaceRelatedRecord,
            replace_related_record_inverse,
        );
        Self { entries }
    }

    /// Looks up the inverse operator for `kind`.
    ///
    /// # Errors
    /// Returns [`CacheError::OperatorNotFound`] when no operator is
    /// registered for `kind`.
    pub fn get(&self, kind: OperationKind) -> Result<InverseOperator, CacheError> {
        self.entries
            .get(&kind)
            .copied()
            .ok_or_else(|| CacheError::OperatorNotFound {
                tag: kind.name().to_owned(),
            })
    }
}

fn add_record_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::AddRecord { record } = operation else {
        unreachable!("addRecord inverse dispatched for {}", operation.kind());
    };
    match accessor.record(&record.identity) {
        None => Some(RecordOperation::RemoveRecord {
            record: record.identity.clone(),
        }),
        Some(current) if current == record => None,
        Some(current) => Some(RecordOperation::ReplaceRecord {
            record: current.clone(),
        }),
    }
}

fn replace_record_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::ReplaceRecord { record } = operation else {
        unreachable!("replaceRecord inverse dispatched for {}", operation.kind());
    };
    let Some(current) = accessor.record(&record.identity) else {
        return Some(RecordOperation::RemoveRecord {
            record: record.identity.clone(),
        });
    };

    // Delta inverse: only fields mentioned by the incoming record that differ
    // from current state, carrying the current value (null when absent).
    let mut inverse = Record::skeleton(record.identity.clone());
    for (name, value) in &record.attributes {
        let current_value = current.attributes.get(name);
        if current_value != Some(value) {
            inverse.attributes.insert(
                name.clone(),
                current_value.cloned().unwrap_or(Value::Null),
            );
        }
    }
    for (name, value) in &record.keys {
        let current_value = current.keys.get(name);
        if current_value != Some(value) {
            inverse
                .keys
                .insert(name.clone(), current_value.cloned().unwrap_or(None));
        }
    }
    for (name, data) in &record.relationships {
        let current_data = current.relationships.get(name);
        let differs = match current_data {
            Some(current_data) => !current_data.same_data(data),
            // An absent relationship equals a null/empty payload of either shape.
            None => data.identities().next().is_some(),
        };
        if differs {
            inverse.relationships.insert(
                name.clone(),
                current_data.cloned().unwrap_or_else(|| data.empty_like()),
            );
        }
    }

    if inverse.attributes.is_empty()
        && inverse.keys.is_empty()
        && inverse.relationships.is_empty()
    {
        None
    } else {
        Some(RecordOperation::ReplaceRecord { record: inverse })
    }
}

fn remove_record_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::RemoveRecord { record } = operation else {
        unreachable!("removeRecord inverse dispatched for {}", operation.kind());
    };
    accessor
        .record(record)
        .map(|current| RecordOperation::AddRecord {
            record: current.clone(),
        })
}

fn replace_key_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::ReplaceKey { record, key, value } = operation else {
        unreachable!("replaceKey inverse dispatched for {}", operation.kind());
    };
    let current = accessor
        .record(record)
        .and_then(|stored| stored.keys.get(key).cloned());
    if current.as_ref() == Some(value) {
        return None;
    }
    Some(RecordOperation::ReplaceKey {
        record: record.clone(),
        key: key.clone(),
        value: current.flatten(),
    })
}

fn replace_attribute_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::ReplaceAttribute {
        record,
        attribute,
        value,
    } = operation
    else {
        unreachable!(
            "replaceAttribute inverse dispatched for {}",
            operation.kind()
        );
    };
    let current = accessor
        .record(record)
        .and_then(|stored| stored.attributes.get(attribute).cloned());
    if current.as_ref() == Some(value) {
        return None;
    }
    Some(RecordOperation::ReplaceAttribute {
        record: record.clone(),
        attribute: attribute.clone(),
        value: current.unwrap_or(Value::Null),
    })
}

fn add_to_related_records_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::AddToRelatedRecords {
        record,
        relationship,
        related_record,
    } = operation
    else {
        unreachable!(
            "addToRelatedRecords inverse dispatched for {}",
            operation.kind()
        );
    };
    if accessor.related_records_include(record, relationship, related_record) {
        return None;
    }
    Some(RecordOperation::RemoveFromRelatedRecords {
        record: record.clone(),
        relationship: relationship.clone(),
        related_record: related_record.clone(),
    })
}

fn remove_from_related_records_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::RemoveFromRelatedRecords {
        record,
        relationship,
        related_record,
    } = operation
    else {
        unreachable!(
            "removeFromRelatedRecords inverse dispatched for {}",
            operation.kind()
        );
    };
    if accessor.related_records_include(record, relationship, related_record) {
        Some(RecordOperation::AddToRelatedRecords {
            record: record.clone(),
            relationship: relationship.clone(),
            related_record: related_record.clone(),
        })
    } else {
        None
    }
}

fn replace_related_records_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::ReplaceRelatedRecords {
        record,
        relationship,
        related_records,
    } = operation
    else {
        unreachable!(
            "replaceRelatedRecords inverse dispatched for {}",
            operation.kind()
        );
    };
    let current = accessor
        .related_records(record, relationship)
        .unwrap_or_default();
    if identity_multiset_eq(&current, related_records) {
        return None;
    }
    Some(RecordOperation::ReplaceRelatedRecords {
        record: record.clone(),
        relationship: relationship.clone(),
        related_records: current,
    })
}

fn replace_related_record_inverse(
    accessor: &dyn RecordAccessor,
    operation: &RecordOperation,
) -> Option<RecordOperation> {
    let RecordOperation::ReplaceRelatedRecord {
        record,
        relationship,
        related_record,
    } = operation
    else {
        unreachable!(
            "replaceRelatedRecord inverse dispatched for {}",
            operation.kind()
        );
    };
    let current = accessor.related_record(record, relationship).flatten();
    if current == *related_record {
        return None;
    }
    Some(RecordOperation::ReplaceRelatedRecord {
        record: record.clone(),
        relationship: relationship.clone(),
        related_record: current,
    })
}
