// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation processor contract and schema validation.
//!
//! Processors are pluggable hooks around each operation in a patch. The
//! pipeline composes them in a fixed order (validation, consistency,
//! integrity) and owns the sequencing; processors do not know about each
//! other.
//!
//! All hooks have default no-op implementations, so a processor implements
//! only the phases it cares about.

use crate::accessor::RecordAccessor;
use crate::error::{CacheError, SchemaViolation};
use crate::operation::RecordOperation;
use crate::record::{Record, RelationshipData};
use crate::schema::{RelationshipKind, Schema};

/// Hooks into the patch pipeline, called once per operation in this order:
///
/// 1. [`validate`](Self::validate) — reject the operation before anything
///    runs; a failure aborts the whole patch.
/// 2. [`before`](Self::before) — sub-operations to run immediately, ahead of
///    the main mutation.
/// 3. [`after`](Self::after) — runs *before* the main mutation (so it can
///    read pre-state and adjust the inverse index); returned sub-operations
///    are staged and applied *after* the main mutation.
/// 4. [`immediate`](Self::immediate) — side effects right after the main
///    mutation.
/// 5. [`finally`](Self::finally) — runs last; returned sub-operations are
///    applied immediately.
///
/// Sub-operations recurse through the full pipeline as non-primary
/// operations: their data is not reported, but their inverses accumulate.
pub trait OperationProcessor {
    /// Rejects invalid operations before any state changes.
    ///
    /// # Errors
    /// Returns the error that aborts the patch.
    fn validate(
        &self,
        _schema: &Schema,
        _accessor: &dyn RecordAccessor,
        _operation: &RecordOperation,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    /// Sub-operations to apply immediately, before the main mutation.
    fn before(
        &self,
        _schema: &Schema,
        _accessor: &dyn RecordAccessor,
        _operation: &RecordOperation,
    ) -> Vec<RecordOperation> {
        Vec::new()
    }

    /// Pre-mutation hook; returned sub-operations are staged until after the
    /// main mutation.
    fn after(
        &self,
        _schema: &Schema,
        _accessor: &mut dyn RecordAccessor,
        _operation: &RecordOperation,
    ) -> Vec<RecordOperation> {
        Vec::new()
    }

    /// Side-effect hook invoked right after the main mutation.
    fn immediate(
        &self,
        _schema: &Schema,
        _accessor: &mut dyn RecordAccessor,
        _operation: &RecordOperation,
    ) {
    }

    /// Post-mutation hook; returned sub-operations are applied immediately.
    fn finally(
        &self,
        _schema: &Schema,
        _accessor: &mut dyn RecordAccessor,
        _operation: &RecordOperation,
    ) -> Vec<RecordOperation> {
        Vec::new()
    }
}

/// Enforces schema closure: every type and field an operation mentions must
/// be declared, and relationship edits must match the declared kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidationProcessor;

impl OperationProcessor for SchemaValidationProcessor {
    fn validate(
        &self,
        schema: &Schema,
        _accessor: &dyn RecordAccessor,
        operation: &RecordOperation,
    ) -> Result<(), CacheError> {
        match operation {
            RecordOperation::AddRecord { record } | RecordOperation::ReplaceRecord { record } => {
                validate_record(schema, record)
            }
            RecordOperation::RemoveRecord { record } => {
                require_model(schema, &record.ty).map(|_| ())
            }
            RecordOperation::ReplaceKey { record, key, .. } => {
                let model = require_model(schema, &record.ty)?;
                if !model.keys.contains(key) {
                    return Err(SchemaViolation::UnknownKey {
                        ty: record.ty.clone(),
                        key: key.clone(),
                    }
                    .into());
                }
                Ok(())
            }
            RecordOperation::ReplaceAttribute {
                record, attribute, ..
            } => {
                let model = require_model(schema, &record.ty)?;
                if !model.attributes.contains(attribute) {
                    return Err(SchemaViolation::UnknownAttribute {
                        ty: record.ty.clone(),
                        attribute: attribute.clone(),
                    }
                    .into());
                }
                Ok(())
            }
            RecordOperation::AddToRelatedRecords {
                record,
                relationship,
                related_record,
            }
            | RecordOperation::RemoveFromRelatedRecords {
                record,
                relationship,
                related_record,
            } => {
                require_relationship_kind(schema, record, relationship, RelationshipKind::HasMany)?;
                require_model(schema, &related_record.ty).map(|_| ())
            }
            RecordOperation::ReplaceRelatedRecords {
                record,
                relationship,
                related_records,
            } => {
                require_relationship_kind(schema, record, relationship, RelationshipKind::HasMany)?;
                for related in related_records {
                    require_model(schema, &related.ty)?;
                }
                Ok(())
            }
            RecordOperation::ReplaceRelatedRecord {
                record,
                relationship,
                related_record,
            } => {
                require_relationship_kind(schema, record, relationship, RelationshipKind::HasOne)?;
                if let Some(related) = related_record {
                    require_model(schema, &related.ty)?;
                }
                Ok(())
            }
        }
    }
}

fn require_model<'a>(
    schema: &'a Schema,
    ty: &str,
) -> Result<&'a crate::schema::ModelDef, CacheError> {
    schema.model(ty).ok_or_else(|| {
        SchemaViolation::UnknownModel { ty: ty.to_owned() }.into()
    })
}

fn require_relationship_kind(
    schema: &Schema,
    record: &crate::ident::RecordIdentity,
    relationship: &str,
    expected: RelationshipKind,
) -> Result<(), CacheError> {
    let model = require_model(schema, &record.ty)?;
    let Some(def) = model.relationships.get(relationship) else {
        return Err(SchemaViolation::UnknownRelationship {
            ty: record.ty.clone(),
            relationship: relationship.to_owned(),
        }
        .into());
    };
    if def.kind != expected {
        return Err(SchemaViolation::RelationshipKindMismatch {
            ty: record.ty.clone(),
            relationship: relationship.to_owned(),
            expected,
            actual: def.kind,
        }
        .into());
    }
    Ok(())
}

fn validate_record(schema: &Schema, record: &Record) -> Result<(), CacheError> {
    let model = require_model(schema, &record.identity.ty)?;
    for key in record.keys.keys() {
        if !model.keys.contains(key) {
            return Err(SchemaViolation::UnknownKey {
                ty: record.identity.ty.clone(),
                key: key.clone(),
            }
            .into());
        }
    }
    for attribute in record.attributes.keys() {
        if !model.attributes.contains(attribute) {
            return Err(SchemaViolation::UnknownAttribute {
                ty: record.identity.ty.clone(),
                attribute: attribute.clone(),
            }
            .into());
        }
    }
    for (name, data) in &record.relationships {
        let Some(def) = model.relationships.get(name) else {
            return Err(SchemaViolation::UnknownRelationship {
                ty: record.identity.ty.clone(),
                relationship: name.clone(),
            }
            .into());
        };
        let actual = match data {
            RelationshipData::One(_) => RelationshipKind::HasOne,
            RelationshipData::Many(_) => RelationshipKind::HasMany,
        };
        if def.kind != actual {
            return Err(SchemaViolation::RelationshipKindMismatch {
                ty: record.identity.ty.clone(),
                relationship: name.clone(),
                expected: def.kind,
                actual,
            }
            .into());
        }
        for related in data.identities() {
            require_model(schema, &related.ty)?;
        }
    }
    Ok(())
}
