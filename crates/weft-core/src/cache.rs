// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The record cache: patch pipeline, query dispatch, and event emission.
//!
//! # Patch pipeline
//!
//! Each operation flows through a fixed sequence:
//!
//! 1. every processor's `validate` (failure aborts the whole patch),
//! 2. the inverse operator pre-images the mutation; an absent inverse means
//!    the operation is a no-op — the main operator is skipped and a primary
//!    operation reports `None` data,
//! 3. the inverse is collected,
//! 4. `before` sub-operations recurse immediately,
//! 5. `after` hooks run (pre-mutation) and their sub-operations are staged,
//! 6. the main operator mutates the store,
//! 7. `immediate` hooks run,
//! 8. the `patch` event is emitted,
//! 9. staged `after` sub-operations recurse,
//! 10. `finally` hooks run and their sub-operations recurse.
//!
//! Sub-operations are non-primary: their inverses accumulate but their data
//! is not reported. After the batch, the inverse list is reversed so that
//! applying it front-to-back undoes the batch.
//!
//! # Failure
//!
//! Errors escape immediately and nothing is rolled back; operations applied
//! earlier in the batch stay applied. The pipeline is meant to be driven
//! with pre-validated data — callers needing atomicity keep their own
//! transaction discipline around `patch`.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::accessor::RecordAccessor;
use crate::consistency::SchemaConsistencyProcessor;
use crate::error::CacheError;
use crate::ident::RecordIdentity;
use crate::integrity::CacheIntegrityProcessor;
use crate::inverse::InverseOperators;
use crate::keymap::KeyMap;
use crate::memory::MemoryAccessor;
use crate::observer::CacheObserver;
use crate::operation::{OperationKind, RecordOperation};
use crate::operators::PatchOperators;
use crate::processor::{OperationProcessor, SchemaValidationProcessor};
use crate::query::{QueryExpression, QueryOperators, QueryResult};
use crate::record::Record;
use crate::schema::Schema;
use crate::settings::CacheSettings;
use crate::shared::SharedAccessor;

/// Outcome of a patch: the undo sequence plus per-primary-operation data.
///
/// `data` holds one entry per primary operation, in order: the record the
/// operation produced, or `None` when the operation was a no-op. Applying
/// `inverse` front-to-back against the post-patch store restores the
/// pre-patch store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatchResult {
    /// Undo operations, ordered so that `inverse[0]` undoes the last applied
    /// effect.
    pub inverse: Vec<RecordOperation>,
    /// Resulting record (or `None` for no-ops) per primary operation.
    pub data: Vec<Option<Record>>,
}

/// Synchronous, in-memory record-graph cache.
///
/// Owns its record store and inverse-relationship index exclusively; the
/// schema is a shared read handle. The accessor backend is pluggable — the
/// default [`MemoryAccessor`] mutates directly, while [`SharedAccessor`]
/// supports cheap forking.
pub struct RecordCache<A: RecordAccessor = MemoryAccessor> {
    schema: Arc<Schema>,
    accessor: A,
    settings: CacheSettings,
    processors: Vec<Box<dyn OperationProcessor>>,
    patch_operators: PatchOperators,
    inverse_operators: InverseOperators,
    query_operators: QueryOperators,
    key_map: Option<Box<dyn KeyMap>>,
    observers: Vec<Box<dyn CacheObserver>>,
}

impl RecordCache<MemoryAccessor> {
    /// Creates a cache over a fresh in-memory accessor.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        let accessor = MemoryAccessor::new(&schema);
        Self::with_accessor(schema, accessor)
    }
}

impl RecordCache<SharedAccessor> {
    /// Creates a cache over a fresh structurally-shared accessor.
    #[must_use]
    pub fn new_shared(schema: Arc<Schema>) -> Self {
        let accessor = SharedAccessor::new(&schema);
        Self::with_accessor(schema, accessor)
    }

    /// Creates a cache sharing this cache's current state (bucket-level
    /// copy-on-write; see [`SharedAccessor::fork`]). Observers and the key
    /// map are not carried over.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self::with_settings(self.schema.clone(), self.accessor.fork(), self.settings)
    }

    /// Resets this cache to share `base`'s state, then emits `reset`.
    pub fn reset_from(&mut self, base: &Self) {
        self.accessor.reset_from(&base.accessor);
        self.emit_reset();
    }
}

impl<A: RecordAccessor> RecordCache<A> {
    /// Creates a cache over the given accessor with default settings.
    #[must_use]
    pub fn with_accessor(schema: Arc<Schema>, accessor: A) -> Self {
        Self::with_settings(schema, accessor, CacheSettings::default())
    }

    /// Creates a cache over the given accessor and settings.
    #[must_use]
    pub fn with_settings(schema: Arc<Schema>, accessor: A, settings: CacheSettings) -> Self {
        let mut processors: Vec<Box<dyn OperationProcessor>> = Vec::new();
        if settings.validation {
            processors.push(Box::new(SchemaValidationProcessor));
        }
        if settings.consistency {
            processors.push(Box::new(SchemaConsistencyProcessor));
        }
        if settings.integrity {
            processors.push(Box::new(CacheIntegrityProcessor));
        }
        Self {
            schema,
            accessor,
            settings,
            processors,
            patch_operators: PatchOperators::standard(),
            inverse_operators: InverseOperators::standard(),
            query_operators: QueryOperators::standard(),
            key_map: None,
            observers: Vec::new(),
        }
    }

    /// The shared schema view.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Read access to the accessor backend.
    #[must_use]
    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    /// Attaches a key map; the cache pushes records into it after any
    /// key-bearing operation.
    pub fn set_key_map(&mut self, key_map: Box<dyn KeyMap>) {
        self.key_map = Some(key_map);
    }

    /// The attached key map, if any.
    #[must_use]
    pub fn key_map(&self) -> Option<&dyn KeyMap> {
        self.key_map.as_deref()
    }

    /// Registers an observer; observers are invoked synchronously in
    /// registration order.
    pub fn observe(&mut self, observer: Box<dyn CacheObserver>) {
        self.observers.push(observer);
    }

    /// Read-through: the stored record for `identity`, if any.
    #[must_use]
    pub fn record(&self, identity: &RecordIdentity) -> Option<&Record> {
        self.accessor.record(identity)
    }

    /// Read-through: every stored record of type `ty`.
    #[must_use]
    pub fn records(&self, ty: &str) -> Vec<&Record> {
        self.accessor.records(ty)
    }

    /// Applies one operation. Equivalent to a single-element [`patch`](Self::patch).
    ///
    /// # Errors
    /// Propagates any [`CacheError`] from the pipeline.
    pub fn patch_one(&mut self, operation: RecordOperation) -> Result<PatchResult, CacheError> {
        self.patch(vec![operation])
    }

    /// Applies an ordered batch of operations through the patch pipeline.
    ///
    /// # Errors
    /// Propagates the first [`CacheError`] raised; earlier operations in the
    /// batch stay applied (no rollback).
    pub fn patch(&mut self, operations: Vec<RecordOperation>) -> Result<PatchResult, CacheError> {
        debug!(operations = operations.len(), "applying patch batch");
        let mut result = PatchResult::default();
        let mut pipeline = Pipeline {
            schema: &self.schema,
            accessor: &mut self.accessor,
            processors: &self.processors,
            patch_operators: &self.patch_operators,
            inverse_operators: &self.inverse_operators,
            settings: &self.settings,
            key_map: self.key_map.as_deref_mut().map(|km| km as &mut dyn KeyMap),
            observers: &self.observers,
        };
        for operation in &operations {
            pipeline.apply(operation, true, &mut result)?;
        }
        result.inverse.reverse();
        debug!(
            inverse = result.inverse.len(),
            data = result.data.len(),
            "patch batch applied"
        );
        Ok(result)
    }

    /// Evaluates a query expression.
    ///
    /// # Errors
    /// Propagates [`CacheError::RecordNotFound`],
    /// [`CacheError::QueryExpressionParse`], or
    /// [`CacheError::OperatorNotFound`].
    pub fn query(&self, expression: &QueryExpression) -> Result<QueryResult, CacheError> {
        debug!(kind = %expression.kind(), "evaluating query");
        let operator = self.query_operators.get(expression.kind())?;
        operator(&self.schema, &self.accessor, expression)
    }

    /// Convenience for `findRecord`.
    ///
    /// # Errors
    /// Returns [`CacheError::RecordNotFound`] when the identity is absent.
    pub fn find_record(&self, identity: &RecordIdentity) -> Result<Record, CacheError> {
        match self.query(&QueryExpression::FindRecord {
            record: identity.clone(),
        })? {
            QueryResult::Record(record) => Ok(record),
            _ => Err(CacheError::RecordNotFound {
                identity: identity.clone(),
            }),
        }
    }

    /// Clears the store and index back to empty schema buckets, then emits
    /// `reset`.
    pub fn reset(&mut self) {
        self.accessor.reset();
        self.emit_reset();
    }

    fn emit_reset(&self) {
        debug!("cache reset");
        for observer in &self.observers {
            observer.on_reset();
        }
    }
}

/// Borrowed view of the cache's moving parts for one patch call. Splitting
/// the borrows lets processors take the accessor mutably while the operator
/// tables and schema stay shared.
struct Pipeline<'a> {
    schema: &'a Schema,
    accessor: &'a mut dyn RecordAccessor,
    processors: &'a [Box<dyn OperationProcessor>],
    patch_operators: &'a PatchOperators,
    inverse_operators: &'a InverseOperators,
    settings: &'a CacheSettings,
    key_map: Option<&'a mut dyn KeyMap>,
    observers: &'a [Box<dyn CacheObserver>],
}

impl Pipeline<'_> {
    fn apply(
        &mut self,
        operation: &RecordOperation,
        primary: bool,
        result: &mut PatchResult,
    ) -> Result<(), CacheError> {
        for processor in self.processors {
            processor.validate(self.schema, &*self.accessor, operation)?;
        }

        let inverse_operator = self.inverse_operators.get(operation.kind())?;
        let Some(inverse) = inverse_operator(&*self.accessor, operation) else {
            trace!(op = %operation.kind(), primary, "skipping no-op");
            if primary {
                result.data.push(None);
            }
            return Ok(());
        };
        result.inverse.push(inverse);

        for processor in self.processors {
            let subs = processor.before(self.schema, &*self.accessor, operation);
            for sub in subs {
                self.apply(&sub, false, result)?;
            }
        }

        let mut staged = Vec::new();
        for processor in self.processors {
            staged.extend(processor.after(self.schema, &mut *self.accessor, operation));
        }

        let operator = self.patch_operators.get(operation.kind())?;
        let data = operator(&mut *self.accessor, operation);
        trace!(op = %operation.kind(), primary, staged = staged.len(), "applied operation");
        if primary {
            result.data.push(data.clone());
        }

        if self.settings.key_map
            && matches!(
                operation.kind(),
                OperationKind::AddRecord | OperationKind::ReplaceRecord | OperationKind::ReplaceKey
            )
        {
            if let (Some(key_map), Some(record)) = (self.key_map.as_mut(), data.as_ref()) {
                key_map.push_record(record);
            }
        }

        for processor in self.processors {
            processor.immediate(self.schema, &mut *self.accessor, operation);
        }

        for observer in self.observers {
            observer.on_patch(operation, &data);
        }

        for sub in staged {
            self.apply(&sub, false, result)?;
        }

        for processor in self.processors {
            let subs = processor.finally(self.schema, &mut *self.accessor, operation);
            for sub in subs {
                self.apply(&sub, false, result)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .model("planet", |m| m.attribute("name").key("remoteId"))
                .build(),
        )
    }

    fn planet(id: &str) -> RecordIdentity {
        RecordIdentity::new("planet", id)
    }

    #[test]
    fn no_op_primary_reports_null_data_and_empty_inverse() {
        let mut cache = RecordCache::new(schema());
        let result = cache
            .patch_one(RecordOperation::RemoveRecord {
                record: planet("jupiter"),
            })
            .unwrap();
        assert_eq!(result.data, vec![None]);
        assert!(result.inverse.is_empty());
    }

    #[test]
    fn inverse_is_reversed_across_the_batch() {
        let mut cache = RecordCache::new(schema());
        let result = cache
            .patch(vec![
                RecordOperation::AddRecord {
                    record: Record::new(planet("a")),
                },
                RecordOperation::AddRecord {
                    record: Record::new(planet("b")),
                },
            ])
            .unwrap();
        assert_eq!(
            result.inverse,
            vec![
                RecordOperation::RemoveRecord { record: planet("b") },
                RecordOperation::RemoveRecord { record: planet("a") },
            ]
        );
    }

    #[test]
    fn validation_failure_leaves_no_mutation() {
        let mut cache = RecordCache::new(schema());
        let err = cache
            .patch_one(RecordOperation::AddRecord {
                record: Record::new(planet("jupiter")).with_attribute("mass", json!(1)),
            })
            .unwrap_err();
        assert!(matches!(err, CacheError::SchemaValidation(_)));
        assert!(cache.record(&planet("jupiter")).is_none());
    }

    #[test]
    fn disabled_validation_skips_schema_checks() {
        let schema = schema();
        let accessor = MemoryAccessor::new(&schema);
        let settings = CacheSettings::default().with_validation(false);
        let mut cache = RecordCache::with_settings(schema, accessor, settings);
        assert!(cache
            .patch_one(RecordOperation::AddRecord {
                record: Record::new(planet("jupiter")).with_attribute("mass", json!(1)),
            })
            .is_ok());
    }
}
