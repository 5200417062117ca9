// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The operation algebra: every mutation the cache accepts, reified.
//!
//! The op set is closed by design. Dispatch happens through operator tables
//! keyed by [`OperationKind`] (see [`crate::operators`] and
//! [`crate::inverse`]); processors hook the same tags. Open extension is
//! deliberately not supported.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ident::RecordIdentity;
use crate::record::Record;

/// A single reified mutation.
///
/// Operations are pure data: applying one is the patch pipeline's job, and
/// each has an exact inverse derived against the pre-mutation store (see
/// [`crate::inverse`]).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum RecordOperation {
    /// Unconditionally set the bucket entry to `record`.
    AddRecord {
        /// The full record to store.
        record: Record,
    },
    /// Deep-merge `record` into the existing record per grouping (keys,
    /// attributes, relationships are each shallow-merged field-wise). Against
    /// an absent record the incoming record is stored verbatim.
    ReplaceRecord {
        /// The partial (or full) record to merge in.
        record: Record,
    },
    /// Remove the record for `record`, if present.
    RemoveRecord {
        /// Identity to remove.
        record: RecordIdentity,
    },
    /// Set key `key` to `value` (`None` unsets), synthesizing a skeleton
    /// record when the identity is absent.
    ReplaceKey {
        /// Identity to edit.
        record: RecordIdentity,
        /// Key name.
        key: String,
        /// New key value; `None` writes an unset tombstone.
        value: Option<String>,
    },
    /// Set attribute `attribute` to `value` (JSON `null` acts as unset),
    /// synthesizing a skeleton record when the identity is absent.
    ReplaceAttribute {
        /// Identity to edit.
        record: RecordIdentity,
        /// Attribute name.
        attribute: String,
        /// New attribute value.
        value: Value,
    },
    /// Append `related_record` to a `hasMany` relationship, creating the list
    /// (and a skeleton record) as needed. Raw append: an already-present
    /// member is a pipeline no-op, but record-level writes may carry
    /// duplicates and they are preserved.
    AddToRelatedRecords {
        /// Identity owning the relationship.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// Member to append.
        related_record: RecordIdentity,
    },
    /// Remove every entry matching `related_record` from a `hasMany`
    /// relationship. Against an absent record this is a no-op; no skeleton is
    /// created.
    RemoveFromRelatedRecords {
        /// Identity owning the relationship.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// Member to remove.
        related_record: RecordIdentity,
    },
    /// Replace a `hasMany` relationship's members wholesale, synthesizing a
    /// skeleton record when the identity is absent.
    ReplaceRelatedRecords {
        /// Identity owning the relationship.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// New member list.
        related_records: Vec<RecordIdentity>,
    },
    /// Set a `hasOne` relationship's target (or null), synthesizing a
    /// skeleton record when the identity is absent.
    ReplaceRelatedRecord {
        /// Identity owning the relationship.
        record: RecordIdentity,
        /// Relationship name.
        relationship: String,
        /// New target, or `None` for null.
        related_record: Option<RecordIdentity>,
    },
}

impl RecordOperation {
    /// The dispatch tag for this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::AddRecord { .. } => OperationKind::AddRecord,
            Self::ReplaceRecord { .. } => OperationKind::ReplaceRecord,
            Self::RemoveRecord { .. } => OperationKind::RemoveRecord,
            Self::ReplaceKey { .. } => OperationKind::ReplaceKey,
            Self::ReplaceAttribute { .. } => OperationKind::ReplaceAttribute,
            Self::AddToRelatedRecords { .. } => OperationKind::AddToRelatedRecords,
            Self::RemoveFromRelatedRecords { .. } => OperationKind::RemoveFromRelatedRecords,
            Self::ReplaceRelatedRecords { .. } => OperationKind::ReplaceRelatedRecords,
            Self::ReplaceRelatedRecord { .. } => OperationKind::ReplaceRelatedRecord,
        }
    }

    /// The identity of the record this operation primarily targets.
    #[must_use]
    pub fn record_identity(&self) -> &RecordIdentity {
        match self {
            Self::AddRecord { record } | Self::ReplaceRecord { record } => &record.identity,
            Self::RemoveRecord { record }
            | Self::ReplaceKey { record, .. }
            | Self::ReplaceAttribute { record, .. }
            | Self::AddToRelatedRecords { record, .. }
            | Self::RemoveFromRelatedRecords { record, .. }
            | Self::ReplaceRelatedRecords { record, .. }
            | Self::ReplaceRelatedRecord { record, .. } => record,
        }
    }
}

/// Dispatch tag, one per [`RecordOperation`] variant.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum OperationKind {
    /// Tag for [`RecordOperation::AddRecord`].
    AddRecord,
    /// Tag for [`RecordOperation::ReplaceRecord`].
    ReplaceRecord,
    /// Tag for [`RecordOperation::RemoveRecord`].
    RemoveRecord,
    /// Tag for [`RecordOperation::ReplaceKey`].
    ReplaceKey,
    /// Tag for [`RecordOperation::ReplaceAttribute`].
    ReplaceAttribute,
    /// Tag for [`RecordOperation::AddToRelatedRecords`].
    AddToRelatedRecords,
    /// Tag for [`RecordOperation::RemoveFromRelatedRecords`].
    RemoveFromRelatedRecords,
    /// Tag for [`RecordOperation::ReplaceRelatedRecords`].
    ReplaceRelatedRecords,
    /// Tag for [`RecordOperation::ReplaceRelatedRecord`].
    ReplaceRelatedRecord,
}

impl OperationKind {
    /// Every operation tag, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::AddRecord,
        Self::ReplaceRecord,
        Self::RemoveRecord,
        Self::ReplaceKey,
        Self::ReplaceAttribute,
        Self::AddToRelatedRecords,
        Self::RemoveFromRelatedRecords,
        Self::ReplaceRelatedRecords,
        Self::ReplaceRelatedRecord,
    ];

    /// Wire-style name of the tag (`"addRecord"`, `"replaceKey"`, ...).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AddRecord => "addRecord",
            Self::ReplaceRecord => "replaceRecord",
            Self::RemoveRecord => "removeRecord",
            Self::ReplaceKey => "replaceKey",
            Self::ReplaceAttribute => "replaceAttribute",
            Self::AddToRelatedRecords => "addToRelatedRecords",
            Self::RemoveFromRelatedRecords => "removeFromRelatedRecords",
            Self::ReplaceRelatedRecords => "replaceRelatedRecords",
            Self::ReplaceRelatedRecord => "replaceRelatedRecord",
        }
    }
}

impl core::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
