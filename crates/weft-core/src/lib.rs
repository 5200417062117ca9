// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! weft-core: synchronous, in-memory record-graph cache.
//!
//! Normalized records — `(type, id)` identities with keys, attributes, and
//! typed relationships — live in per-type buckets. Every mutation is a
//! reified [`RecordOperation`] applied through a fixed pipeline that
//! validates it against the schema, derives an exact inverse, propagates
//! relationship edits to declared inverses, and maintains a
//! reverse-reference index. A small query algebra ([`QueryExpression`])
//! covers lookup, filtered/sorted/paged scans, and relationship traversal.
//!
//! # Determinism
//!
//! All storage is ordered (`BTreeMap`); scans, query results, and injected
//! sub-operation sequences are stable across runs. The cache is
//! single-threaded and synchronous: a patch or query call is indivisible
//! from the caller's point of view, and event observers run inline.
//!
//! # Cyclic references
//!
//! Inverse relationships form cycles (a planet's moons point back at the
//! planet). Records hold identities, never direct references; cycle closure
//! lives in the inverse-relationship index maintained by
//! [`CacheIntegrityProcessor`]. No recursive ownership exists anywhere.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::use_self
)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

mod accessor;
mod cache;
mod consistency;
mod error;
mod ident;
mod integrity;
mod inverse;
mod keymap;
mod memory;
mod observer;
mod operation;
mod operators;
mod processor;
mod query;
mod record;
mod schema;
mod settings;
mod shared;

// Re-exports for stable public API
pub use accessor::RecordAccessor;
pub use cache::{PatchResult, RecordCache};
pub use consistency::SchemaConsistencyProcessor;
pub use error::{CacheError, SchemaViolation};
pub use ident::{InverseRef, RecordIdentity};
pub use integrity::CacheIntegrityProcessor;
pub use inverse::{InverseOperator, InverseOperators};
pub use keymap::{InMemoryKeyMap, KeyMap};
pub use memory::MemoryAccessor;
pub use observer::CacheObserver;
pub use operation::{OperationKind, RecordOperation};
pub use operators::{PatchOperator, PatchOperators};
pub use processor::{OperationProcessor, SchemaValidationProcessor};
pub use query::{
    AttributeOp, FilterSpec, Page, QueryExpression, QueryKind, QueryOperator, QueryOperators,
    QueryResult, SetOp, SortOrder, SortSpec,
};
pub use record::{identity_difference, identity_multiset_eq, Record, RelationshipData};
pub use schema::{
    InverseLink, ModelBuilder, ModelDef, RelationshipDef, RelationshipKind, Schema, SchemaBuilder,
};
pub use settings::CacheSettings;
pub use shared::SharedAccessor;
