// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Key map: the alternative-identity index.
//!
//! Records may carry named string keys ("remote id" style identifiers). The
//! cache pushes a record into the key map after any patch operation that can
//! alter its keys; hosts resolve keys back to ids through `key_to_id`.

use std::collections::BTreeMap;

use crate::record::Record;

/// Alternative-identity index contract.
pub trait KeyMap {
    /// Learns (or re-learns) `record`'s keys.
    fn push_record(&mut self, record: &Record);

    /// Resolves `(type, key name, key value)` to a record id.
    fn key_to_id(&self, ty: &str, key: &str, value: &str) -> Option<String>;

    /// Resolves `(type, key name, record id)` back to the key value.
    fn id_to_key(&self, ty: &str, key: &str, id: &str) -> Option<String>;
}

/// In-memory key map over ordered maps.
///
/// Pushing a record overwrites earlier mappings for the same `(type, key,
/// value)` triple; a key with a tombstone value (unset) is skipped rather
/// than unlearned.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyMap {
    // (type, key name, key value) -> id
    ids: BTreeMap<(String, String, String), String>,
    // (type, key name, id) -> key value
    values: BTreeMap<(String, String, String), String>,
}

impl InMemoryKeyMap {
    /// Creates an empty key map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyMap for InMemoryKeyMap {
    fn push_record(&mut self, record: &Record) {
        let ty = &record.identity.ty;
        let id = &record.identity.id;
        for (name, value) in &record.keys {
            let Some(value) = value else {
                continue;
            };
            self.ids.insert(
                (ty.clone(), name.clone(), value.clone()),
                id.clone(),
            );
            self.values
                .insert((ty.clone(), name.clone(), id.clone()), value.clone());
        }
    }

    fn key_to_id(&self, ty: &str, key: &str, value: &str) -> Option<String> {
        self.ids
            .get(&(ty.to_owned(), key.to_owned(), value.to_owned()))
            .cloned()
    }

    fn id_to_key(&self, ty: &str, key: &str, id: &str) -> Option<String> {
        self.values
            .get(&(ty.to_owned(), key.to_owned(), id.to_owned()))
            .cloned()
    }
}
