// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache configuration toggles.

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::RecordCache`].
///
/// Defaults enable the full pipeline. Embedders that feed pre-validated,
/// pre-normalized operations may switch individual processors off.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Run schema validation on every operation.
    pub validation: bool,
    /// Propagate relationship edits to declared inverses.
    pub consistency: bool,
    /// Maintain the inverse-relationship index and removal integrity.
    pub integrity: bool,
    /// Push records into the key map after key-bearing operations.
    pub key_map: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            validation: true,
            consistency: true,
            integrity: true,
            key_map: true,
        }
    }
}

impl CacheSettings {
    /// Toggles schema validation.
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    /// Toggles inverse-relationship propagation.
    #[must_use]
    pub fn with_consistency(mut self, enabled: bool) -> Self {
        self.consistency = enabled;
        self
    }

    /// Toggles inverse-index maintenance.
    #[must_use]
    pub fn with_integrity(mut self, enabled: bool) -> Self {
        self.integrity = enabled;
        self
    }

    /// Toggles key-map pushes.
    #[must_use]
    pub fn with_key_map(mut self, enabled: bool) -> Self {
        self.key_map = enabled;
        self
    }
}
