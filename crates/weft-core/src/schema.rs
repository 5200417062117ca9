// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read-only schema view: model, attribute, key, and relationship declarations.
//!
//! The cache consumes the schema strictly read-only. Hosts construct one via
//! [`Schema::builder`] and share it (typically behind an `Arc`) across every
//! cache instance that speaks the same model vocabulary.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Declared cardinality of a relationship.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// A single target identity or null.
    HasOne,
    /// An ordered sequence of target identities.
    HasMany,
}

impl core::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HasOne => write!(f, "hasOne"),
            Self::HasMany => write!(f, "hasMany"),
        }
    }
}

/// Declaration of one relationship on a model.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RelationshipDef {
    /// Cardinality of the relationship.
    pub kind: RelationshipKind,
    /// Target model type name.
    pub model: String,
    /// Name of the inverse relationship declared on the target model, if any.
    ///
    /// Only relationships with a named inverse participate in the
    /// inverse-relationship index and in consistency propagation.
    pub inverse: Option<String>,
}

/// Declaration of one model type: its attributes, keys, and relationships.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ModelDef {
    /// Declared attribute names.
    pub attributes: BTreeSet<String>,
    /// Declared key names (alternative identifiers).
    pub keys: BTreeSet<String>,
    /// Declared relationships, keyed by name.
    pub relationships: BTreeMap<String, RelationshipDef>,
}

/// Resolved link from a relationship to its declared inverse on the target
/// model. Produced by [`Schema::inverse_relationship`].
#[derive(Clone, Copy, Debug)]
pub struct InverseLink<'a> {
    /// Name of the inverse relationship on the target model.
    pub name: &'a str,
    /// Cardinality of the inverse relationship.
    pub kind: RelationshipKind,
}

/// The schema view: a set of model declarations.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Schema {
    models: BTreeMap<String, ModelDef>,
}

impl Schema {
    /// Starts a fluent schema declaration.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Returns the declaration for model `ty`, if declared.
    #[must_use]
    pub fn model(&self, ty: &str) -> Option<&ModelDef> {
        self.models.get(ty)
    }

    /// Returns `true` if model `ty` is declared.
    #[must_use]
    pub fn has_model(&self, ty: &str) -> bool {
        self.models.contains_key(ty)
    }

    /// Iterates over declared model names in ascending order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Returns the declaration of relationship `name` on model `ty`.
    #[must_use]
    pub fn relationship(&self, ty: &str, name: &str) -> Option<&RelationshipDef> {
        self.models.get(ty)?.relationships.get(name)
    }

    /// Resolves relationship `name` on model `ty` to its declared inverse on
    /// the target model.
    ///
    /// Returns `None` when the relationship is undeclared, declares no
    /// inverse, or the inverse is not itself declared on the target model.
    #[must_use]
    pub fn inverse_relationship(&self, ty: &str, name: &str) -> Option<InverseLink<'_>> {
        let def = self.relationship(ty, name)?;
        let inverse = def.inverse.as_deref()?;
        let target = self.models.get(&def.model)?;
        let inverse_def = target.relationships.get(inverse)?;
        Some(InverseLink {
            name: inverse,
            kind: inverse_def.kind,
        })
    }
}

/// Fluent builder for [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    models: BTreeMap<String, ModelDef>,
}

impl SchemaBuilder {
    /// Declares model `name`, configuring it through `configure`.
    #[must_use]
    pub fn model(mut self, name: impl Into<String>, configure: impl FnOnce(ModelBuilder) -> ModelBuilder) -> Self {
        let built = configure(ModelBuilder::default()).def;
        self.models.insert(name.into(), built);
        self
    }

    /// Finishes the declaration.
    #[must_use]
    pub fn build(self) -> Schema {
        Schema {
            models: self.models,
        }
    }
}

/// Fluent builder for one [`ModelDef`].
#[derive(Default)]
pub struct ModelBuilder {
    def: ModelDef,
}

impl ModelBuilder {
    /// Declares a single attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.def.attributes.insert(name.into());
        self
    }

    /// Declares several attributes at once.
    #[must_use]
    pub fn attributes<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.def.attributes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declares a key (alternative identifier).
    #[must_use]
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.def.keys.insert(name.into());
        self
    }

    /// Declares a `hasOne` relationship targeting `model`, optionally naming
    /// its inverse relationship on the target model.
    #[must_use]
    pub fn has_one(
        mut self,
        name: impl Into<String>,
        model: impl Into<String>,
        inverse: Option<&str>,
    ) -> Self {
        self.def.relationships.insert(
            name.into(),
            RelationshipDef {
                kind: RelationshipKind::HasOne,
                model: model.into(),
                inverse: inverse.map(str::to_owned),
            },
        );
        self
    }

    /// Declares a `hasMany` relationship targeting `model`, optionally naming
    /// its inverse relationship on the target model.
    #[must_use]
    pub fn has_many(
        mut self,
        name: impl Into<String>,
        model: impl Into<String>,
        inverse: Option<&str>,
    ) -> Self {
        self.def.relationships.insert(
            name.into(),
            RelationshipDef {
                kind: RelationshipKind::HasMany,
                model: model.into(),
                inverse: inverse.map(str::to_owned),
            },
        );
        self
    }
}
