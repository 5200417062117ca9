// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for patch and query evaluation.

use thiserror::Error;

use crate::ident::RecordIdentity;
use crate::schema::RelationshipKind;

/// A single schema violation detected during operation validation.
///
/// Violations carry the offending type and field name so callers can report
/// precisely what the schema rejects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// The operation references a model type the schema does not declare.
    #[error("unknown model type: {ty}")]
    UnknownModel {
        /// The undeclared type name.
        ty: String,
    },
    /// The operation mentions an attribute the model does not declare.
    #[error("unknown attribute {attribute} on model {ty}")]
    UnknownAttribute {
        /// Model type carrying the undeclared attribute.
        ty: String,
        /// The undeclared attribute name.
        attribute: String,
    },
    /// The operation mentions a key the model does not declare.
    #[error("unknown key {key} on model {ty}")]
    UnknownKey {
        /// Model type carrying the undeclared key.
        ty: String,
        /// The undeclared key name.
        key: String,
    },
    /// The operation mentions a relationship the model does not declare.
    #[error("unknown relationship {relationship} on model {ty}")]
    UnknownRelationship {
        /// Model type carrying the undeclared relationship.
        ty: String,
        /// The undeclared relationship name.
        relationship: String,
    },
    /// The operation's shape does not match the declared relationship kind
    /// (e.g. a `hasMany` edit aimed at a `hasOne` relationship).
    #[error("relationship {relationship} on model {ty} is {actual}, operation requires {expected}")]
    RelationshipKindMismatch {
        /// Model type declaring the relationship.
        ty: String,
        /// The relationship name.
        relationship: String,
        /// Kind the operation requires.
        expected: RelationshipKind,
        /// Kind the schema declares.
        actual: RelationshipKind,
    },
}

/// Errors raised by the cache.
///
/// Kinds are distinct and distinguishable by the caller; errors escape the
/// patch or query call immediately and state mutated before the error is not
/// rolled back (callers requiring atomicity apply the inverse themselves).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// An operation failed schema validation.
    #[error("schema validation failed: {0}")]
    SchemaValidation(#[from] SchemaViolation),
    /// `findRecord` addressed an identity with no stored record.
    #[error("record not found: {identity}")]
    RecordNotFound {
        /// The absent identity.
        identity: RecordIdentity,
    },
    /// A query expression was malformed: unknown operator name, unsupported
    /// sort kind, or pagination without a limit.
    #[error("invalid query expression: {reason}")]
    QueryExpressionParse {
        /// Human-readable description naming the offending operator or field.
        reason: String,
    },
    /// No operator is registered for an operation or query tag.
    #[error("no operator registered for {tag}")]
    OperatorNotFound {
        /// The unhandled operation or query tag.
        tag: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_the_offending_names() {
        let err = CacheError::from(SchemaViolation::UnknownAttribute {
            ty: "planet".into(),
            attribute: "mass".into(),
        });
        assert_eq!(
            err.to_string(),
            "schema validation failed: unknown attribute mass on model planet"
        );

        let err = CacheError::RecordNotFound {
            identity: RecordIdentity::new("planet", "jupiter"),
        };
        assert_eq!(err.to_string(), "record not found: planet:jupiter");
    }

    #[test]
    fn kind_mismatch_names_both_kinds() {
        let err = SchemaViolation::RelationshipKindMismatch {
            ty: "planet".into(),
            relationship: "solarSystem".into(),
            expected: RelationshipKind::HasMany,
            actual: RelationshipKind::HasOne,
        };
        let text = err.to_string();
        assert!(text.contains("hasMany"));
        assert!(text.contains("hasOne"));
    }
}
