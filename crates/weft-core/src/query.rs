// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query expressions and their evaluator.
//!
//! The expression language is small and tagged: find one record, find many
//! with filter/sort/pagination, or traverse a relationship. Evaluation is
//! deterministic — the same expression against the same store state yields
//! an identical sequence.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accessor::RecordAccessor;
use crate::error::CacheError;
use crate::ident::RecordIdentity;
use crate::record::{Record, RelationshipData};
use crate::schema::Schema;

/// Comparison operator for attribute filters.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum AttributeOp {
    /// Structural (deep) equality.
    Equal,
    /// Strictly greater than, under native ordering.
    Gt,
    /// Greater than or equal, under native ordering.
    Gte,
    /// Strictly less than, under native ordering.
    Lt,
    /// Less than or equal, under native ordering.
    Lte,
}

impl FromStr for AttributeOp {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(Self::Equal),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            other => Err(CacheError::QueryExpressionParse {
                reason: format!("unknown attribute filter operator: {other}"),
            }),
        }
    }
}

/// Set operator for `relatedRecords` filters.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SetOp {
    /// Same cardinality and every expected identity present.
    Equal,
    /// Every expected identity present.
    All,
    /// At least one expected identity present.
    Some,
    /// No expected identity present.
    None,
}

impl FromStr for SetOp {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(Self::Equal),
            "all" => Ok(Self::All),
            "some" => Ok(Self::Some),
            "none" => Ok(Self::None),
            other => Err(CacheError::QueryExpressionParse {
                reason: format!("unknown relatedRecords filter operator: {other}"),
            }),
        }
    }
}

/// Sort direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest first; records without the attribute sort last.
    Ascending,
    /// Largest first; records without the attribute sort first.
    Descending,
}

impl FromStr for SortOrder {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascending" => Ok(Self::Ascending),
            "descending" => Ok(Self::Descending),
            other => Err(CacheError::QueryExpressionParse {
                reason: format!("unknown sort order: {other}"),
            }),
        }
    }
}

/// One filter predicate; a query's predicates combine with AND.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum FilterSpec {
    /// Compare an attribute value.
    Attribute {
        /// Attribute name.
        attribute: String,
        /// Comparison operator.
        op: AttributeOp,
        /// Expected value.
        value: Value,
    },
    /// Test `hasMany` membership against a set of expected identities.
    RelatedRecords {
        /// Relationship name.
        relationship: String,
        /// Set operator.
        op: SetOp,
        /// Expected identities.
        records: Vec<RecordIdentity>,
    },
    /// Test a `hasOne` pointer against one or more expected targets
    /// (`None` matches a null pointer).
    RelatedRecord {
        /// Relationship name.
        relationship: String,
        /// Accepted targets.
        records: Vec<Option<RecordIdentity>>,
    },
}

/// One sort specifier. Only attribute sorting is supported; requesting any
/// other kind at the parse layer is a [`CacheError::QueryExpressionParse`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SortSpec {
    /// Order by an attribute value.
    Attribute {
        /// Attribute name.
        attribute: String,
        /// Sort direction.
        order: SortOrder,
    },
}

impl SortSpec {
    /// Parses a sort specifier from `(kind, attribute, order)` strings.
    ///
    /// # Errors
    /// Returns [`CacheError::QueryExpressionParse`] for an unsupported kind
    /// or an unknown order.
    pub fn parse(kind: &str, attribute: &str, order: &str) -> Result<Self, CacheError> {
        if kind != "attribute" {
            return Err(CacheError::QueryExpressionParse {
                reason: format!("unsupported sort kind: {kind}"),
            });
        }
        Ok(Self::Attribute {
            attribute: attribute.to_owned(),
            order: order.parse()?,
        })
    }
}

/// Pagination window. `limit` is required when a page is present; `offset`
/// defaults to zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Page {
    /// Number of leading records to skip.
    pub offset: Option<usize>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

/// A query expression, dispatched by tag through [`QueryOperators`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum QueryExpression {
    /// Fetch one record; absent records raise
    /// [`CacheError::RecordNotFound`].
    FindRecord {
        /// Identity to fetch.
        record: RecordIdentity,
    },
    /// Fetch a filtered, sorted, paged sequence of records.
    FindRecords {
        /// Type bucket to scan; `None` scans every bucket in type order.
        ty: Option<String>,
        /// Predicates, combined with AND.
        filter: Vec<FilterSpec>,
        /// Sort specifiers, applied in order.
        sort: Vec<SortSpec>,
        /// Optional pagination window.
        page: Option<Page>,
    },
    /// Resolve a `hasOne` relationship to the target's full record.
    FindRelatedRecord {
        /// Base record identity.
        record: RecordIdentity,
        /// Relationship to traverse.
        relationship: String,
    },
    /// Resolve a `hasMany` relationship to the targets' full records.
    FindRelatedRecords {
        /// Base record identity.
        record: RecordIdentity,
        /// Relationship to traverse.
        relationship: String,
    },
}

impl QueryExpression {
    /// The dispatch tag for this expression.
    #[must_use]
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::FindRecord { .. } => QueryKind::FindRecord,
            Self::FindRecords { .. } => QueryKind::FindRecords,
            Self::FindRelatedRecord { .. } => QueryKind::FindRelatedRecord,
            Self::FindRelatedRecords { .. } => QueryKind::FindRelatedRecords,
        }
    }

    /// Shorthand for a bare `FindRecords` over one type.
    #[must_use]
    pub fn find_records(ty: impl Into<String>) -> Self {
        Self::FindRecords {
            ty: Some(ty.into()),
            filter: Vec::new(),
            sort: Vec::new(),
            page: None,
        }
    }
}

/// Dispatch tag, one per [`QueryExpression`] variant.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum QueryKind {
    /// Tag for [`QueryExpression::FindRecord`].
    FindRecord,
    /// Tag for [`QueryExpression::FindRecords`].
    FindRecords,
    /// Tag for [`QueryExpression::FindRelatedRecord`].
    FindRelatedRecord,
    /// Tag for [`QueryExpression::FindRelatedRecords`].
    FindRelatedRecords,
}

impl QueryKind {
    /// Wire-style name of the tag.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FindRecord => "findRecord",
            Self::FindRecords => "findRecords",
            Self::FindRelatedRecord => "findRelatedRecord",
            Self::FindRelatedRecords => "findRelatedRecords",
        }
    }
}

impl core::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of evaluating a query expression.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum QueryResult {
    /// Result of `findRecord`.
    Record(Record),
    /// Result of `findRecords`.
    Records(Vec<Record>),
    /// Result of `findRelatedRecord`.
    RelatedRecord(Option<Record>),
    /// Result of `findRelatedRecords`.
    RelatedRecords(Vec<Record>),
}

impl QueryResult {
    /// The single record, when this is a `findRecord` result.
    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::RelatedRecord(record) => record,
            Self::Records(_) | Self::RelatedRecords(_) => None,
        }
    }

    /// The record sequence, when this is a sequence-shaped result.
    #[must_use]
    pub fn into_records(self) -> Option<Vec<Record>> {
        match self {
            Self::Records(records) | Self::RelatedRecords(records) => Some(records),
            Self::Record(_) | Self::RelatedRecord(_) => None,
        }
    }
}

/// A query operator: evaluates one expression kind against the accessor.
pub type QueryOperator =
    fn(&Schema, &dyn RecordAccessor, &QueryExpression) -> Result<QueryResult, CacheError>;

/// Dispatch table mapping query tags to operators.
pub struct QueryOperators {
    entries: BTreeMap<QueryKind, QueryOperator>,
}

impl QueryOperators {
    /// Builds the standard table covering every query kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut entries: BTreeMap<QueryKind, QueryOperator> = BTreeMap::new();
        entries.insert(QueryKind::FindRecord, find_record);
        entries.insert(QueryKind::FindRecords, find_records);
        entries.insert(QueryKind::FindRelatedRecord, find_related_record);
        entries.insert(QueryKind::FindRelatedRecords, find_related_records);
        Self { entries }
    }

    /// Looks up the operator for `kind`.
    ///
    /// # Errors
    /// Returns [`CacheError::OperatorNotFound`] when no operator is
    /// registered for `kind`.
    pub fn get(&self, kind: QueryKind) -> Result<QueryOperator, CacheError> {
        self.entries
            .get(&kind)
            .copied()
            .ok_or_else(|| CacheError::OperatorNotFound {
                tag: kind.name().to_owned(),
            })
    }
}

fn find_record(
    _schema: &Schema,
    accessor: &dyn RecordAccessor,
    expression: &QueryExpression,
) -> Result<QueryResult, CacheError> {
    let QueryExpression::FindRecord { record } = expression else {
        unreachable!("findRecord operator dispatched for {}", expression.kind());
    };
    accessor
        .record(record)
        .cloned()
        .map(QueryResult::Record)
        .ok_or_else(|| CacheError::RecordNotFound {
            identity: record.clone(),
        })
}

fn find_records(
    schema: &Schema,
    accessor: &dyn RecordAccessor,
    expression: &QueryExpression,
) -> Result<QueryResult, CacheError> {
    let QueryExpression::FindRecords {
        ty,
        filter,
        sort,
        page,
    } = expression
    else {
        unreachable!("findRecords operator dispatched for {}", expression.kind());
    };

    let mut records: Vec<Record> = match ty {
        Some(ty) => accessor.records(ty).into_iter().cloned().collect(),
        None => schema
            .model_names()
            .flat_map(|ty| accessor.records(ty))
            .cloned()
            .collect(),
    };

    records.retain(|record| filter.iter().all(|spec| matches_filter(record, spec)));

    if !sort.is_empty() {
        records.sort_by(|a, b| {
            sort.iter()
                .map(|spec| compare_by(a, b, spec))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    if let Some(page) = page {
        let limit = page.limit.ok_or_else(|| CacheError::QueryExpressionParse {
            reason: "page requires a limit".to_owned(),
        })?;
        let offset = page.offset.unwrap_or(0);
        records = records.into_iter().skip(offset).take(limit).collect();
    }

    Ok(QueryResult::Records(records))
}

fn find_related_record(
    _schema: &Schema,
    accessor: &dyn RecordAccessor,
    expression: &QueryExpression,
) -> Result<QueryResult, CacheError> {
    let QueryExpression::FindRelatedRecord {
        record,
        relationship,
    } = expression
    else {
        unreachable!(
            "findRelatedRecord operator dispatched for {}",
            expression.kind()
        );
    };
    let target = accessor
        .related_record(record, relationship)
        .flatten()
        .and_then(|identity| accessor.record(&identity).cloned());
    Ok(QueryResult::RelatedRecord(target))
}

fn find_related_records(
    _schema: &Schema,
    accessor: &dyn RecordAccessor,
    expression: &QueryExpression,
) -> Result<QueryResult, CacheError> {
    let QueryExpression::FindRelatedRecords {
        record,
        relationship,
    } = expression
    else {
        unreachable!(
            "findRelatedRecords operator dispatched for {}",
            expression.kind()
        );
    };
    let members = accessor
        .related_records(record, relationship)
        .unwrap_or_default();
    let records = members
        .iter()
        .filter_map(|identity| accessor.record(identity).cloned())
        .collect();
    Ok(QueryResult::RelatedRecords(records))
}

fn matches_filter(record: &Record, spec: &FilterSpec) -> bool {
    match spec {
        FilterSpec::Attribute {
            attribute,
            op,
            value,
        } => {
            let actual = record.attributes.get(attribute);
            match op {
                AttributeOp::Equal => actual == Some(value),
                AttributeOp::Gt => matches_ordering(actual, value, &[Ordering::Greater]),
                AttributeOp::Gte => {
                    matches_ordering(actual, value, &[Ordering::Greater, Ordering::Equal])
                }
                AttributeOp::Lt => matches_ordering(actual, value, &[Ordering::Less]),
                AttributeOp::Lte => {
                    matches_ordering(actual, value, &[Ordering::Less, Ordering::Equal])
                }
            }
        }
        FilterSpec::RelatedRecords {
            relationship,
            op,
            records,
        } => {
            let actual: Vec<RecordIdentity> = match record.relationships.get(relationship) {
                Some(RelationshipData::Many(members)) => members.clone(),
                _ => Vec::new(),
            };
            match op {
                SetOp::Equal => {
                    actual.len() == records.len()
                        && records.iter().all(|expected| actual.contains(expected))
                }
                SetOp::All => records.iter().all(|expected| actual.contains(expected)),
                SetOp::Some => records.iter().any(|expected| actual.contains(expected)),
                SetOp::None => !records.iter().any(|expected| actual.contains(expected)),
            }
        }
        FilterSpec::RelatedRecord {
            relationship,
            records,
        } => {
            let actual: Option<RecordIdentity> = match record.relationships.get(relationship) {
                Some(RelationshipData::One(data)) => data.clone(),
                _ => None,
            };
            records.iter().any(|expected| *expected == actual)
        }
    }
}

fn matches_ordering(actual: Option<&Value>, expected: &Value, accepted: &[Ordering]) -> bool {
    actual
        .and_then(|actual| value_cmp(actual, expected))
        .is_some_and(|ordering| accepted.contains(&ordering))
}

fn compare_by(a: &Record, b: &Record, spec: &SortSpec) -> Ordering {
    let SortSpec::Attribute { attribute, order } = spec;
    let a_value = a.attribute(attribute);
    let b_value = b.attribute(attribute);
    let base = match (a_value, b_value) {
        (None, None) => Ordering::Equal,
        // Unset values sort last ascending; the reversal below puts them
        // first descending.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a_value), Some(b_value)) => value_cmp(a_value, b_value).unwrap_or(Ordering::Equal),
    };
    match order {
        SortOrder::Ascending => base,
        SortOrder::Descending => base.reverse(),
    }
}

/// Native ordering over attribute values: numbers by numeric value, strings
/// lexicographically, booleans false-before-true. Mixed or unordered types
/// compare as `None`.
fn value_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
