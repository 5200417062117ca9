// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query evaluator behavior: lookup, filters, sort, pagination, traversal,
//! and the deterministic-result guarantee.

mod common;

use common::{moon, planet, solar_schema, solar_system};
use serde_json::json;
use weft_core::{
    AttributeOp, CacheError, FilterSpec, Page, QueryExpression, Record, RecordCache,
    RecordOperation, SetOp, SortOrder, SortSpec,
};

fn seeded_cache() -> RecordCache {
    let mut cache = RecordCache::new(solar_schema());
    cache
        .patch(vec![
            RecordOperation::AddRecord {
                record: Record::new(solar_system("ss")),
            },
            RecordOperation::AddRecord {
                record: Record::new(planet("jupiter"))
                    .with_attribute("name", json!("Jupiter"))
                    .with_attribute("order", json!(5))
                    .with_has_many("moons", [moon("io"), moon("europa")])
                    .with_has_one("solarSystem", solar_system("ss")),
            },
            RecordOperation::AddRecord {
                record: Record::new(planet("mercury"))
                    .with_attribute("name", json!("Mercury"))
                    .with_attribute("order", json!(1))
                    .with_has_one("solarSystem", solar_system("ss")),
            },
            RecordOperation::AddRecord {
                record: Record::new(planet("earth"))
                    .with_attribute("name", json!("Earth"))
                    .with_attribute("order", json!(3))
                    .with_has_one("solarSystem", solar_system("ss")),
            },
        ])
        .unwrap();
    cache
}

fn ids(result: weft_core::QueryResult) -> Vec<String> {
    result
        .into_records()
        .unwrap()
        .into_iter()
        .map(|record| record.identity.id)
        .collect()
}

#[test]
fn find_record_raises_for_absent_identities() {
    let cache = seeded_cache();
    assert!(cache
        .query(&QueryExpression::FindRecord {
            record: planet("jupiter")
        })
        .is_ok());

    let err = cache
        .query(&QueryExpression::FindRecord {
            record: planet("pluto"),
        })
        .unwrap_err();
    assert_eq!(
        err,
        CacheError::RecordNotFound {
            identity: planet("pluto")
        }
    );
}

#[test]
fn sort_and_page_select_the_middle_planet() {
    let cache = seeded_cache();
    let result = cache
        .query(&QueryExpression::FindRecords {
            ty: Some("planet".into()),
            filter: vec![],
            sort: vec![SortSpec::Attribute {
                attribute: "order".into(),
                order: SortOrder::Ascending,
            }],
            page: Some(Page {
                offset: Some(1),
                limit: Some(1),
            }),
        })
        .unwrap();
    assert_eq!(ids(result), vec!["earth"]);
}

#[test]
fn descending_sort_reverses_and_puts_unset_first() {
    let mut cache = seeded_cache();
    cache
        .patch_one(RecordOperation::AddRecord {
            record: Record::new(planet("rogue")).with_attribute("name", json!("Rogue")),
        })
        .unwrap();

    let result = cache
        .query(&QueryExpression::FindRecords {
            ty: Some("planet".into()),
            filter: vec![],
            sort: vec![SortSpec::Attribute {
                attribute: "order".into(),
                order: SortOrder::Descending,
            }],
            page: None,
        })
        .unwrap();
    assert_eq!(ids(result), vec!["rogue", "jupiter", "earth", "mercury"]);
}

#[test]
fn page_without_limit_is_a_parse_error() {
    let cache = seeded_cache();
    let err = cache
        .query(&QueryExpression::FindRecords {
            ty: Some("planet".into()),
            filter: vec![],
            sort: vec![],
            page: Some(Page {
                offset: Some(1),
                limit: None,
            }),
        })
        .unwrap_err();
    assert!(matches!(err, CacheError::QueryExpressionParse { .. }));
}

#[test]
fn attribute_filters_combine_with_and() {
    let cache = seeded_cache();
    let result = cache
        .query(&QueryExpression::FindRecords {
            ty: Some("planet".into()),
            filter: vec![
                FilterSpec::Attribute {
                    attribute: "order".into(),
                    op: AttributeOp::Gte,
                    value: json!(3),
                },
                FilterSpec::Attribute {
                    attribute: "order".into(),
                    op: AttributeOp::Lt,
                    value: json!(5),
                },
            ],
            sort: vec![],
            page: None,
        })
        .unwrap();
    assert_eq!(ids(result), vec!["earth"]);
}

#[test]
fn related_records_filter_selects_by_membership() {
    let cache = seeded_cache();
    let result = cache
        .query(&QueryExpression::FindRecords {
            ty: Some("planet".into()),
            filter: vec![FilterSpec::RelatedRecords {
                relationship: "moons".into(),
                op: SetOp::Some,
                records: vec![moon("io")],
            }],
            sort: vec![],
            page: None,
        })
        .unwrap();
    assert_eq!(ids(result), vec!["jupiter"]);

    let result = cache
        .query(&QueryExpression::FindRecords {
            ty: Some("planet".into()),
            filter: vec![FilterSpec::RelatedRecords {
                relationship: "moons".into(),
                op: SetOp::None,
                records: vec![moon("io")],
            }],
            sort: vec![],
            page: None,
        })
        .unwrap();
    assert_eq!(ids(result), vec!["earth", "mercury"]);
}

#[test]
fn related_record_filter_matches_has_one_targets() {
    let cache = seeded_cache();
    let result = cache
        .query(&QueryExpression::FindRecords {
            ty: Some("moon".into()),
            filter: vec![FilterSpec::RelatedRecord {
                relationship: "planet".into(),
                records: vec![Some(planet("jupiter"))],
            }],
            sort: vec![],
            page: None,
        })
        .unwrap();
    assert_eq!(ids(result), vec!["europa", "io"]);
}

#[test]
fn untyped_find_records_scans_every_bucket_in_type_order() {
    let cache = seeded_cache();
    let result = cache
        .query(&QueryExpression::FindRecords {
            ty: None,
            filter: vec![],
            sort: vec![],
            page: None,
        })
        .unwrap();
    let records = result.into_records().unwrap();
    // moon < planet < solarSystem; ids ascend within each bucket.
    let types: Vec<String> = records
        .iter()
        .map(|record| record.identity.ty.clone())
        .collect();
    let mut sorted = types.clone();
    sorted.sort();
    assert_eq!(types, sorted);
    assert_eq!(records.len(), 6);
}

#[test]
fn traversal_resolves_full_records() {
    let cache = seeded_cache();

    let result = cache
        .query(&QueryExpression::FindRelatedRecord {
            record: planet("jupiter"),
            relationship: "solarSystem".into(),
        })
        .unwrap();
    assert_eq!(
        result.into_record().unwrap().identity,
        solar_system("ss")
    );

    let result = cache
        .query(&QueryExpression::FindRelatedRecords {
            record: planet("jupiter"),
            relationship: "moons".into(),
        })
        .unwrap();
    assert_eq!(ids(result), vec!["io", "europa"]);

    // Absent base record resolves to null, not an error.
    let result = cache
        .query(&QueryExpression::FindRelatedRecord {
            record: planet("pluto"),
            relationship: "solarSystem".into(),
        })
        .unwrap();
    assert_eq!(result.into_record(), None);
}

#[test]
fn identical_queries_return_identical_sequences() {
    let cache = seeded_cache();
    let expression = QueryExpression::FindRecords {
        ty: Some("planet".into()),
        filter: vec![FilterSpec::Attribute {
            attribute: "order".into(),
            op: AttributeOp::Gt,
            value: json!(0),
        }],
        sort: vec![SortSpec::Attribute {
            attribute: "name".into(),
            order: SortOrder::Ascending,
        }],
        page: None,
    };
    let first = cache.query(&expression).unwrap();
    let second = cache.query(&expression).unwrap();
    assert_eq!(first, second);
}
