// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Inverse-index maintenance and referential integrity on removal: after any
//! patch, forward pointers and the index agree, and removing a record erases
//! every pointer aimed at it.

mod common;

use common::{moon, planet, solar_schema, solar_system};
use weft_core::{
    InverseRef, Record, RecordAccessor, RecordCache, RecordOperation, RelationshipData,
};

#[test]
fn index_mirrors_forward_pointers_after_inserts() {
    let mut cache = RecordCache::new(solar_schema());
    cache
        .patch(vec![
            RecordOperation::AddRecord {
                record: Record::new(solar_system("ss")),
            },
            RecordOperation::AddRecord {
                record: Record::new(planet("jupiter"))
                    .with_has_one("solarSystem", solar_system("ss"))
                    .with_has_many("moons", [moon("io")]),
            },
        ])
        .unwrap();

    // jupiter.solarSystem = ss  =>  entry at ss: (jupiter, solarSystem)
    let at_ss = cache.accessor().inversely_related(&solar_system("ss"));
    assert!(at_ss.contains(&InverseRef::new(planet("jupiter"), "solarSystem")));

    // jupiter.moons ∋ io  =>  entry at io: (jupiter, moons)
    let at_io = cache.accessor().inversely_related(&moon("io"));
    assert!(at_io.contains(&InverseRef::new(planet("jupiter"), "moons")));

    // io.planet = jupiter (propagated)  =>  entry at jupiter: (io, planet)
    let at_jupiter = cache.accessor().inversely_related(&planet("jupiter"));
    assert!(at_jupiter.contains(&InverseRef::new(moon("io"), "planet")));
}

#[test]
fn remove_record_cascades_to_every_inbound_pointer() {
    let mut cache = RecordCache::new(solar_schema());
    cache
        .patch(vec![
            RecordOperation::AddRecord {
                record: Record::new(planet("jupiter"))
                    .with_has_many("moons", [moon("io"), moon("europa")]),
            },
        ])
        .unwrap();

    cache
        .patch_one(RecordOperation::RemoveRecord {
            record: planet("jupiter"),
        })
        .unwrap();

    assert!(cache.record(&planet("jupiter")).is_none());
    assert_eq!(
        cache
            .find_record(&moon("io"))
            .unwrap()
            .relationship("planet"),
        Some(&RelationshipData::One(None))
    );
    assert_eq!(
        cache
            .find_record(&moon("europa"))
            .unwrap()
            .relationship("planet"),
        Some(&RelationshipData::One(None))
    );
    assert!(
        cache
            .accessor()
            .inversely_related(&planet("jupiter"))
            .is_empty(),
        "no back-refs may remain for a removed record"
    );
}

#[test]
fn remove_record_clears_the_removed_records_own_index_entries() {
    let mut cache = RecordCache::new(solar_schema());
    cache
        .patch(vec![
            RecordOperation::AddRecord {
                record: Record::new(solar_system("ss")),
            },
            RecordOperation::AddRecord {
                record: Record::new(planet("jupiter"))
                    .with_has_one("solarSystem", solar_system("ss")),
            },
        ])
        .unwrap();

    cache
        .patch_one(RecordOperation::RemoveRecord {
            record: planet("jupiter"),
        })
        .unwrap();

    // jupiter's outbound entry at ss is gone, and ss no longer lists it.
    assert!(cache
        .accessor()
        .inversely_related(&solar_system("ss"))
        .is_empty());
    let ss = cache.find_record(&solar_system("ss")).unwrap();
    assert_eq!(
        ss.relationship("planets"),
        Some(&RelationshipData::Many(Vec::new()))
    );
}

#[test]
fn retargeting_a_pointer_moves_the_index_entry() {
    let mut cache = RecordCache::new(solar_schema());
    cache
        .patch(vec![
            RecordOperation::AddRecord {
                record: Record::new(planet("jupiter")),
            },
            RecordOperation::AddRecord {
                record: Record::new(planet("saturn")),
            },
            RecordOperation::AddRecord {
                record: Record::new(moon("io")).with_has_one("planet", planet("jupiter")),
            },
        ])
        .unwrap();

    cache
        .patch_one(RecordOperation::ReplaceRelatedRecord {
            record: moon("io"),
            relationship: "planet".into(),
            related_record: Some(planet("saturn")),
        })
        .unwrap();

    assert!(!cache
        .accessor()
        .inversely_related(&planet("jupiter"))
        .contains(&InverseRef::new(moon("io"), "planet")));
    assert!(cache
        .accessor()
        .inversely_related(&planet("saturn"))
        .contains(&InverseRef::new(moon("io"), "planet")));
}

#[test]
fn undoing_a_removal_restores_pointers_and_index() {
    let mut cache = RecordCache::new(solar_schema());
    cache
        .patch(vec![
            RecordOperation::AddRecord {
                record: Record::new(planet("jupiter"))
                    .with_has_many("moons", [moon("io"), moon("europa")]),
            },
        ])
        .unwrap();

    let removal = cache
        .patch_one(RecordOperation::RemoveRecord {
            record: planet("jupiter"),
        })
        .unwrap();
    cache.patch(removal.inverse).unwrap();

    let jupiter = cache.find_record(&planet("jupiter")).unwrap();
    let Some(RelationshipData::Many(moons)) = jupiter.relationship("moons") else {
        panic!("expected restored hasMany data");
    };
    let mut moons = moons.clone();
    moons.sort();
    assert_eq!(moons, vec![moon("europa"), moon("io")]);

    assert_eq!(
        cache
            .find_record(&moon("io"))
            .unwrap()
            .relationship("planet"),
        Some(&RelationshipData::one(planet("jupiter")))
    );
    let at_io = cache.accessor().inversely_related(&moon("io"));
    assert!(at_io.contains(&InverseRef::new(planet("jupiter"), "moons")));
}
