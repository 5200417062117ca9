// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

//! Shared fixtures: the solar-system schema and identity helpers.

use std::sync::Arc;

use weft_core::{Record, RecordIdentity, Schema};

/// Schema used across the integration suites:
/// - `planet` — attrs name/classification/revised/order, key remoteId,
///   moons (hasMany moon, inverse planet), solarSystem (hasOne, inverse
///   planets)
/// - `moon` — planet (hasOne planet, inverse moons)
/// - `solarSystem` — planets (hasMany planet, inverse solarSystem)
pub fn solar_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .model("planet", |m| {
                m.attributes(["name", "classification", "revised", "order"])
                    .key("remoteId")
                    .has_many("moons", "moon", Some("planet"))
                    .has_one("solarSystem", "solarSystem", Some("planets"))
            })
            .model("moon", |m| m.has_one("planet", "planet", Some("moons")))
            .model("solarSystem", |m| {
                m.has_many("planets", "planet", Some("solarSystem"))
            })
            .build(),
    )
}

pub fn planet(id: &str) -> RecordIdentity {
    RecordIdentity::new("planet", id)
}

pub fn moon(id: &str) -> RecordIdentity {
    RecordIdentity::new("moon", id)
}

pub fn solar_system(id: &str) -> RecordIdentity {
    RecordIdentity::new("solarSystem", id)
}

pub fn planet_record(id: &str, name: &str) -> Record {
    Record::new(planet(id)).with_attribute("name", name)
}
