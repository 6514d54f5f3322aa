// Copyright (c) 2024 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Person records and the derived entity set built from their upstream Home Assistant entities.
//!
//! Each configured person aggregates a `person` entity, a `device_tracker`, an optional Wi-Fi
//! SSID `sensor` and an optional places geocoding `sensor` into one derived device:
//! proxy sensors, a derived device tracker and a settable person-type text entity.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::model::UpstreamEntityState;
use crate::server::{AvailableEntity, EntityChange};

mod sensor;
mod text;
mod tracker;
pub mod wifi;

pub(crate) use sensor::STATE_UNKNOWN;

/// Flat configuration record of one tracked person.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PersonConfig {
    /// `person.*` entity this record aggregates.
    pub person: String,
    /// `device_tracker.*` source entity, usually from the mobile app.
    pub device_tracker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_sensor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_entity: Option<String>,
    /// Free-text label, editable through the person-type text entity.
    #[serde(default = "default_category")]
    pub category: String,
    /// Display name, taken from the person's friendly name during setup.
    #[serde(default)]
    pub name: String,
}

pub(crate) fn default_category() -> String {
    "Default".into()
}

impl PersonConfig {
    pub fn slug(&self) -> &str {
        object_id(&self.person)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.slug()
        } else {
            &self.name
        }
    }

    /// A record is only usable if both required entity references are present.
    pub fn is_valid(&self) -> bool {
        is_entity_of(&self.person, "person") && is_entity_of(&self.device_tracker, "device_tracker")
    }

    fn sources(&self) -> impl Iterator<Item = &str> {
        [Some(self.person.as_str()), Some(self.device_tracker.as_str())]
            .into_iter()
            .chain([self.wifi_sensor.as_deref(), self.places_entity.as_deref()])
            .flatten()
    }
}

/// Extract the object id part of an entity id, e.g. `person.john` -> `john`.
pub fn object_id(entity_id: &str) -> &str {
    entity_id
        .split_once('.')
        .map(|(_, object)| object)
        .unwrap_or(entity_id)
}

pub(crate) fn is_entity_of(entity_id: &str, domain: &str) -> bool {
    matches!(entity_id.split_once('.'), Some((d, object)) if d == domain && !object.is_empty())
}

pub(crate) fn sensor_entity_id(slug: &str, kind: &str) -> String {
    format!("sensor.{slug}_{kind}")
}

pub(crate) fn tracker_entity_id(slug: &str) -> String {
    format!("device_tracker.{slug}_enhanced")
}

pub(crate) fn text_entity_id(slug: &str) -> String {
    format!("text.{slug}_person_type")
}

/// Cached state of an upstream Home Assistant entity.
#[derive(Clone, Debug, Default)]
pub struct UpstreamState {
    pub state: String,
    pub attributes: Map<String, Value>,
}

/// All person records plus the cache of their upstream entity states.
///
/// The registry is the single source of truth for the configured persons at runtime;
/// the persisted configuration is written from [`PersonRegistry::records`].
#[derive(Default)]
pub struct PersonRegistry {
    records: Vec<PersonConfig>,
    upstream: HashMap<String, UpstreamState>,
}

impl PersonRegistry {
    pub fn new(records: Vec<PersonConfig>) -> Self {
        Self {
            records,
            upstream: HashMap::new(),
        }
    }

    pub fn records(&self) -> &[PersonConfig] {
        &self.records
    }

    pub fn is_configured(&self) -> bool {
        !self.records.is_empty()
    }

    /// Distinct, sorted category labels of all configured persons.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .records
            .iter()
            .map(|r| r.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Add a person record, replacing an existing record for the same person entity.
    pub fn upsert(&mut self, record: PersonConfig) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.person == record.person) {
            *existing = record;
        } else {
            self.records.push(record);
        }
    }

    /// All upstream entity ids any person record references.
    pub fn watched_entities(&self) -> HashSet<String> {
        self.records
            .iter()
            .flat_map(|r| r.sources().map(str::to_string))
            .collect()
    }

    fn is_watched(&self, entity_id: &str) -> bool {
        self.records.iter().any(|r| r.sources().any(|s| s == entity_id))
    }

    /// Friendly name of a person entity, if its state is cached.
    pub fn person_name(&self, person: &str) -> Option<String> {
        self.upstream
            .get(person)
            .and_then(|s| s.attributes.get("friendly_name"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// Update the cache from a single `state_changed` event and re-derive the entities
    /// of every person that references the changed upstream entity.
    pub fn apply_update(
        &mut self,
        entity_id: &str,
        state: String,
        attributes: Map<String, Value>,
    ) -> Vec<EntityChange> {
        if !self.is_watched(entity_id) {
            return Vec::new();
        }
        self.upstream
            .insert(entity_id.to_string(), UpstreamState { state, attributes });

        let mut changes = Vec::new();
        for record in &self.records {
            changes.extend(self.derive_for(record, entity_id));
        }
        changes
    }

    /// Replace the cache from a full `get_states` snapshot and re-derive everything.
    pub fn apply_snapshot(&mut self, states: Vec<UpstreamEntityState>) -> Vec<EntityChange> {
        self.upstream.clear();
        for entity in states {
            if self.is_watched(&entity.entity_id) {
                self.upstream.insert(
                    entity.entity_id,
                    UpstreamState {
                        state: entity.state,
                        attributes: entity.attributes,
                    },
                );
            }
        }
        self.entity_states()
    }

    /// Derived entities of one person affected by a change of `source`.
    fn derive_for(&self, record: &PersonConfig, source: &str) -> Vec<EntityChange> {
        let mut changes = Vec::new();
        if record.wifi_sensor.as_deref() == Some(source) {
            changes.push(sensor::wifi_result(record, &self.upstream));
        }
        if record.device_tracker == source {
            changes.push(sensor::zone_result(record, &self.upstream));
            changes.push(sensor::tracker_info(record, &self.upstream));
            changes.push(tracker::tracker_change(record, &self.upstream));
        }
        if record.places_entity.as_deref() == Some(source) {
            changes.extend(sensor::places_result(record, &self.upstream));
        }
        changes
    }

    /// Set the category of the person owning the given person-type text entity.
    ///
    /// Returns the resulting entity change, or `None` if no person owns the entity.
    /// An empty value resolves to the default category.
    pub fn set_category(&mut self, text_entity: &str, value: &str) -> Option<EntityChange> {
        let record = self
            .records
            .iter_mut()
            .find(|r| text_entity_id(r.slug()) == text_entity)?;

        let value = value.trim();
        record.category = if value.is_empty() {
            default_category()
        } else {
            value.to_string()
        };
        Some(text::person_type_change(record))
    }

    /// All derived entities for the `available_entities` response.
    pub fn available_entities(&self) -> Vec<AvailableEntity> {
        let mut entities = Vec::with_capacity(self.records.len() * 6);
        for record in &self.records {
            entities.extend(sensor::available_sensors(record, &self.upstream));
            entities.push(tracker::available_tracker(record, &self.upstream));
            entities.push(text::available_text(record));
        }
        entities
    }

    /// Current state of all derived entities for the `entity_states` response.
    pub fn entity_states(&self) -> Vec<EntityChange> {
        let mut changes = Vec::with_capacity(self.records.len() * 6);
        for record in &self.records {
            changes.push(sensor::wifi_result(record, &self.upstream));
            changes.push(sensor::zone_result(record, &self.upstream));
            changes.extend(sensor::places_result(record, &self.upstream));
            changes.push(sensor::tracker_info(record, &self.upstream));
            changes.push(tracker::tracker_change(record, &self.upstream));
            changes.push(text::person_type_change(record));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> PersonConfig {
        PersonConfig {
            person: "person.john".into(),
            device_tracker: "device_tracker.john_phone".into(),
            wifi_sensor: Some("sensor.john_phone_ssid".into()),
            places_entity: Some("sensor.places_john".into()),
            category: "Family".into(),
            name: "John".into(),
        }
    }

    fn attrs(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().cloned().map(|(k, v)| (k.into(), v)).collect()
    }

    #[test]
    fn unconfigured_registry_derives_nothing() {
        let mut registry = PersonRegistry::default();
        let changes = registry.apply_update("sensor.john_phone_ssid", "MyWifi".into(), Map::new());
        assert!(changes.is_empty());
        assert!(!registry.is_configured());
    }

    #[test]
    fn unwatched_entity_is_ignored() {
        let mut registry = PersonRegistry::new(vec![record()]);
        let changes = registry.apply_update("sensor.unrelated", "42".into(), Map::new());
        assert!(changes.is_empty());
    }

    #[test]
    fn wifi_update_derives_wifi_result() {
        let mut registry = PersonRegistry::new(vec![record()]);
        let changes = registry.apply_update("sensor.john_phone_ssid", "MyWifi".into(), Map::new());

        assert_eq!(1, changes.len());
        let change = &changes[0];
        assert_eq!("sensor.john_wifi_result", change.entity_id);
        assert_eq!(Some(&json!("MyWifi")), change.attributes.get("value"));
        assert_eq!(
            Some(&json!("sensor.john_phone_ssid")),
            change.attributes.get("source_entity")
        );
    }

    #[test]
    fn tracker_update_derives_zone_tracker_info_and_tracker() {
        let mut registry = PersonRegistry::new(vec![record()]);
        let changes = registry.apply_update(
            "device_tracker.john_phone",
            "home".into(),
            attrs(&[
                ("latitude", json!(47.3769)),
                ("longitude", json!(8.5417)),
                ("gps_accuracy", json!(12)),
            ]),
        );

        let ids: Vec<&str> = changes.iter().map(|c| c.entity_id.as_str()).collect();
        assert_eq!(
            vec![
                "sensor.john_zone_result",
                "sensor.john_tracker_info",
                "device_tracker.john_enhanced"
            ],
            ids
        );
        let info = &changes[1];
        assert_eq!(Some(&json!("47.3769, 8.5417")), info.attributes.get("value"));
    }

    #[test]
    fn absent_upstream_entity_reports_unknown() {
        let registry = PersonRegistry::new(vec![record()]);
        let states = registry.entity_states();
        let wifi = states
            .iter()
            .find(|c| c.entity_id == "sensor.john_wifi_result")
            .unwrap();
        assert_eq!(Some(&json!(STATE_UNKNOWN)), wifi.attributes.get("value"));
    }

    #[test]
    fn snapshot_replaces_cache() {
        let mut registry = PersonRegistry::new(vec![record()]);
        registry.apply_update("sensor.john_phone_ssid", "OldWifi".into(), Map::new());

        let changes = registry.apply_snapshot(vec![UpstreamEntityState {
            entity_id: "sensor.john_phone_ssid".into(),
            state: "NewWifi".into(),
            attributes: Map::new(),
        }]);

        let wifi = changes
            .iter()
            .find(|c| c.entity_id == "sensor.john_wifi_result")
            .unwrap();
        assert_eq!(Some(&json!("NewWifi")), wifi.attributes.get("value"));
    }

    #[test]
    fn person_without_places_has_no_places_result() {
        let mut r = record();
        r.places_entity = None;
        let registry = PersonRegistry::new(vec![r]);
        assert!(!registry
            .entity_states()
            .iter()
            .any(|c| c.entity_id == "sensor.john_places_result"));
    }

    #[test]
    fn upsert_replaces_record_for_same_person() {
        let mut registry = PersonRegistry::new(vec![record()]);
        let mut updated = record();
        updated.category = "Roommate".into();
        registry.upsert(updated);

        assert_eq!(1, registry.records().len());
        assert_eq!("Roommate", registry.records()[0].category);
    }

    #[test]
    fn set_category_updates_record_and_reports_change() {
        let mut registry = PersonRegistry::new(vec![record()]);
        let change = registry
            .set_category("text.john_person_type", "Kid")
            .unwrap();
        assert_eq!("text.john_person_type", change.entity_id);
        assert_eq!(Some(&json!("Kid")), change.attributes.get("value"));
        assert_eq!("Kid", registry.records()[0].category);
    }

    #[test]
    fn set_category_empty_value_falls_back_to_default() {
        let mut registry = PersonRegistry::new(vec![record()]);
        registry.set_category("text.john_person_type", "  ").unwrap();
        assert_eq!("Default", registry.records()[0].category);
    }

    #[test]
    fn set_category_unknown_entity_returns_none() {
        let mut registry = PersonRegistry::new(vec![record()]);
        assert!(registry.set_category("text.jane_person_type", "Kid").is_none());
    }

    #[test]
    fn categories_are_sorted_and_deduplicated() {
        let mut other = record();
        other.person = "person.jane".into();
        other.category = "Family".into();
        let mut third = record();
        third.person = "person.bob".into();
        third.category = "Guest".into();

        let registry = PersonRegistry::new(vec![record(), other, third]);
        assert_eq!(vec!["Family".to_string(), "Guest".to_string()], registry.categories());
    }

    #[test]
    fn watched_entities_cover_all_sources() {
        let registry = PersonRegistry::new(vec![record()]);
        let watched = registry.watched_entities();
        assert!(watched.contains("person.john"));
        assert!(watched.contains("device_tracker.john_phone"));
        assert!(watched.contains("sensor.john_phone_ssid"));
        assert!(watched.contains("sensor.places_john"));
    }
}
