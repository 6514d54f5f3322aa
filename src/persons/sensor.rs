// Copyright (c) 2024 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Derived proxy sensors: Wi-Fi result, zone result, places result and tracker info.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{sensor_entity_id, PersonConfig, UpstreamState};
use crate::server::{AvailableEntity, EntityChange, EntityType};

/// Home Assistant convention for an entity without a known state.
pub(crate) const STATE_UNKNOWN: &str = "unknown";

fn upstream_value(upstream: &HashMap<String, UpstreamState>, entity_id: &str) -> String {
    upstream
        .get(entity_id)
        .map(|s| s.state.clone())
        .unwrap_or_else(|| STATE_UNKNOWN.into())
}

fn upstream_attr<'a>(
    upstream: &'a HashMap<String, UpstreamState>,
    entity_id: &str,
    attr: &str,
) -> Option<&'a Value> {
    upstream.get(entity_id).and_then(|s| s.attributes.get(attr))
}

fn sensor_change(record: &PersonConfig, kind: &str, value: String, source: &str) -> EntityChange {
    let mut attributes = Map::with_capacity(2);
    attributes.insert("value".into(), value.into());
    if !source.is_empty() {
        attributes.insert("source_entity".into(), source.into());
    }

    EntityChange {
        device_id: Some(record.slug().into()),
        entity_type: EntityType::Sensor,
        entity_id: sensor_entity_id(record.slug(), kind),
        attributes,
    }
}

/// State of the configured Wi-Fi SSID sensor, `unknown` when unset or absent.
pub(crate) fn wifi_result(
    record: &PersonConfig,
    upstream: &HashMap<String, UpstreamState>,
) -> EntityChange {
    let (value, source) = match record.wifi_sensor.as_deref() {
        Some(wifi) => (upstream_value(upstream, wifi), wifi),
        None => (STATE_UNKNOWN.into(), ""),
    };
    sensor_change(record, "wifi_result", value, source)
}

/// Zone reported by the source device tracker.
pub(crate) fn zone_result(
    record: &PersonConfig,
    upstream: &HashMap<String, UpstreamState>,
) -> EntityChange {
    sensor_change(
        record,
        "zone_result",
        upstream_value(upstream, &record.device_tracker),
        &record.device_tracker,
    )
}

/// Geocoded location from the places sensor. Only derived when one is configured.
pub(crate) fn places_result(
    record: &PersonConfig,
    upstream: &HashMap<String, UpstreamState>,
) -> Option<EntityChange> {
    let places = record.places_entity.as_deref()?;
    Some(sensor_change(
        record,
        "places_result",
        upstream_value(upstream, places),
        places,
    ))
}

/// Coordinate summary of the source tracker: `"{lat}, {lon}"`, `unknown` if either is missing.
pub(crate) fn tracker_info(
    record: &PersonConfig,
    upstream: &HashMap<String, UpstreamState>,
) -> EntityChange {
    let tracker = record.device_tracker.as_str();
    let lat = upstream_attr(upstream, tracker, "latitude").and_then(super::tracker::parse_coordinate);
    let lon =
        upstream_attr(upstream, tracker, "longitude").and_then(super::tracker::parse_coordinate);

    let value = match (lat, lon) {
        (Some(lat), Some(lon)) => format!("{lat}, {lon}"),
        _ => STATE_UNKNOWN.into(),
    };

    let mut change = sensor_change(record, "tracker_info", value, tracker);
    if let Some(lat) = lat {
        change.attributes.insert("latitude".into(), lat.into());
    }
    if let Some(lon) = lon {
        change.attributes.insert("longitude".into(), lon.into());
    }
    if let Some(accuracy) = upstream_attr(upstream, tracker, "gps_accuracy") {
        change
            .attributes
            .insert("gps_accuracy".into(), accuracy.clone());
    }
    change
}

fn available_sensor(
    record: &PersonConfig,
    kind: &str,
    label: &str,
    change: EntityChange,
) -> AvailableEntity {
    AvailableEntity {
        entity_id: sensor_entity_id(record.slug(), kind),
        device_id: Some(record.slug().into()),
        entity_type: EntityType::Sensor,
        device_class: None,
        name: HashMap::from([(
            "en".into(),
            format!("{} {label}", record.display_name()),
        )]),
        attributes: Some(change.attributes),
    }
}

pub(crate) fn available_sensors(
    record: &PersonConfig,
    upstream: &HashMap<String, UpstreamState>,
) -> Vec<AvailableEntity> {
    let mut entities = vec![
        available_sensor(
            record,
            "wifi_result",
            "Wi-Fi Result",
            wifi_result(record, upstream),
        ),
        available_sensor(
            record,
            "zone_result",
            "Zone Result",
            zone_result(record, upstream),
        ),
        available_sensor(
            record,
            "tracker_info",
            "Tracker Info",
            tracker_info(record, upstream),
        ),
    ];
    if let Some(places) = places_result(record, upstream) {
        entities.push(available_sensor(
            record,
            "places_result",
            "Places Result",
            places,
        ));
    }
    entities
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
            places_entity: None,
            category: "Family".into(),
            name: "John".into(),
        }
    }

    fn cache(entity_id: &str, state: &str, attributes: Map<String, Value>) -> HashMap<String, UpstreamState> {
        HashMap::from([(
            entity_id.to_string(),
            UpstreamState {
                state: state.into(),
                attributes,
            },
        )])
    }

    #[test]
    fn wifi_result_mirrors_upstream_state() {
        let upstream = cache("sensor.john_phone_ssid", "MyWifi", Map::new());
        let change = wifi_result(&record(), &upstream);
        assert_eq!(Some(&json!("MyWifi")), change.attributes.get("value"));
    }

    #[test]
    fn wifi_result_without_configured_sensor_is_unknown() {
        let mut r = record();
        r.wifi_sensor = None;
        let change = wifi_result(&r, &HashMap::new());
        assert_eq!(Some(&json!(STATE_UNKNOWN)), change.attributes.get("value"));
    }

    #[test]
    fn tracker_info_concatenates_coordinates() {
        let mut attributes = Map::new();
        attributes.insert("latitude".into(), json!(47.5));
        attributes.insert("longitude".into(), json!(8.25));
        attributes.insert("gps_accuracy".into(), json!(5));
        let upstream = cache("device_tracker.john_phone", "home", attributes);

        let change = tracker_info(&record(), &upstream);
        assert_eq!(Some(&json!("47.5, 8.25")), change.attributes.get("value"));
        assert_eq!(Some(&json!(47.5)), change.attributes.get("latitude"));
        assert_eq!(Some(&json!(5)), change.attributes.get("gps_accuracy"));
    }

    #[test]
    fn tracker_info_without_coordinates_is_unknown() {
        let upstream = cache("device_tracker.john_phone", "home", Map::new());
        let change = tracker_info(&record(), &upstream);
        assert_eq!(Some(&json!(STATE_UNKNOWN)), change.attributes.get("value"));
        assert!(!change.attributes.contains_key("latitude"));
    }

    #[test]
    fn available_sensors_skip_places_when_not_configured() {
        let entities = available_sensors(&record(), &HashMap::new());
        assert_eq!(3, entities.len());
        assert!(entities
            .iter()
            .all(|e| !e.entity_id.ends_with("_places_result")));
    }

    #[test]
    fn available_sensor_names_use_display_name() {
        let entities = available_sensors(&record(), &HashMap::new());
        assert_eq!(Some(&"John Wi-Fi Result".to_string()), entities[0].name.get("en"));
    }
}
