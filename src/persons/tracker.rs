// Copyright (c) 2024 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Derived device tracker proxying the source tracker's position.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{tracker_entity_id, PersonConfig, UpstreamState, STATE_UNKNOWN};
use crate::server::{AvailableEntity, EntityChange, EntityType};

/// Coordinates arrive either as numbers or as strings, depending on the upstream
/// integration. Anything else is treated as missing.
pub(crate) fn parse_coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn tracker_change(
    record: &PersonConfig,
    upstream: &HashMap<String, UpstreamState>,
) -> EntityChange {
    let source = upstream.get(&record.device_tracker);

    let mut attributes = Map::with_capacity(7);
    attributes.insert(
        "state".into(),
        source
            .map(|s| s.state.clone())
            .unwrap_or_else(|| STATE_UNKNOWN.into())
            .into(),
    );
    attributes.insert("source_entity".into(), record.device_tracker.as_str().into());
    attributes.insert("person".into(), record.display_name().into());
    attributes.insert("category".into(), record.category.as_str().into());

    if let Some(source) = source {
        if let Some(lat) = source.attributes.get("latitude").and_then(parse_coordinate) {
            attributes.insert("latitude".into(), lat.into());
        }
        if let Some(lon) = source.attributes.get("longitude").and_then(parse_coordinate) {
            attributes.insert("longitude".into(), lon.into());
        }
        if let Some(accuracy) = source.attributes.get("gps_accuracy") {
            attributes.insert("gps_accuracy".into(), accuracy.clone());
        }
    }

    EntityChange {
        device_id: Some(record.slug().into()),
        entity_type: EntityType::DeviceTracker,
        entity_id: tracker_entity_id(record.slug()),
        attributes,
    }
}

pub(crate) fn available_tracker(
    record: &PersonConfig,
    upstream: &HashMap<String, UpstreamState>,
) -> AvailableEntity {
    let change = tracker_change(record, upstream);
    AvailableEntity {
        entity_id: change.entity_id.clone(),
        device_id: Some(record.slug().into()),
        entity_type: EntityType::DeviceTracker,
        device_class: None,
        name: HashMap::from([("en".into(), record.display_name().to_string())]),
        attributes: Some(change.attributes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn record() -> PersonConfig {
        PersonConfig {
            person: "person.john".into(),
            device_tracker: "device_tracker.john_phone".into(),
            wifi_sensor: None,
            places_entity: None,
            category: "Family".into(),
            name: "John".into(),
        }
    }

    #[rstest]
    #[case(json!(47.5), Some(47.5))]
    #[case(json!("47.5"), Some(47.5))]
    #[case(json!(" 8.25 "), Some(8.25))]
    #[case(json!(-120), Some(-120.0))]
    #[case(json!("not a number"), None)]
    #[case(json!(null), None)]
    #[case(json!(["47.5"]), None)]
    fn parse_coordinate_cases(#[case] value: Value, #[case] expected: Option<f64>) {
        assert_eq!(expected, parse_coordinate(&value));
    }

    #[test]
    fn tracker_change_without_source_is_unknown() {
        let change = tracker_change(&record(), &HashMap::new());
        assert_eq!("device_tracker.john_enhanced", change.entity_id);
        assert_eq!(Some(&json!(STATE_UNKNOWN)), change.attributes.get("state"));
        assert!(!change.attributes.contains_key("latitude"));
        assert_eq!(Some(&json!("Family")), change.attributes.get("category"));
    }

    #[test]
    fn tracker_change_proxies_position() {
        let mut attributes = Map::new();
        attributes.insert("latitude".into(), json!("47.5"));
        attributes.insert("longitude".into(), json!(8.25));
        attributes.insert("gps_accuracy".into(), json!(10));
        let upstream = HashMap::from([(
            "device_tracker.john_phone".to_string(),
            UpstreamState {
                state: "home".into(),
                attributes,
            },
        )]);

        let change = tracker_change(&record(), &upstream);
        assert_eq!(Some(&json!("home")), change.attributes.get("state"));
        assert_eq!(Some(&json!(47.5)), change.attributes.get("latitude"));
        assert_eq!(Some(&json!(8.25)), change.attributes.get("longitude"));
        assert_eq!(Some(&json!(10)), change.attributes.get("gps_accuracy"));
    }
}
