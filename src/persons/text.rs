// Copyright (c) 2024 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Settable person-type text entity exposing the category label.

use std::collections::HashMap;

use serde_json::Map;

use super::{text_entity_id, PersonConfig};
use crate::server::{AvailableEntity, EntityChange, EntityType};

pub(crate) fn person_type_change(record: &PersonConfig) -> EntityChange {
    let mut attributes = Map::with_capacity(1);
    attributes.insert("value".into(), record.category.as_str().into());

    EntityChange {
        device_id: Some(record.slug().into()),
        entity_type: EntityType::Text,
        entity_id: text_entity_id(record.slug()),
        attributes,
    }
}

pub(crate) fn available_text(record: &PersonConfig) -> AvailableEntity {
    let change = person_type_change(record);
    AvailableEntity {
        entity_id: change.entity_id.clone(),
        device_id: Some(record.slug().into()),
        entity_type: EntityType::Text,
        device_class: None,
        name: HashMap::from([(
            "en".into(),
            format!("{} Person Type", record.display_name()),
        )]),
        attributes: Some(change.attributes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn person_type_exposes_category() {
        let record = PersonConfig {
            person: "person.john".into(),
            device_tracker: "device_tracker.john_phone".into(),
            wifi_sensor: None,
            places_entity: None,
            category: "Family".into(),
            name: "John".into(),
        };

        let change = person_type_change(&record);
        assert_eq!("text.john_person_type", change.entity_id);
        assert_eq!(Some(&json!("Family")), change.attributes.get("value"));

        let entity = available_text(&record);
        assert_eq!(Some(&"John Person Type".to_string()), entity.name.get("en"));
    }
}
