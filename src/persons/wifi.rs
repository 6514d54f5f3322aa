// Copyright (c) 2024 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Wi-Fi SSID sensor detection over the Home Assistant entity registry.
//!
//! Mobile app integrations expose the connected SSID as a sensor on the same device as the
//! device tracker. The setup wizard tries to pick that sensor automatically and only asks
//! the user when the match is ambiguous.

use crate::client::model::RegistryEntry;

/// Device id of the registry entry for the given device tracker entity.
pub fn tracker_device_id<'a>(entries: &'a [RegistryEntry], tracker: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|e| e.entity_id == tracker)
        .and_then(|e| e.device_id.as_deref())
}

fn is_sensor(entry: &RegistryEntry) -> bool {
    entry.entity_id.starts_with("sensor.")
}

fn on_device(entry: &RegistryEntry, device_id: &str) -> bool {
    entry.device_id.as_deref() == Some(device_id)
}

fn matches_any(entry: &RegistryEntry, needles: &[&str], exclude: Option<&str>) -> bool {
    let id = entry.entity_id.to_lowercase();
    let name = entry
        .original_name
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    let hit = |haystack: &str| {
        needles.iter().any(|n| haystack.contains(n))
            && exclude.map(|e| !haystack.contains(e)).unwrap_or(true)
    };
    hit(&id) || hit(&name)
}

/// Sensors on the tracker's device that look like the SSID sensor of a mobile app.
///
/// Only a single unambiguous match qualifies for auto-selection.
pub fn priority_matches(entries: &[RegistryEntry], device_id: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|e| is_sensor(e) && on_device(e, device_id))
        .filter(|e| matches_any(e, &["_ssid", "wifi_connection"], Some("bssid")))
        .map(|e| e.entity_id.clone())
        .collect()
}

/// Broader candidate list for the fallback selection screen.
pub fn fallback_candidates(entries: &[RegistryEntry], device_id: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|e| is_sensor(e) && on_device(e, device_id))
        .filter(|e| matches_any(e, &["wifi", "ssid"], None))
        .map(|e| e.entity_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(entity_id: &str, device_id: Option<&str>, original_name: Option<&str>) -> RegistryEntry {
        RegistryEntry {
            entity_id: entity_id.into(),
            device_id: device_id.map(str::to_string),
            original_name: original_name.map(str::to_string),
        }
    }

    fn registry() -> Vec<RegistryEntry> {
        vec![
            entry("device_tracker.john_phone", Some("dev1"), Some("John Phone")),
            entry("sensor.john_phone_ssid", Some("dev1"), Some("SSID")),
            entry("sensor.john_phone_bssid", Some("dev1"), Some("BSSID")),
            entry("sensor.john_phone_battery", Some("dev1"), Some("Battery level")),
            entry("sensor.jane_phone_ssid", Some("dev2"), Some("SSID")),
            entry("sensor.standalone", None, Some("WiFi strength")),
        ]
    }

    #[test]
    fn finds_tracker_device() {
        assert_eq!(
            Some("dev1"),
            tracker_device_id(&registry(), "device_tracker.john_phone")
        );
        assert_eq!(None, tracker_device_id(&registry(), "device_tracker.other"));
    }

    #[test]
    fn single_priority_match_on_same_device() {
        let matches = priority_matches(&registry(), "dev1");
        assert_eq!(vec!["sensor.john_phone_ssid".to_string()], matches);
    }

    #[test]
    fn bssid_sensor_is_excluded() {
        let entries = vec![entry("sensor.john_phone_bssid", Some("dev1"), None)];
        assert!(priority_matches(&entries, "dev1").is_empty());
    }

    #[test]
    fn ambiguous_matches_are_all_returned() {
        let entries = vec![
            entry("sensor.phone_ssid", Some("dev1"), None),
            entry("sensor.phone_wifi_connection", Some("dev1"), None),
        ];
        assert_eq!(2, priority_matches(&entries, "dev1").len());
    }

    #[rstest]
    #[case("sensor.a", Some("Wifi Connection"), true)]
    #[case("sensor.a_wifi_signal", None, true)]
    #[case("sensor.a", Some("Battery"), false)]
    fn fallback_matches_by_id_or_name(
        #[case] entity_id: &str,
        #[case] name: Option<&str>,
        #[case] expected: bool,
    ) {
        let entries = vec![entry(entity_id, Some("dev1"), name)];
        assert_eq!(expected, !fallback_candidates(&entries, "dev1").is_empty());
    }

    #[test]
    fn fallback_ignores_other_devices_and_non_sensors() {
        let candidates = fallback_candidates(&registry(), "dev1");
        assert_eq!(
            vec![
                "sensor.john_phone_ssid".to_string(),
                "sensor.john_phone_bssid".to_string()
            ],
            candidates
        );
    }
}
