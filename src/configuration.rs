// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Configuration file handling.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use config::Config;
use log::{error, info, warn};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use url::Url;

use crate::errors::ServiceError;
use crate::persons::PersonConfig;
use crate::server::IntegrationDriverInfo;
use crate::APP_VERSION;

/// Default configuration file.
pub const DEF_CONFIG_FILE: &str = "configuration.yaml";

pub const DEF_HA_URL: &str = "ws://homeassistant.local:8123/api/websocket";

pub const ENV_SETUP_TIMEOUT: &str = "EP_SETUP_TIMEOUT";
pub const DEF_SETUP_TIMEOUT_SEC: u64 = 300;

const ENV_USER_CFG_FILENAME: &str = "EP_USER_CFG_FILENAME";
const DEF_USER_CFG_FILENAME: &str = "enhanced-people.json";

/// Environment variable for the user configuration directory.
///
/// If not set, the current directory is used.
const ENV_CONFIG_HOME: &str = "EP_CONFIG_HOME";

/// Environment variable to enable Home Assistant server WebSocket message tracing.
///
/// **Attention:** this setting is only for debugging and exposes all data, including credentials!
pub const ENV_HASS_MSG_TRACING: &str = "EP_HASS_MSG_TRACING";

/// Environment variable to enable integration API WebSocket message tracing.
pub const ENV_API_MSG_TRACING: &str = "EP_API_MSG_TRACING";

/// Compiled-in driver metadata in json format.
const DRIVER_METADATA: &str = include_str!("../resources/driver.json");

#[derive(Default, serde::Deserialize, serde::Serialize)]
pub struct Settings {
    pub integration: IntegrationSettings,
    pub hass: HomeAssistantSettings,
    /// Person records created by the setup wizard.
    #[serde(default)]
    pub persons: Vec<PersonConfig>,
}

#[derive(serde::Deserialize, serde::Serialize)]
pub struct IntegrationSettings {
    pub interface: String,
    pub http: WebServerSettings,
    pub websocket: Option<WebSocketSettings>,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            interface: "0.0.0.0".to_string(),
            http: WebServerSettings {
                enabled: true,
                port: 8000,
            },
            websocket: None,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize)]
pub struct WebServerSettings {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Default, Clone, serde::Deserialize, serde::Serialize)]
pub struct WebSocketSettings {
    pub token: Option<String>,
}

#[derive(Clone, serde::Deserialize, serde::Serialize)]
pub struct HomeAssistantSettings {
    pub url: Url,
    pub token: String,
    /// WebSocket connection timeout in seconds.
    /// This is the max time allowed to connect to the remote host, including DNS name resolution.
    pub connection_timeout: u8,
    pub max_frame_size_kb: usize,
    pub reconnect: ReconnectSettings,
    pub heartbeat: HeartbeatSettings,
    /// Disconnect the Home Assistant connection while all clients are in standby.
    #[serde(default = "default_disconnect_in_standby")]
    pub disconnect_in_standby: bool,
}

impl Default for HomeAssistantSettings {
    fn default() -> Self {
        Self {
            url: Url::parse(DEF_HA_URL).expect("invalid default HA URL"),
            token: "".to_string(),
            connection_timeout: 6,
            max_frame_size_kb: 5120,
            reconnect: Default::default(),
            heartbeat: Default::default(),
            disconnect_in_standby: default_disconnect_in_standby(),
        }
    }
}

fn default_disconnect_in_standby() -> bool {
    false
}

#[serde_as]
#[derive(Clone, serde::Deserialize, serde::Serialize)]
pub struct ReconnectSettings {
    /// Max reconnect attempts, 0 = unlimited.
    pub attempts: u32,
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "duration_ms")]
    pub duration: Duration,
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "duration_max_ms")]
    pub duration_max: Duration,
    pub backoff_factor: f32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            attempts: 0,
            duration: Duration::from_secs(1),
            duration_max: Duration::from_secs(30),
            backoff_factor: 1.5,
        }
    }
}

/// WebSocket heartbeat settings for sending ping frames.
#[serde_as]
#[derive(Clone, Copy, serde::Deserialize, serde::Serialize)]
pub struct HeartbeatSettings {
    /// How often heartbeat pings are sent
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "interval_sec")]
    pub interval: Duration,
    /// How long before lack of server response causes a timeout
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "timeout_sec")]
    pub timeout: Duration,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            timeout: Duration::from_secs(40),
        }
    }
}

impl Display for HeartbeatSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Heartbeat interval={:?}, timeout={:?}",
            self.interval, self.timeout
        )
    }
}

/// Setup flow timeout, overridable with the `EP_SETUP_TIMEOUT` env variable.
pub fn setup_timeout() -> Duration {
    let secs = env::var(ENV_SETUP_TIMEOUT)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEF_SETUP_TIMEOUT_SEC);
    Duration::from_secs(secs)
}

/// Load the configuration settings.
///
/// The application provides default values which can be overriden in the following order:
/// 1. Configuration settings in the read-only yaml configuration file specified in `filename`
/// 2. User provided configuration settings from the driver setup
/// 3. Environment variables with prefix `EP_` (works only for cfg keys not containing a `_`!)
///
/// If there's a configuration load error, the configuration will be reloaded without the user
/// provided configuration settings for auto-recovery with default values.
pub fn get_configuration(filename: Option<&str>) -> Result<Settings, config::ConfigError> {
    let user_config = user_settings_path();
    if !user_config.is_file() {
        info!("No user settings file found");
        return load_configuration(filename, None);
    }

    match load_configuration(filename, Some(user_config)) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            error!("Error loading configuration, retrying without user configuration. Error: {e}");
            load_configuration(filename, None)
        }
    }
}

fn load_configuration(
    filename: Option<&str>,
    user_config: Option<PathBuf>,
) -> Result<Settings, config::ConfigError> {
    // default configuration
    let mut config = Config::builder().add_source(Config::try_from(&Settings::default())?);
    // read optional configuration file to override defaults
    if let Some(filename) = filename {
        config = config.add_source(config::File::with_name(filename));
    }

    // Overlay user provided configuration file from driver setup flow.
    if let Some(user_config) = user_config {
        config = config.add_source(config::File::from(user_config));
    }

    // Add in settings from the environment (with a prefix of EP)
    // E.g. `EP_HASS_URL=http://localhost:8123/api/websocket` would set the `hass.url` key
    // This does NOT WORK for nested configurations! https://github.com/mehcode/config-rs/issues/312
    let config = config
        .add_source(config::Environment::with_prefix("EP").separator("_"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;

    check_cfg_values(settings)
}

fn check_cfg_values(mut settings: Settings) -> Result<Settings, config::ConfigError> {
    if settings.hass.reconnect.backoff_factor < 1.0
        || settings.hass.reconnect.duration.as_millis() < 100
        || settings.hass.reconnect.duration_max.as_millis() < 1000
    {
        warn!("Invalid HA reconnect settings, using defaults.");
        settings.hass.reconnect = Default::default();
    }

    if settings.hass.heartbeat.interval.as_secs() < 5
        || settings.hass.heartbeat.timeout.as_secs() < 5
        || settings.hass.heartbeat.timeout.as_secs() <= settings.hass.heartbeat.interval.as_secs()
    {
        warn!("Invalid HA heartbeat settings, using defaults.");
        settings.hass.heartbeat = Default::default();
    }

    match settings.hass.url.scheme() {
        "ws" | "wss" => {}
        "http" => settings.hass.url.set_scheme("ws").expect("set_scheme ws"),
        "https" => settings.hass.url.set_scheme("wss").expect("set_scheme wss"),
        scheme => {
            return Err(config::ConfigError::Message(format!(
                "invalid scheme in hass.url: {scheme}. Valid: [ws, wss]"
            )));
        }
    }

    let person_count = settings.persons.len();
    settings.persons.retain(PersonConfig::is_valid);
    if settings.persons.len() != person_count {
        warn!(
            "Ignoring {} invalid person record(s) in configuration",
            person_count - settings.persons.len()
        );
    }

    Ok(settings)
}

/// Deserialize and enhance driver information from compiled-in json data.
pub fn get_driver_metadata() -> Result<IntegrationDriverInfo, io::Error> {
    let mut driver: IntegrationDriverInfo = serde_json::from_str(DRIVER_METADATA).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid driver.json format: {e}"),
        )
    })?;

    if driver.driver_id.is_none() {
        driver.driver_id = Some("enhanced-people".into())
    }
    if !driver
        .name
        .as_ref()
        .map(|v| !v.is_empty())
        .unwrap_or_default()
    {
        driver.name = Some(std::collections::HashMap::from([(
            "en".into(),
            "Enhanced People".into(),
        )]))
    }
    driver.token = None; // don't expose sensitive information
    driver.version = Some(APP_VERSION.to_string());

    Ok(driver)
}

/// Wrapper with the root properties to make it compatible with the main configuration file.
#[derive(serde::Serialize)]
struct UserSettings<'a> {
    hass: &'a HomeAssistantSettings,
    persons: &'a [PersonConfig],
}

/// Store user configuration from the setup flow.
pub fn save_user_settings(
    hass: &HomeAssistantSettings,
    persons: &[PersonConfig],
) -> Result<(), ServiceError> {
    let cfg = UserSettings { hass, persons };
    fs::write(user_settings_path(), serde_json::to_string_pretty(&cfg)?).map_err(|e| {
        let msg = format!("Error saving user configuration: {e}");
        error!("{msg}");
        ServiceError::InternalServerError(msg)
    })?;
    Ok(())
}

/// Get user configuration file path.
///
/// This configuration file is updatable with [`save_user_settings`] from the driver setup flow.
fn user_settings_path() -> PathBuf {
    let file = env::var(ENV_USER_CFG_FILENAME).unwrap_or(DEF_USER_CFG_FILENAME.into());
    Path::new(&env::var(ENV_CONFIG_HOME).unwrap_or_default()).join(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn default_settings_pass_validation() {
        assert!(check_cfg_values(settings()).is_ok());
    }

    #[test]
    fn http_scheme_is_coerced_to_ws() {
        let mut cfg = settings();
        cfg.hass.url = Url::parse("http://hass.local:8123/api/websocket").unwrap();
        let cfg = check_cfg_values(cfg).unwrap();
        assert_eq!("ws", cfg.hass.url.scheme());

        let mut cfg = settings();
        cfg.hass.url = Url::parse("https://hass.local:8123/api/websocket").unwrap();
        let cfg = check_cfg_values(cfg).unwrap();
        assert_eq!("wss", cfg.hass.url.scheme());
    }

    #[test]
    fn invalid_scheme_is_rejected() {
        let mut cfg = settings();
        cfg.hass.url = Url::parse("ftp://hass.local").unwrap();
        assert!(check_cfg_values(cfg).is_err());
    }

    #[test]
    fn invalid_reconnect_settings_fall_back_to_defaults() {
        let mut cfg = settings();
        cfg.hass.reconnect.backoff_factor = 0.1;
        let cfg = check_cfg_values(cfg).unwrap();
        assert_eq!(1.5, cfg.hass.reconnect.backoff_factor);
    }

    #[test]
    fn invalid_person_records_are_dropped() {
        let mut cfg = settings();
        cfg.persons = vec![
            PersonConfig {
                person: "person.john".into(),
                device_tracker: "device_tracker.john_phone".into(),
                wifi_sensor: None,
                places_entity: None,
                category: "Family".into(),
                name: "John".into(),
            },
            PersonConfig {
                person: "".into(),
                device_tracker: "device_tracker.ghost".into(),
                wifi_sensor: None,
                places_entity: None,
                category: "".into(),
                name: "".into(),
            },
        ];
        let cfg = check_cfg_values(cfg).unwrap();
        assert_eq!(1, cfg.persons.len());
        assert_eq!("person.john", cfg.persons[0].person);
    }
}
