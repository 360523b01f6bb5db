use serde::Deserialize;

use crate::mqtt::config::{DEFAULT_HOSTNAME, DEFAULT_PORT, DEFAULT_PROTOCOL};

/// Top-level configuration settings for the publisher.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub dispatch: DispatchSettings,
    pub filters: FilterSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

/// Broker connection settings.
///
/// TLS stores are PEM files; passwords are accepted but unused.
#[derive(Debug, Deserialize, Clone)]
pub struct MqttSettings {
    pub protocol: String,
    pub hostname: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub trust_store_path: Option<String>,
    pub trust_store_password: Option<String>,
    pub key_store_path: Option<String>,
    pub key_store_password: Option<String>,
    pub client_id: Option<String>,
    pub clean_session: bool,
    pub keep_alive_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL.to_string(),
            hostname: DEFAULT_HOSTNAME.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            trust_store_path: None,
            trust_store_password: None,
            key_store_path: None,
            key_store_password: None,
            client_id: None,
            clean_session: true,
            keep_alive_secs: 60,
            connect_timeout_secs: 30,
        }
    }
}

/// Where events go and with which delivery guarantee.
///
/// `topic` excludes `route_template` and `multicast_routes`; when both of the
/// latter are set the multicast routes win. Empty values count as unset.
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchSettings {
    pub topic: Option<String>,
    pub qos: String,
    pub route_template: Option<String>,
    pub multicast_routes: Option<Vec<String>>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            topic: None,
            qos: "AT_MOST_ONCE".to_string(),
            route_template: None,
            multicast_routes: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FilterSettings {
    pub include_event_types: Option<Vec<String>>,
    pub exclude_event_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: "devpub_db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Settings as loaded from files or environment, before defaults apply.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub mqtt: Option<PartialMqttSettings>,
    pub dispatch: Option<PartialDispatchSettings>,
    pub filters: Option<FilterSettings>,
    pub storage: Option<PartialStorageSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialMqttSettings {
    pub protocol: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub trust_store_path: Option<String>,
    pub trust_store_password: Option<String>,
    pub key_store_path: Option<String>,
    pub key_store_password: Option<String>,
    pub client_id: Option<String>,
    pub clean_session: Option<bool>,
    pub keep_alive_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialDispatchSettings {
    pub topic: Option<String>,
    pub qos: Option<String>,
    pub route_template: Option<String>,
    pub multicast_routes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialStorageSettings {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fills every missing value from `Settings::default()`.
    pub fn merge_defaults(self) -> Settings {
        let default = Settings::default();

        let mqtt = self.mqtt.unwrap_or_default();
        let dm = default.mqtt;
        let dispatch = self.dispatch.unwrap_or_default();
        let dd = default.dispatch;

        Settings {
            mqtt: MqttSettings {
                protocol: mqtt.protocol.unwrap_or(dm.protocol),
                hostname: mqtt.hostname.unwrap_or(dm.hostname),
                port: mqtt.port.unwrap_or(dm.port),
                username: mqtt.username.or(dm.username),
                password: mqtt.password.or(dm.password),
                trust_store_path: mqtt.trust_store_path.or(dm.trust_store_path),
                trust_store_password: mqtt.trust_store_password.or(dm.trust_store_password),
                key_store_path: mqtt.key_store_path.or(dm.key_store_path),
                key_store_password: mqtt.key_store_password.or(dm.key_store_password),
                client_id: mqtt.client_id.or(dm.client_id),
                clean_session: mqtt.clean_session.unwrap_or(dm.clean_session),
                keep_alive_secs: mqtt.keep_alive_secs.unwrap_or(dm.keep_alive_secs),
                connect_timeout_secs: mqtt.connect_timeout_secs.unwrap_or(dm.connect_timeout_secs),
            },
            dispatch: DispatchSettings {
                topic: non_empty(dispatch.topic).or(dd.topic),
                qos: dispatch.qos.unwrap_or(dd.qos),
                route_template: non_empty(dispatch.route_template).or(dd.route_template),
                multicast_routes: dispatch
                    .multicast_routes
                    .map(|routes| routes.into_iter().filter(|r| !r.is_empty()).collect::<Vec<_>>())
                    .filter(|routes| !routes.is_empty())
                    .or(dd.multicast_routes),
            },
            filters: self.filters.unwrap_or(default.filters),
            storage: StorageSettings {
                path: self
                    .storage
                    .and_then(|s| s.path)
                    .unwrap_or(default.storage.path),
            },
            logging: LoggingSettings {
                level: self
                    .logging
                    .and_then(|l| l.level)
                    .unwrap_or(default.logging.level),
            },
        }
    }
}

/// An empty strategy value (e.g. `DEVPUB_DISPATCH__TOPIC=`) counts as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
