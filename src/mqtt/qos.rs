use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::error::ConfigurationError;

/// MQTT delivery guarantee. Defaults to at-most-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QosLevel {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QosLevel {
    /// Maps a configuration label to a level. Only the three canonical labels
    /// are recognized.
    pub fn from_label(label: &str) -> Result<Self, ConfigurationError> {
        match label {
            "AT_MOST_ONCE" => Ok(QosLevel::AtMostOnce),
            "AT_LEAST_ONCE" => Ok(QosLevel::AtLeastOnce),
            "EXACTLY_ONCE" => Ok(QosLevel::ExactlyOnce),
            other => Err(ConfigurationError::UnknownQos(other.to_string())),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QosLevel::AtMostOnce => "AT_MOST_ONCE",
            QosLevel::AtLeastOnce => "AT_LEAST_ONCE",
            QosLevel::ExactlyOnce => "EXACTLY_ONCE",
        }
    }

    /// Numeric level carried on the wire.
    pub fn level(self) -> u8 {
        match self {
            QosLevel::AtMostOnce => 0,
            QosLevel::AtLeastOnce => 1,
            QosLevel::ExactlyOnce => 2,
        }
    }
}

impl FromStr for QosLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QosLevel::from_label(s)
    }
}

impl fmt::Display for QosLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.level())
    }
}

impl From<QosLevel> for rumqttc::QoS {
    fn from(qos: QosLevel) -> Self {
        match qos {
            QosLevel::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QosLevel::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QosLevel::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}
