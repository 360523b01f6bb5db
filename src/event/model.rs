//! Device event definitions
//!
//! `DeviceEvent` is the unit flowing through the publisher. The common fields
//! live on the struct and the subtype-specific part is the `EventPayload` tag.
//! Serialized form (JSON): camelCase fields with the payload flattened next to
//! them and discriminated by `eventType`, e.g.
//!
//! ```json
//! {"id":"...","deviceAssignmentToken":"A1","eventDate":"...","receivedDate":"...",
//!  "eventType":"Measurements","measurements":{"temp":21.5}}
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::ConfigurationError;

/// The subtype tag of a [`DeviceEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Measurements,
    Location,
    Alert,
    CommandInvocation,
    CommandResponse,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Measurements,
        EventKind::Location,
        EventKind::Alert,
        EventKind::CommandInvocation,
        EventKind::CommandResponse,
    ];

    /// Canonical lowercase name, used in configuration and route templates.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Measurements => "measurements",
            EventKind::Location => "location",
            EventKind::Alert => "alert",
            EventKind::CommandInvocation => "command_invocation",
            EventKind::CommandResponse => "command_response",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownEventType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    pub id: String,
    pub device_assignment_token: String,
    pub event_date: DateTime<Utc>,
    pub received_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl DeviceEvent {
    /// Creates an event for `assignment_token` with a fresh id, stamped now.
    pub fn new(assignment_token: &str, payload: EventPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            device_assignment_token: assignment_token.to_string(),
            event_date: now,
            received_date: now,
            metadata: BTreeMap::new(),
            payload,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_event_date(mut self, event_date: DateTime<Utc>) -> Self {
        self.event_date = event_date;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum EventPayload {
    Measurements(Measurements),
    Location(Location),
    Alert(Alert),
    CommandInvocation(CommandInvocation),
    CommandResponse(CommandResponse),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Measurements(_) => EventKind::Measurements,
            EventPayload::Location(_) => EventKind::Location,
            EventPayload::Alert(_) => EventKind::Alert,
            EventPayload::CommandInvocation(_) => EventKind::CommandInvocation,
            EventPayload::CommandResponse(_) => EventKind::CommandResponse,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub measurements: BTreeMap<String, f64>,
}

impl Measurements {
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.measurements.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSource {
    Device,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub source: AlertSource,
    pub level: AlertLevel,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandInitiator {
    Rest,
    Script,
    Scheduler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Pending,
    Sent,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInvocation {
    pub initiator: CommandInitiator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator_id: Option<String>,
    pub target_id: String,
    pub command_token: String,
    #[serde(default)]
    pub parameter_values: BTreeMap<String, String>,
    pub status: CommandStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub originating_event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}
