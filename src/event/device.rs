use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A registered device, keyed by its hardware id.
///
/// Read-only from the publisher's point of view; it is loaded from storage for
/// every dispatched event and handed to the route resolvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub hardware_id: String,
    pub specification_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Device {
    pub fn new(hardware_id: &str, specification_token: &str) -> Self {
        Self {
            hardware_id: hardware_id.to_string(),
            specification_token: specification_token.to_string(),
            site_token: None,
            assignment_token: None,
            comments: None,
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssignmentStatus {
    #[default]
    Active,
    Missing,
    Released,
}

/// Links the events of an assignment token to the device that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAssignment {
    pub token: String,
    pub device_hardware_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_token: Option<String>,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DeviceAssignment {
    pub fn new(token: &str, device_hardware_id: &str) -> Self {
        Self {
            token: token.to_string(),
            device_hardware_id: device_hardware_id.to_string(),
            site_token: None,
            status: AssignmentStatus::Active,
            metadata: BTreeMap::new(),
        }
    }
}
