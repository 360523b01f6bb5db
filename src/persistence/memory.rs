use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::event::{Device, DeviceAssignment};
use crate::persistence::DeviceStore;
use crate::utils::error::StorageError;

/// Map-backed store for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryDeviceStore {
    assignments: RwLock<HashMap<String, DeviceAssignment>>,
    devices: RwLock<HashMap<String, Device>>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_device(&self, device: Device) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device.hardware_id.clone(), device);
    }

    pub fn insert_assignment(&self, assignment: DeviceAssignment) {
        self.assignments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(assignment.token.clone(), assignment);
    }
}

impl DeviceStore for InMemoryDeviceStore {
    fn get_device_assignment_by_token(&self, token: &str) -> Result<DeviceAssignment, StorageError> {
        self.assignments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or_else(|| StorageError::AssignmentNotFound(token.to_string()))
    }

    fn get_device_by_hardware_id(&self, hardware_id: &str) -> Result<Device, StorageError> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(hardware_id)
            .cloned()
            .ok_or_else(|| StorageError::DeviceNotFound(hardware_id.to_string()))
    }
}
