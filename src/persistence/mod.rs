//! The `persistence` module provides read access to devices and assignments.
//!
//! The dispatcher looks up the assignment named by an event, then the device
//! that assignment points at. `SledDeviceStore` keeps records in an embedded
//! `sled` database; `InMemoryDeviceStore` is a map-backed equivalent.

pub mod memory;
pub mod sled_store;

pub use memory::InMemoryDeviceStore;
pub use sled_store::SledDeviceStore;

use crate::event::{Device, DeviceAssignment};
use crate::utils::error::StorageError;

/// Read-only lookups used to resolve the device behind an event.
pub trait DeviceStore: Send + Sync {
    fn get_device_assignment_by_token(&self, token: &str) -> Result<DeviceAssignment, StorageError>;

    fn get_device_by_hardware_id(&self, hardware_id: &str) -> Result<Device, StorageError>;
}

#[cfg(test)]
mod tests;
