use serde::Serialize;
use serde::de::DeserializeOwned;
use sled::{Db, Tree};

use crate::event::{Device, DeviceAssignment};
use crate::persistence::DeviceStore;
use crate::utils::error::StorageError;

const ASSIGNMENTS_TREE: &str = "assignments";
const DEVICES_TREE: &str = "devices";

/// Device and assignment records kept in an embedded `sled` database.
///
/// Records are stored as JSON, one tree per record type, keyed by assignment
/// token and hardware id respectively. The dispatcher only reads; the `put_*`
/// methods exist for provisioning.
#[derive(Clone)]
pub struct SledDeviceStore {
    db: Db,
    assignments: Tree,
    devices: Tree,
}

impl SledDeviceStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let assignments = db.open_tree(ASSIGNMENTS_TREE)?;
        let devices = db.open_tree(DEVICES_TREE)?;
        Ok(Self {
            db,
            assignments,
            devices,
        })
    }

    pub fn put_device(&self, device: &Device) -> Result<(), StorageError> {
        put(&self.devices, &device.hardware_id, device)
    }

    pub fn put_assignment(&self, assignment: &DeviceAssignment) -> Result<(), StorageError> {
        put(&self.assignments, &assignment.token, assignment)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

fn put<T: Serialize>(tree: &Tree, key: &str, record: &T) -> Result<(), StorageError> {
    let serialized = serde_json::to_vec(record)?;
    tree.insert(key.as_bytes(), serialized)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &Tree, key: &str) -> Result<Option<T>, StorageError> {
    match tree.get(key.as_bytes())? {
        Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        None => Ok(None),
    }
}

impl DeviceStore for SledDeviceStore {
    fn get_device_assignment_by_token(&self, token: &str) -> Result<DeviceAssignment, StorageError> {
        get(&self.assignments, token)?
            .ok_or_else(|| StorageError::AssignmentNotFound(token.to_string()))
    }

    fn get_device_by_hardware_id(&self, hardware_id: &str) -> Result<Device, StorageError> {
        get(&self.devices, hardware_id)?
            .ok_or_else(|| StorageError::DeviceNotFound(hardware_id.to_string()))
    }
}

impl std::fmt::Debug for SledDeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledDeviceStore")
            .field("db", &"sled::Db")
            .field("assignments", &self.assignments.len())
            .field("devices", &self.devices.len())
            .finish()
    }
}
