use super::{DeviceStore, InMemoryDeviceStore, SledDeviceStore};
use crate::event::{AssignmentStatus, Device, DeviceAssignment};
use crate::utils::error::StorageError;

use tempfile::{TempDir, tempdir};

fn create_test_store() -> (TempDir, SledDeviceStore) {
    let dir = tempdir().unwrap();
    let store = SledDeviceStore::open(dir.path().to_str().unwrap()).unwrap();
    (dir, store)
}

fn sample_device() -> Device {
    let mut device = Device::new("D1", "spec-tracker");
    device.site_token = Some("site-1".to_string());
    device.assignment_token = Some("A1".to_string());
    device
}

#[test]
fn test_store_and_load_assignment_and_device() {
    let (_dir, store) = create_test_store();
    store.put_device(&sample_device()).unwrap();
    store.put_assignment(&DeviceAssignment::new("A1", "D1")).unwrap();

    let assignment = store.get_device_assignment_by_token("A1").unwrap();
    assert_eq!(assignment.device_hardware_id, "D1");
    assert_eq!(assignment.status, AssignmentStatus::Active);

    let device = store.get_device_by_hardware_id(&assignment.device_hardware_id).unwrap();
    assert_eq!(device, sample_device());
}

#[test]
fn test_missing_records_are_not_found() {
    let (_dir, store) = create_test_store();

    let err = store.get_device_assignment_by_token("nope").unwrap_err();
    assert!(matches!(err, StorageError::AssignmentNotFound(token) if token == "nope"));

    let err = store.get_device_by_hardware_id("nope").unwrap_err();
    assert!(matches!(err, StorageError::DeviceNotFound(id) if id == "nope"));
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().to_str().unwrap().to_string();

    {
        let store = SledDeviceStore::open(&path).unwrap();
        store.put_assignment(&DeviceAssignment::new("A7", "D7")).unwrap();
        store.flush().unwrap();
    }

    let reopened = SledDeviceStore::open(&path).unwrap();
    let assignment = reopened.get_device_assignment_by_token("A7").unwrap();
    assert_eq!(assignment.device_hardware_id, "D7");
}

#[test]
fn test_corrupt_record_is_reported() {
    let dir = tempdir().unwrap();
    let db = sled::open(dir.path()).unwrap();
    db.open_tree("devices")
        .unwrap()
        .insert("D9", b"not json".to_vec())
        .unwrap();

    let store = SledDeviceStore::from_db(db).unwrap();
    let err = store.get_device_by_hardware_id("D9").unwrap_err();
    assert!(matches!(err, StorageError::Corrupt(_)));
}

#[test]
fn test_in_memory_store_lookups() {
    let store = InMemoryDeviceStore::new();
    store.insert_device(sample_device());
    store.insert_assignment(DeviceAssignment::new("A1", "D1"));

    assert_eq!(store.get_device_assignment_by_token("A1").unwrap().token, "A1");
    assert_eq!(store.get_device_by_hardware_id("D1").unwrap().hardware_id, "D1");
    assert!(store.get_device_by_hardware_id("D2").is_err());
}
