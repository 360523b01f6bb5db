//! The `event` module defines the data flowing through the publisher: device
//! events and their subtypes, the devices and assignments they belong to, and
//! the marshaling of an event into a broker payload.

pub mod device;
pub mod marshal;
pub mod model;

pub use device::{AssignmentStatus, Device, DeviceAssignment};
pub use marshal::{EventMarshaler, JsonMarshaler};
pub use model::{DeviceEvent, EventKind, EventPayload};
