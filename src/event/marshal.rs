use crate::event::model::DeviceEvent;
use crate::utils::error::MarshalError;

/// Turns an event into the bytes published on the broker.
pub trait EventMarshaler: Send + Sync {
    fn marshal(&self, event: &DeviceEvent) -> Result<Vec<u8>, MarshalError>;
}

/// JSON encoding through serde; the receiving side parses the `eventType` tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMarshaler;

impl EventMarshaler for JsonMarshaler {
    fn marshal(&self, event: &DeviceEvent) -> Result<Vec<u8>, MarshalError> {
        Ok(serde_json::to_vec(event)?)
    }
}
