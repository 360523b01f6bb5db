use crate::mqtt::config::BrokerConnectionConfig;
use crate::mqtt::qos::QosLevel;
use crate::utils::error::TransportError;

/// Opens sessions with a broker.
pub trait MqttTransport: Send + Sync {
    fn connect(&self, config: &BrokerConnectionConfig)
    -> Result<Box<dyn MqttSession>, TransportError>;
}

/// A live broker session. `publish` may be called from many threads at once.
pub trait MqttSession: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QosLevel,
        retain: bool,
    ) -> Result<(), TransportError>;

    fn disconnect(&self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}
