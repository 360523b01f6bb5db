//! Broker connection manager
//!
//! `MqttConnection` owns the session with the broker and its state machine:
//!
//! ```text
//! Unconnected -> Connecting -> Connected -> Disconnecting -> Unconnected
//! ```
//!
//! Publishes share a read lock on the session, so any number of threads may
//! publish at once. Connect and disconnect take the write lock and therefore
//! never overlap an in-flight publish. The configuration can only be replaced
//! while the connection is down.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::lifecycle::LifecycleComponent;
use crate::mqtt::config::BrokerConnectionConfig;
use crate::mqtt::qos::QosLevel;
use crate::mqtt::transport::{MqttSession, MqttTransport};
use crate::utils::error::{ConfigurationError, LifecycleError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Unconnected => "unconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

pub struct MqttConnection {
    transport: Arc<dyn MqttTransport>,
    config: RwLock<BrokerConnectionConfig>,
    state: Mutex<ConnectionState>,
    session: RwLock<Option<Box<dyn MqttSession>>>,
}

impl MqttConnection {
    pub fn new(transport: Arc<dyn MqttTransport>, config: BrokerConnectionConfig) -> Self {
        Self {
            transport,
            config: RwLock::new(config),
            state: Mutex::new(ConnectionState::Unconnected),
            session: RwLock::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn config(&self) -> BrokerConnectionConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the configuration. Only allowed while unconnected.
    pub fn reconfigure(&self, config: BrokerConnectionConfig) -> Result<(), ConfigurationError> {
        let session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let state = self.state();
        if state != ConnectionState::Unconnected || session.is_some() {
            return Err(ConfigurationError::ConnectionActive(state.to_string()));
        }
        config.validate()?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }

    pub fn connect(&self) -> Result<(), TransportError> {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = session.as_ref() {
            if existing.is_connected() {
                debug!("connect requested while already connected");
                return Ok(());
            }
            // stale session left by a dropped connection
            if let Err(err) = existing.disconnect() {
                warn!(error = %err, "closing stale MQTT session failed");
            }
            *session = None;
        }

        let config = self.config();
        self.set_state(ConnectionState::Connecting);
        match self.transport.connect(&config) {
            Ok(opened) => {
                *session = Some(opened);
                self.set_state(ConnectionState::Connected);
                info!(
                    broker = %config.broker_uri(),
                    client_id = %config.client_id,
                    clean_session = config.clean_session,
                    "Connected to MQTT broker."
                );
                Ok(())
            }
            Err(err) => {
                self.set_state(ConnectionState::Unconnected);
                warn!(broker = %config.broker_uri(), error = %err, "MQTT connect failed");
                Err(err)
            }
        }
    }

    pub fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QosLevel,
        retain: bool,
    ) -> Result<(), TransportError> {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        match session.as_ref() {
            Some(session) => session.publish(topic, payload, qos, retain),
            None => Err(TransportError::NotConnected),
        }
    }

    /// Closes the session if there is one. Always leaves the connection
    /// unconnected, even when the transport reports an error.
    pub fn disconnect(&self) -> Result<(), TransportError> {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = session.take() else {
            self.set_state(ConnectionState::Unconnected);
            return Ok(());
        };

        self.set_state(ConnectionState::Disconnecting);
        let result = if current.is_connected() {
            current.disconnect()
        } else {
            Ok(())
        };
        self.set_state(ConnectionState::Unconnected);
        info!("Disconnected from MQTT broker.");
        result
    }

    pub fn is_connected(&self) -> bool {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        self.state() == ConnectionState::Connected
            && session.as_ref().is_some_and(|s| s.is_connected())
    }
}

impl LifecycleComponent for MqttConnection {
    fn component_name(&self) -> &str {
        "mqtt-connection"
    }

    fn start(&self) -> Result<(), LifecycleError> {
        self.connect()?;
        Ok(())
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.disconnect()?;
        Ok(())
    }
}

impl fmt::Debug for MqttConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttConnection")
            .field("broker", &self.config().broker_uri())
            .field("state", &self.state())
            .finish()
    }
}
