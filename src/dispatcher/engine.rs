use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info};

use crate::event::{DeviceEvent, EventMarshaler};
use crate::filter::{FilterChain, FilterOutcome, OutboundEventHandler};
use crate::lifecycle::Lifecycle;
use crate::mqtt::{BrokerConnectionConfig, MqttConnection, QosLevel};
use crate::persistence::DeviceStore;
use crate::routing::{Destination, DestinationConfig};
use crate::utils::error::{ConfigurationError, DispatchError, LifecycleError, ShutdownError};

/// Publishes device events to an MQTT broker.
///
/// Each event that passes the filter chain is resolved against the device
/// store, routed through the destination strategy fixed at [`start`], marshaled
/// once and published to every resulting topic with the configured QoS. All
/// work happens on the calling thread; any number of threads may dispatch at
/// once.
///
/// [`start`]: MqttEventDispatcher::start
pub struct MqttEventDispatcher {
    pub(crate) destinations: DestinationConfig,
    pub(crate) active: RwLock<Option<Destination>>,
    pub(crate) qos: QosLevel,
    pub(crate) connection: Arc<MqttConnection>,
    pub(crate) store: Arc<dyn DeviceStore>,
    pub(crate) marshaler: Arc<dyn EventMarshaler>,
    pub(crate) filters: FilterChain,
    pub(crate) lifecycle: Lifecycle,
}

impl MqttEventDispatcher {
    /// Fixes the destination strategy, starts the configured resolvers and
    /// connects to the broker.
    ///
    /// Fails with a configuration error when zero or several strategies are
    /// configured. When a component fails to start, the ones already started
    /// are stopped again.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            debug!("dispatcher already started");
            return Ok(());
        }

        let destination = self.destinations.resolve()?;
        self.lifecycle.start_all()?;

        info!(
            strategy = destination.strategy(),
            qos = %self.qos,
            "MQTT event dispatcher started."
        );
        *active = Some(destination);
        Ok(())
    }

    /// Stops the resolvers and disconnects, in that order.
    ///
    /// Every step is attempted. Failures are logged and returned, never
    /// raised, and the connection always ends up unconnected.
    pub fn stop(&self) -> Vec<ShutdownError> {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = None;
        let failures = self.lifecycle.stop_all();
        info!(failures = failures.len(), "MQTT event dispatcher stopped.");
        failures
    }

    pub fn is_started(&self) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn qos(&self) -> QosLevel {
        self.qos
    }

    pub fn connection(&self) -> &Arc<MqttConnection> {
        &self.connection
    }

    /// Replaces the broker settings. The dispatcher must be stopped first.
    pub fn reconfigure_connection(
        &self,
        config: BrokerConnectionConfig,
    ) -> Result<(), ConfigurationError> {
        self.connection.reconfigure(config)
    }

    /// Runs `event` through the filter chain and dispatches it when it passes.
    pub fn process(&self, event: &DeviceEvent) -> Result<FilterOutcome, DispatchError> {
        if !self.is_started() {
            return Err(DispatchError::NotStarted);
        }
        self.filters.process(self, event)
    }

    fn active_destination(&self) -> Result<Destination, DispatchError> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DispatchError::NotStarted)
    }

    fn send_event(&self, event: &DeviceEvent) -> Result<(), DispatchError> {
        let destination = self.active_destination()?;

        let resolution = |source| DispatchError::Resolution {
            event_id: event.id.clone(),
            source,
        };
        let assignment = self
            .store
            .get_device_assignment_by_token(&event.device_assignment_token)
            .map_err(resolution)?;
        let device = self
            .store
            .get_device_by_hardware_id(&assignment.device_hardware_id)
            .map_err(resolution)?;

        let routes = destination
            .resolve(event, &device, &assignment)
            .map_err(|source| DispatchError::Routing {
                event_id: event.id.clone(),
                source,
            })?;
        if routes.is_empty() {
            debug!(event_id = %event.id, "no routes for event");
            return Ok(());
        }

        let payload = self
            .marshaler
            .marshal(event)
            .map_err(|source| DispatchError::Marshal {
                event_id: event.id.clone(),
                source,
            })?;

        let mut failures = Vec::new();
        for topic in &routes {
            match self.connection.publish(topic, &payload, self.qos, false) {
                Ok(()) => info!(
                    event_id = %event.id,
                    topic = %topic,
                    qos = self.qos.level(),
                    "Published event to MQTT."
                ),
                Err(source) => {
                    error!(event_id = %event.id, topic = %topic, error = %source, "publish failed");
                    failures.push(DispatchError::Publish {
                        event_id: event.id.clone(),
                        topic: topic.clone(),
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        if !destination.is_multicast() && failures.len() == 1 {
            return Err(failures.remove(0));
        }
        Err(DispatchError::Multicast {
            event_id: event.id.clone(),
            attempted: routes.len(),
            failures,
        })
    }
}

impl OutboundEventHandler for MqttEventDispatcher {
    fn on_measurements_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError> {
        self.send_event(event)
    }

    fn on_location_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError> {
        self.send_event(event)
    }

    fn on_alert_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError> {
        self.send_event(event)
    }

    fn on_command_invocation_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError> {
        self.send_event(event)
    }

    fn on_command_response_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError> {
        self.send_event(event)
    }
}

impl fmt::Debug for MqttEventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MqttEventDispatcher")
            .field("destination", &*active)
            .field("qos", &self.qos)
            .field("connection", &self.connection)
            .field("components", &self.lifecycle.len())
            .finish()
    }
}
