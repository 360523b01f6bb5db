//! The `error` module defines the error types used across `devpub`.
//!
//! Errors are grouped by the stage that raises them: configuration (fatal, raised
//! before or during start), storage and routing (per event), transport (per
//! publish), and lifecycle (start/stop of nested components). `DispatchError` is the
//! per-event error surfaced to callers of the dispatcher.

use std::time::Duration;

use thiserror::Error;

/// Fatal configuration problems, raised at configuration or start time.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no topic specified and no multicaster or route builder configured")]
    NoDestination,

    #[error("a static topic cannot be combined with a route resolver, found: {}", .0.join(", "))]
    ConflictingDestinations(Vec<&'static str>),

    #[error("unrecognized QoS label '{0}'")]
    UnknownQos(String),

    #[error("unsupported protocol scheme '{0}'")]
    UnsupportedProtocol(String),

    #[error("TLS connections require a trust store")]
    MissingTrustStore,

    #[error("unable to read TLS material from {path}: {source}")]
    TlsMaterial {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("keep-alive must be at least 5 seconds, got {0:?}")]
    KeepAlive(Duration),

    #[error("invalid route template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("connection settings cannot change while the connection is {0}")]
    ConnectionActive(String),

    #[error("no {0} configured")]
    Missing(&'static str),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Failures of the device/assignment storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("device assignment '{0}' not found")]
    AssignmentNotFound(String),

    #[error("device '{0}' not found")]
    DeviceNotFound(String),

    #[error("storage failure: {0}")]
    Sled(#[from] sled::Error),

    #[error("stored record could not be decoded: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failures reported by the broker transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The message could not be queued for delivery.
    #[error("message could not be persisted for delivery: {0}")]
    Persistence(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("not connected to the broker")]
    NotConnected,

    #[error("no acknowledgement from the broker within {0:?}")]
    ConnectTimeout(Duration),

    #[error(transparent)]
    Client(#[from] rumqttc::ClientError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// A resolver could not compute a destination for an event.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RoutingError(pub String);

/// An event could not be serialized.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-event failures surfaced by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unable to resolve device for event {event_id}: {source}")]
    Resolution {
        event_id: String,
        #[source]
        source: StorageError,
    },

    #[error("unable to compute route for event {event_id}: {source}")]
    Routing {
        event_id: String,
        #[source]
        source: RoutingError,
    },

    #[error("unable to serialize event {event_id}: {source}")]
    Marshal {
        event_id: String,
        #[source]
        source: MarshalError,
    },

    #[error("unable to publish event {event_id} to '{topic}': {source}")]
    Publish {
        event_id: String,
        topic: String,
        #[source]
        source: TransportError,
    },

    #[error("{} of {attempted} publishes failed for event {event_id}", .failures.len())]
    Multicast {
        event_id: String,
        attempted: usize,
        failures: Vec<DispatchError>,
    },

    #[error("dispatcher is not started")]
    NotStarted,
}

/// Failures while starting or stopping lifecycle components.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("component '{component}' failed to start: {source}")]
    Start {
        component: String,
        #[source]
        source: Box<LifecycleError>,
    },

    #[error("{0}")]
    Component(String),
}

/// A non-fatal failure recorded while stopping a component.
#[derive(Debug, Error)]
#[error("failed to stop '{component}': {source}")]
pub struct ShutdownError {
    pub component: String,
    #[source]
    pub source: LifecycleError,
}
