//! The `mqtt` module holds everything that talks to the broker.
//!
//! - `qos`: delivery guarantee labels and their wire levels.
//! - `config`: the validated broker connection configuration.
//! - `transport`: the session seam the connection manager drives.
//! - `connection`: the connection state machine shared by publishers.
//! - `rumqtt`: the production transport on top of `rumqttc`.

pub mod config;
pub mod connection;
pub mod qos;
pub mod rumqtt;
pub mod transport;

pub use config::{BrokerConnectionConfig, Credentials, Protocol, StoreMaterial, TlsMaterial};
pub use connection::{ConnectionState, MqttConnection};
pub use qos::QosLevel;
pub use rumqtt::RumqttTransport;
pub use transport::{MqttSession, MqttTransport};

#[cfg(test)]
mod tests;
