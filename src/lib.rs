//! # devpub
//!
//! `devpub` is the outbound leg of an IoT device-event pipeline. It takes
//! events produced by devices, drops the ones its filters reject, looks up the
//! device behind each remaining event and publishes the event to one or more
//! MQTT topics with a configurable delivery guarantee.
//!
//! ## Core Modules
//!
//! - `event`: device events, devices, assignments and event marshaling.
//! - `filter`: the per-kind filter chain in front of the dispatcher.
//! - `routing`: static topic, route builder and multicaster destination strategies.
//! - `mqtt`: QoS levels, broker settings and the broker connection manager.
//! - `lifecycle`: ordered start/stop of nested components.
//! - `dispatcher`: the outbound sink tying everything together.
//! - `persistence`: read-only device and assignment lookups (sled or in memory).
//! - `config`: layered settings from files and the environment.
//! - `utils`: error types and logging setup.

pub mod config;
pub mod dispatcher;
pub mod event;
pub mod filter;
pub mod lifecycle;
pub mod mqtt;
pub mod persistence;
pub mod routing;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use dispatcher::{DispatcherBuilder, MqttEventDispatcher};
pub use event::{DeviceEvent, EventKind, EventPayload};
pub use filter::FilterOutcome;
pub use mqtt::QosLevel;
