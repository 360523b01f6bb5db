//! The `dispatcher` module is the outbound sink of the pipeline.
//!
//! [`DispatcherBuilder`] collects the destination strategy, QoS, broker
//! settings and collaborators; [`MqttEventDispatcher`] runs the start/stop
//! lifecycle and publishes each event that passes the filter chain.

pub mod builder;
pub mod engine;

pub use builder::DispatcherBuilder;
pub use engine::MqttEventDispatcher;
