//! The `routing` module decides where an event is published.
//!
//! Three strategies exist: a fixed topic, a [`RouteBuilder`] computing one
//! topic per event, and a [`Multicaster`] computing any number of topics per
//! event. [`DestinationConfig`] collects what was configured; at start it is
//! validated into exactly one [`Destination`] variant, which the dispatcher
//! uses for every event until it is stopped.

pub mod template;

pub use template::{RouteTemplate, TemplateMulticaster, TemplateRouteBuilder};

use std::fmt;
use std::sync::Arc;

use crate::event::{Device, DeviceAssignment, DeviceEvent};
use crate::lifecycle::{LifecycleComponent, NestedComponent};
use crate::utils::error::{ConfigurationError, RoutingError};

/// Computes a single destination topic for an event.
pub trait RouteBuilder: LifecycleComponent {
    fn build(
        &self,
        event: &DeviceEvent,
        device: &Device,
        assignment: &DeviceAssignment,
    ) -> Result<String, RoutingError>;
}

/// Computes zero or more destination topics for an event.
pub trait Multicaster: LifecycleComponent {
    fn calculate_routes(
        &self,
        event: &DeviceEvent,
        device: &Device,
        assignment: &DeviceAssignment,
    ) -> Result<Vec<String>, RoutingError>;
}

/// The destination strategy in effect while the dispatcher runs.
#[derive(Clone)]
pub enum Destination {
    StaticTopic(String),
    RouteBuilder(Arc<dyn RouteBuilder>),
    Multicaster(Arc<dyn Multicaster>),
}

impl Destination {
    pub fn strategy(&self) -> &'static str {
        match self {
            Destination::StaticTopic(_) => "topic",
            Destination::RouteBuilder(_) => "route-builder",
            Destination::Multicaster(_) => "multicaster",
        }
    }

    pub fn is_multicast(&self) -> bool {
        matches!(self, Destination::Multicaster(_))
    }

    /// Topics for `event`, in the order they should be published to.
    pub fn resolve(
        &self,
        event: &DeviceEvent,
        device: &Device,
        assignment: &DeviceAssignment,
    ) -> Result<Vec<String>, RoutingError> {
        match self {
            Destination::StaticTopic(topic) => Ok(vec![topic.clone()]),
            Destination::RouteBuilder(builder) => {
                Ok(vec![builder.build(event, device, assignment)?])
            }
            Destination::Multicaster(multicaster) => {
                multicaster.calculate_routes(event, device, assignment)
            }
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::StaticTopic(topic) => f.debug_tuple("StaticTopic").field(topic).finish(),
            Destination::RouteBuilder(builder) => f
                .debug_tuple("RouteBuilder")
                .field(&builder.component_name())
                .finish(),
            Destination::Multicaster(multicaster) => f
                .debug_tuple("Multicaster")
                .field(&multicaster.component_name())
                .finish(),
        }
    }
}

/// Destination strategies as configured, before validation.
#[derive(Clone, Default)]
pub struct DestinationConfig {
    pub topic: Option<String>,
    pub route_builder: Option<Arc<dyn RouteBuilder>>,
    pub multicaster: Option<Arc<dyn Multicaster>>,
}

impl DestinationConfig {
    /// Picks the strategy used at dispatch: multicaster, then route builder,
    /// then the static topic. A topic is only valid on its own.
    pub fn resolve(&self) -> Result<Destination, ConfigurationError> {
        if self.topic.is_some() && (self.route_builder.is_some() || self.multicaster.is_some()) {
            let mut configured = vec!["topic"];
            if self.route_builder.is_some() {
                configured.push("route-builder");
            }
            if self.multicaster.is_some() {
                configured.push("multicaster");
            }
            return Err(ConfigurationError::ConflictingDestinations(configured));
        }

        if let Some(multicaster) = &self.multicaster {
            Ok(Destination::Multicaster(multicaster.clone()))
        } else if let Some(builder) = &self.route_builder {
            Ok(Destination::RouteBuilder(builder.clone()))
        } else if let Some(topic) = &self.topic {
            Ok(Destination::StaticTopic(topic.clone()))
        } else {
            Err(ConfigurationError::NoDestination)
        }
    }

    /// Configured resolvers as lifecycle components: multicaster, then route builder.
    pub fn nested_components(&self) -> Vec<Arc<dyn LifecycleComponent>> {
        let mut components: Vec<Arc<dyn LifecycleComponent>> = Vec::new();
        if let Some(multicaster) = &self.multicaster {
            components.push(Arc::new(NestedComponent(multicaster.clone())));
        }
        if let Some(builder) = &self.route_builder {
            components.push(Arc::new(NestedComponent(builder.clone())));
        }
        components
    }
}
