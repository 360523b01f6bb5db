use std::sync::{Arc, RwLock};

use crate::config::Settings;
use crate::dispatcher::MqttEventDispatcher;
use crate::event::{EventKind, EventMarshaler, JsonMarshaler};
use crate::filter::{EventFilter, EventTypeFilter, FilterChain};
use crate::lifecycle::Lifecycle;
use crate::mqtt::{BrokerConnectionConfig, MqttConnection, MqttTransport, QosLevel, RumqttTransport};
use crate::mqtt::config::{DEFAULT_HOSTNAME, DEFAULT_PORT};
use crate::persistence::DeviceStore;
use crate::routing::{
    DestinationConfig, Multicaster, RouteBuilder, TemplateMulticaster, TemplateRouteBuilder,
};
use crate::utils::error::ConfigurationError;

/// Assembles an [`MqttEventDispatcher`].
///
/// Destination strategies are only collected here; whether exactly one was
/// configured is checked when the dispatcher starts.
pub struct DispatcherBuilder {
    destinations: DestinationConfig,
    qos: QosLevel,
    connection: Option<BrokerConnectionConfig>,
    transport: Option<Arc<dyn MqttTransport>>,
    store: Option<Arc<dyn DeviceStore>>,
    marshaler: Arc<dyn EventMarshaler>,
    filters: FilterChain,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            destinations: DestinationConfig::default(),
            qos: QosLevel::default(),
            connection: None,
            transport: None,
            store: None,
            marshaler: Arc::new(JsonMarshaler),
            filters: FilterChain::new(),
        }
    }
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded from settings. The device store still has to be set.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        let dispatch = &settings.dispatch;
        let mut builder = Self::new()
            .qos(&dispatch.qos)?
            .connection(BrokerConnectionConfig::from_settings(&settings.mqtt)?);

        if let Some(topic) = &dispatch.topic {
            builder = builder.topic(topic);
        }
        if let Some(template) = &dispatch.route_template {
            builder = builder.route_builder(Arc::new(TemplateRouteBuilder::new(template)?));
        }
        if let Some(routes) = &dispatch.multicast_routes {
            builder = builder.multicaster(Arc::new(TemplateMulticaster::new(routes)?));
        }

        let filters = &settings.filters;
        if let Some(kinds) = &filters.include_event_types {
            builder = builder.filter(Arc::new(EventTypeFilter::include(parse_kinds(kinds)?)));
        }
        if let Some(kinds) = &filters.exclude_event_types {
            builder = builder.filter(Arc::new(EventTypeFilter::exclude(parse_kinds(kinds)?)));
        }
        Ok(builder)
    }

    pub fn topic(mut self, topic: &str) -> Self {
        self.destinations.topic = Some(topic.to_string());
        self
    }

    pub fn route_builder(mut self, builder: Arc<dyn RouteBuilder>) -> Self {
        self.destinations.route_builder = Some(builder);
        self
    }

    pub fn multicaster(mut self, multicaster: Arc<dyn Multicaster>) -> Self {
        self.destinations.multicaster = Some(multicaster);
        self
    }

    /// Sets the QoS from its label; unknown labels are rejected here.
    pub fn qos(self, label: &str) -> Result<Self, ConfigurationError> {
        Ok(self.qos_level(QosLevel::from_label(label)?))
    }

    pub fn qos_level(mut self, qos: QosLevel) -> Self {
        self.qos = qos;
        self
    }

    pub fn connection(mut self, config: BrokerConnectionConfig) -> Self {
        self.connection = Some(config);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn MqttTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn store(mut self, store: Arc<dyn DeviceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn marshaler(mut self, marshaler: Arc<dyn EventMarshaler>) -> Self {
        self.marshaler = marshaler;
        self
    }

    pub fn filter(mut self, filter: Arc<dyn EventFilter>) -> Self {
        self.filters.add_filter(filter);
        self
    }

    pub fn filter_for(mut self, kind: EventKind, filter: Arc<dyn EventFilter>) -> Self {
        self.filters.add_filter_for(kind, filter);
        self
    }

    pub fn build(self) -> Result<MqttEventDispatcher, ConfigurationError> {
        let store = self.store.ok_or(ConfigurationError::Missing("device store"))?;
        let config = match self.connection {
            Some(config) => {
                config.validate()?;
                config
            }
            None => BrokerConnectionConfig::new(DEFAULT_HOSTNAME, DEFAULT_PORT),
        };
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(RumqttTransport::default()));
        let connection = Arc::new(MqttConnection::new(transport, config));

        // resolvers first, broker connection last
        let mut lifecycle = Lifecycle::new();
        for component in self.destinations.nested_components() {
            lifecycle.push(component);
        }
        lifecycle.push(connection.clone());

        Ok(MqttEventDispatcher {
            destinations: self.destinations,
            active: RwLock::new(None),
            qos: self.qos,
            connection,
            store,
            marshaler: self.marshaler,
            filters: self.filters,
            lifecycle,
        })
    }
}

fn parse_kinds(names: &[String]) -> Result<Vec<EventKind>, ConfigurationError> {
    names.iter().map(|name| name.parse()).collect()
}
