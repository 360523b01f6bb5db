//! The `filter` module decides, per event, whether it reaches the dispatcher.
//!
//! A [`FilterChain`] holds chain-wide filters plus one slot of filters per
//! [`EventKind`]. `process` evaluates the filters that apply to the event's kind
//! and, if none of them drops it, calls the handler registered for that kind on
//! an [`OutboundEventHandler`]. Dropping an event is a normal outcome, not an
//! error.

pub mod filters;

pub use filters::{AssignmentFilter, EventTypeFilter, FilterMode, PredicateFilter};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::event::{DeviceEvent, EventKind};
use crate::utils::error::DispatchError;

/// Decides whether an event should be dropped.
pub trait EventFilter: Send + Sync {
    fn name(&self) -> &str;

    /// `true` drops the event.
    fn is_filtered(&self, event: &DeviceEvent) -> bool;
}

/// One callback per event subtype, invoked for events that passed the filters.
pub trait OutboundEventHandler {
    fn on_measurements_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError>;

    fn on_location_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError>;

    fn on_alert_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError>;

    fn on_command_invocation_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError>;

    fn on_command_response_not_filtered(&self, event: &DeviceEvent) -> Result<(), DispatchError>;
}

fn handler_slot<H: OutboundEventHandler + ?Sized>(
    kind: EventKind,
) -> fn(&H, &DeviceEvent) -> Result<(), DispatchError> {
    match kind {
        EventKind::Measurements => H::on_measurements_not_filtered,
        EventKind::Location => H::on_location_not_filtered,
        EventKind::Alert => H::on_alert_not_filtered,
        EventKind::CommandInvocation => H::on_command_invocation_not_filtered,
        EventKind::CommandResponse => H::on_command_response_not_filtered,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Dispatched,
    Filtered,
}

#[derive(Clone, Default)]
pub struct FilterChain {
    global: Vec<Arc<dyn EventFilter>>,
    per_kind: HashMap<EventKind, Vec<Arc<dyn EventFilter>>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter evaluated for every event kind.
    pub fn add_filter(&mut self, filter: Arc<dyn EventFilter>) {
        self.global.push(filter);
    }

    /// Adds a filter evaluated only for events of `kind`.
    pub fn add_filter_for(&mut self, kind: EventKind, filter: Arc<dyn EventFilter>) {
        self.per_kind.entry(kind).or_default().push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.per_kind.values().all(Vec::is_empty)
    }

    pub fn should_process(&self, event: &DeviceEvent) -> bool {
        let kind_filters = self
            .per_kind
            .get(&event.kind())
            .map(Vec::as_slice)
            .unwrap_or_default();

        match self
            .global
            .iter()
            .chain(kind_filters)
            .find(|filter| filter.is_filtered(event))
        {
            Some(filter) => {
                debug!(
                    event_id = %event.id,
                    kind = %event.kind(),
                    filter = filter.name(),
                    "event filtered"
                );
                false
            }
            None => true,
        }
    }

    /// Filters `event` and hands it to the matching handler when it passes.
    pub fn process<H: OutboundEventHandler + ?Sized>(
        &self,
        handler: &H,
        event: &DeviceEvent,
    ) -> Result<FilterOutcome, DispatchError> {
        if !self.should_process(event) {
            return Ok(FilterOutcome::Filtered);
        }
        handler_slot::<H>(event.kind())(handler, event)?;
        Ok(FilterOutcome::Dispatched)
    }
}
