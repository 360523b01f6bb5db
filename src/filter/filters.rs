use std::collections::HashSet;

use crate::event::{DeviceEvent, EventKind};
use crate::filter::EventFilter;

/// Whether a filter's set lists what passes or what is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

impl FilterMode {
    fn drops(self, matched: bool) -> bool {
        match self {
            FilterMode::Include => !matched,
            FilterMode::Exclude => matched,
        }
    }
}

/// Filters on the event subtype.
#[derive(Debug, Clone)]
pub struct EventTypeFilter {
    kinds: HashSet<EventKind>,
    mode: FilterMode,
}

impl EventTypeFilter {
    pub fn include(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            mode: FilterMode::Include,
        }
    }

    pub fn exclude(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            mode: FilterMode::Exclude,
        }
    }
}

impl EventFilter for EventTypeFilter {
    fn name(&self) -> &str {
        "event-type"
    }

    fn is_filtered(&self, event: &DeviceEvent) -> bool {
        self.mode.drops(self.kinds.contains(&event.kind()))
    }
}

/// Filters on the assignment token the event was reported against.
#[derive(Debug, Clone)]
pub struct AssignmentFilter {
    tokens: HashSet<String>,
    mode: FilterMode,
}

impl AssignmentFilter {
    pub fn new<S: Into<String>>(tokens: impl IntoIterator<Item = S>, mode: FilterMode) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            mode,
        }
    }
}

impl EventFilter for AssignmentFilter {
    fn name(&self) -> &str {
        "assignment"
    }

    fn is_filtered(&self, event: &DeviceEvent) -> bool {
        self.mode
            .drops(self.tokens.contains(&event.device_assignment_token))
    }
}

/// Drops events for which the closure returns `true`.
pub struct PredicateFilter<F> {
    name: String,
    predicate: F,
}

impl<F> PredicateFilter<F>
where
    F: Fn(&DeviceEvent) -> bool + Send + Sync,
{
    pub fn new(name: &str, predicate: F) -> Self {
        Self {
            name: name.to_string(),
            predicate,
        }
    }
}

impl<F> EventFilter for PredicateFilter<F>
where
    F: Fn(&DeviceEvent) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_filtered(&self, event: &DeviceEvent) -> bool {
        (self.predicate)(event)
    }
}
