//! Topic templates
//!
//! A template such as `devices/{hardwareId}/events/{eventType}` is parsed once
//! at configuration time into literal and placeholder segments, then rendered
//! per event. Unknown placeholders and unbalanced braces are configuration
//! errors; a placeholder whose value is absent for a given event (for example
//! `{siteToken}` on a device without a site) is a routing error for that event.

use tracing::debug;

use crate::event::{Device, DeviceAssignment, DeviceEvent};
use crate::lifecycle::LifecycleComponent;
use crate::routing::{Multicaster, RouteBuilder};
use crate::utils::error::{ConfigurationError, RoutingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    HardwareId,
    AssignmentToken,
    EventType,
    EventId,
    SiteToken,
    SpecificationToken,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "hardwareId" => Some(Placeholder::HardwareId),
            "assignmentToken" => Some(Placeholder::AssignmentToken),
            "eventType" => Some(Placeholder::EventType),
            "eventId" => Some(Placeholder::EventId),
            "siteToken" => Some(Placeholder::SiteToken),
            "specificationToken" => Some(Placeholder::SpecificationToken),
            _ => None,
        }
    }

    fn value<'a>(
        &self,
        event: &'a DeviceEvent,
        device: &'a Device,
        assignment: &'a DeviceAssignment,
    ) -> Option<&'a str> {
        match self {
            Placeholder::HardwareId => Some(&device.hardware_id),
            Placeholder::AssignmentToken => Some(&assignment.token),
            Placeholder::EventType => Some(event.kind().as_str()),
            Placeholder::EventId => Some(&event.id),
            Placeholder::SiteToken => assignment
                .site_token
                .as_deref()
                .or(device.site_token.as_deref()),
            Placeholder::SpecificationToken => Some(&device.specification_token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value(Placeholder),
}

/// A parsed topic template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        if template.trim().is_empty() {
            return Err(invalid("template is empty"));
        }

        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find(['{', '}']) {
            if rest[open..].starts_with('}') {
                return Err(invalid("unmatched '}'"));
            }
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
            let name = &after[..close];
            if name.contains('{') {
                return Err(invalid("nested '{'"));
            }
            let placeholder = Placeholder::parse(name)
                .ok_or_else(|| invalid(&format!("unknown placeholder '{{{name}}}'")))?;
            segments.push(Segment::Value(placeholder));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(
        &self,
        event: &DeviceEvent,
        device: &Device,
        assignment: &DeviceAssignment,
    ) -> Result<String, RoutingError> {
        let mut topic = String::with_capacity(self.source.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => topic.push_str(text),
                Segment::Value(placeholder) => {
                    let value = placeholder.value(event, device, assignment).ok_or_else(|| {
                        RoutingError(format!(
                            "template '{}' needs {:?} which is not set for assignment '{}'",
                            self.source, placeholder, assignment.token
                        ))
                    })?;
                    topic.push_str(value);
                }
            }
        }
        Ok(topic)
    }
}

/// Builds one topic per event from a single template.
#[derive(Debug, Clone)]
pub struct TemplateRouteBuilder {
    template: RouteTemplate,
}

impl TemplateRouteBuilder {
    pub fn new(template: &str) -> Result<Self, ConfigurationError> {
        Ok(Self {
            template: RouteTemplate::parse(template)?,
        })
    }
}

impl LifecycleComponent for TemplateRouteBuilder {
    fn component_name(&self) -> &str {
        "template-route-builder"
    }
}

impl RouteBuilder for TemplateRouteBuilder {
    fn build(
        &self,
        event: &DeviceEvent,
        device: &Device,
        assignment: &DeviceAssignment,
    ) -> Result<String, RoutingError> {
        self.template.render(event, device, assignment)
    }
}

/// Renders every configured template, in configuration order.
#[derive(Debug, Clone)]
pub struct TemplateMulticaster {
    templates: Vec<RouteTemplate>,
}

impl TemplateMulticaster {
    pub fn new<S: AsRef<str>>(templates: &[S]) -> Result<Self, ConfigurationError> {
        let templates = templates
            .iter()
            .map(|t| RouteTemplate::parse(t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { templates })
    }
}

impl LifecycleComponent for TemplateMulticaster {
    fn component_name(&self) -> &str {
        "template-multicaster"
    }
}

impl Multicaster for TemplateMulticaster {
    fn calculate_routes(
        &self,
        event: &DeviceEvent,
        device: &Device,
        assignment: &DeviceAssignment,
    ) -> Result<Vec<String>, RoutingError> {
        let routes = self
            .templates
            .iter()
            .map(|t| t.render(event, device, assignment))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(event_id = %event.id, routes = routes.len(), "multicast routes calculated");
        Ok(routes)
    }
}
