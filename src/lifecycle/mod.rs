//! Ordered start/stop of the publisher's nested components.
//!
//! Components are started in the order they were pushed. A failed start stops
//! the components that already came up and reports the failure. Stop visits
//! every component in the same order and never aborts: each failure is logged
//! and collected as a [`ShutdownError`].

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::utils::error::{LifecycleError, ShutdownError};

/// A component with start/stop hooks. Both hooks default to no-ops.
pub trait LifecycleComponent: Send + Sync {
    fn component_name(&self) -> &str;

    fn start(&self) -> Result<(), LifecycleError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        Ok(())
    }
}

/// Adapts a shared resolver (or any other `LifecycleComponent` trait object) so
/// it can sit in a [`Lifecycle`] list.
pub struct NestedComponent<T: ?Sized>(pub Arc<T>);

impl<T> LifecycleComponent for NestedComponent<T>
where
    T: LifecycleComponent + ?Sized,
{
    fn component_name(&self) -> &str {
        self.0.component_name()
    }

    fn start(&self) -> Result<(), LifecycleError> {
        self.0.start()
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.0.stop()
    }
}

#[derive(Default)]
pub struct Lifecycle {
    components: Vec<Arc<dyn LifecycleComponent>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, component: Arc<dyn LifecycleComponent>) {
        self.components.push(component);
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn start_all(&self) -> Result<(), LifecycleError> {
        for (index, component) in self.components.iter().enumerate() {
            debug!(component = component.component_name(), "starting component");
            if let Err(err) = component.start() {
                error!(
                    component = component.component_name(),
                    error = %err,
                    "component failed to start"
                );
                // roll back what already came up, newest first
                for started in self.components[..index].iter().rev() {
                    if let Err(stop_err) = started.stop() {
                        error!(
                            component = started.component_name(),
                            error = %stop_err,
                            "rollback stop failed"
                        );
                    }
                }
                return Err(LifecycleError::Start {
                    component: component.component_name().to_string(),
                    source: Box::new(err),
                });
            }
        }
        info!(components = self.components.len(), "lifecycle started");
        Ok(())
    }

    pub fn stop_all(&self) -> Vec<ShutdownError> {
        let mut failures = Vec::new();
        for component in &self.components {
            debug!(component = component.component_name(), "stopping component");
            if let Err(err) = component.stop() {
                error!(
                    component = component.component_name(),
                    error = %err,
                    "error stopping component"
                );
                failures.push(ShutdownError {
                    component: component.component_name().to_string(),
                    source: err,
                });
            }
        }
        failures
    }
}
