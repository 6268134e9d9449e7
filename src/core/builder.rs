use std::sync::Arc;

use super::{config::SupervisorConfig, supervisor::Supervisor};
use crate::jobs::{HandlerRef, JobHandler, JobSource, RandomJobSource, SimulatedHandler};

/// Builder for constructing a [`Supervisor`] with custom collaborators.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    source: Option<Arc<dyn JobSource>>,
    handler: Option<HandlerRef>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            source: None,
            handler: None,
        }
    }

    /// Sets the job source (default: [`RandomJobSource`] seeded from the OS).
    pub fn with_source(mut self, source: impl JobSource) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Sets the job handler (default: [`SimulatedHandler`]).
    ///
    /// Accepts a [`HandlerRef`](crate::HandlerRef) as well as any concrete handler.
    pub fn with_handler(mut self, handler: impl JobHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Builds the supervisor. Nothing runs until [`Supervisor::start`].
    pub fn build(self) -> Arc<Supervisor> {
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(RandomJobSource::new(&self.cfg)) as Arc<dyn JobSource>);
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(SimulatedHandler::new(&self.cfg)) as HandlerRef);
        Arc::new(Supervisor::new_internal(self.cfg, source, handler))
    }
}
