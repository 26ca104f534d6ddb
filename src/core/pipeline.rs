use crate::core::contracts::{IPipelineStep, IRequestDelegate, StepError};
use crate::core::error_modular::ModularError;
use crate::core::provider::CapabilityProvider;
use crate::core::runtime::RequestContext;
use async_trait::async_trait;
use std::sync::Arc;

/// Ordered list of steps collected during the pipeline phase.
///
/// Steps run in the order they were appended. There is no positional insert.
pub struct PipelineBuilder {
    steps: Vec<Arc<dyn IPipelineStep>>,
    frozen: bool,
    capabilities: Arc<CapabilityProvider>,
}

impl PipelineBuilder {
    pub fn new(capabilities: Arc<CapabilityProvider>) -> Self {
        Self {
            steps: Vec::new(),
            frozen: false,
            capabilities,
        }
    }

    pub fn append(&mut self, step: impl IPipelineStep + 'static) -> Result<&mut Self, ModularError> {
        self.append_shared(Arc::new(step))
    }

    pub fn append_shared(&mut self, step: Arc<dyn IPipelineStep>) -> Result<&mut Self, ModularError> {
        if self.frozen {
            return Err(ModularError::PipelineFrozen);
        }

        #[cfg(feature = "logging")]
        log::debug!(
            "Modular. Pipeline step #{} '{}' appended",
            self.steps.len(),
            step.name()
        );

        self.steps.push(step);
        Ok(self)
    }

    /// Capabilities frozen at the end of the capabilities phase.
    pub fn capabilities(&self) -> &Arc<CapabilityProvider> {
        &self.capabilities
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) -> Result<Pipeline, ModularError> {
        if self.frozen {
            return Err(ModularError::PipelineFrozen);
        }
        self.frozen = true;

        Ok(Pipeline {
            steps: std::mem::take(&mut self.steps).into(),
        })
    }
}

/// Immutable step sequence produced by [`PipelineBuilder::freeze`].
#[derive(Clone)]
pub struct Pipeline {
    steps: Arc<[Arc<dyn IPipelineStep>]>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Wraps `terminal` so the first appended step runs first.
    pub fn build(&self, terminal: Arc<dyn IRequestDelegate>) -> Arc<dyn IRequestDelegate> {
        let mut current = terminal;

        for step in self.steps.iter().rev() {
            let next = Arc::clone(&current);
            current = Arc::new(StepWithNext {
                step: Arc::clone(step),
                next,
            });
        }

        current
    }
}

pub(crate) struct StepWithNext {
    pub step: Arc<dyn IPipelineStep>,
    pub next: Arc<dyn IRequestDelegate>,
}

#[async_trait]
impl IRequestDelegate for StepWithNext {
    async fn invoke(&self, context: &mut RequestContext) -> Result<(), StepError> {
        self.step.handle(context, Arc::clone(&self.next)).await
    }
}
