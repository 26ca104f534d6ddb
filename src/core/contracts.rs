use crate::core::configuration::Configuration;
use crate::core::pipeline::PipelineBuilder;
use crate::core::registry::CapabilityRegistry;
use crate::core::runtime::RequestContext;
use async_trait::async_trait;
use std::any::type_name;
use std::error::Error;
use std::sync::Arc;

pub type ContributionError = Box<dyn Error + Send + Sync>;
pub type StepError = Box<dyn Error + Send + Sync>;

/// A unit the host composes at startup.
///
/// Capabilities are contributed for every module before any module is asked for
/// pipeline steps, so `contribute_pipeline` may resolve anything registered in
/// the first phase through [`PipelineBuilder::capabilities`].
pub trait IModule: Send + Sync {
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    fn contribute_capabilities(
        &self,
        registry: &CapabilityRegistry,
        configuration: &Configuration,
    ) -> Result<(), ContributionError>;

    fn contribute_pipeline(&self, _pipeline: &mut PipelineBuilder) -> Result<(), ContributionError> {
        Ok(())
    }
}

#[async_trait]
pub trait IRequestDelegate: Send + Sync {
    async fn invoke(&self, context: &mut RequestContext) -> Result<(), StepError>;
}

#[async_trait]
pub trait IPipelineStep: Send + Sync {
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    async fn handle(
        &self,
        context: &mut RequestContext,
        next: Arc<dyn IRequestDelegate>,
    ) -> Result<(), StepError>;
}
