use crate::core::configuration::Configuration;
use crate::core::contracts::{ContributionError, IModule};
use crate::core::lifetime::Lifetime;
use crate::core::pipeline::PipelineBuilder;
use crate::core::registry::CapabilityRegistry;
use crate::web::environment::HostEnvironment;
use crate::web::home::home;
use crate::web::steps::{ErrorPageStep, RoutingStep};
use std::sync::Arc;

/// The host's own module. Registers [`HostEnvironment`] and contributes the
/// error page (development only) followed by routing to the home endpoint.
#[derive(Default)]
pub struct WebHostModule;

impl IModule for WebHostModule {
    fn name(&self) -> &str {
        "web-host"
    }

    fn contribute_capabilities(
        &self,
        registry: &CapabilityRegistry,
        configuration: &Configuration,
    ) -> Result<(), ContributionError> {
        let environment = HostEnvironment::from_configuration(configuration);
        registry.register::<HostEnvironment, _>(
            move |_| Ok(Arc::new(environment.clone())),
            Lifetime::Singleton,
        )?;
        Ok(())
    }

    fn contribute_pipeline(&self, pipeline: &mut PipelineBuilder) -> Result<(), ContributionError> {
        let environment = pipeline.capabilities().resolve::<HostEnvironment>()?;
        if environment.is_development() {
            pipeline.append(ErrorPageStep::new(true))?;
        }

        pipeline.append(
            RoutingStep::new()
                .map_get("/", home)
                .map_get("/home", home)
                .map_get("/home/index", home),
        )?;
        Ok(())
    }
}
