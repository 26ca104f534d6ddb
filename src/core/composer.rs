use crate::core::catalog::ModuleCatalog;
use crate::core::configuration::Configuration;
use crate::core::contracts::{ContributionError, IModule};
use crate::core::error_modular::ModularError;
use crate::core::pipeline::{Pipeline, PipelineBuilder};
use crate::core::provider::CapabilityProvider;
use crate::core::registry::CapabilityRegistry;
use crate::core::runtime::HostRuntime;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositionState {
    Uninitialized,
    CapabilitiesPhase,
    PipelinePhase,
    Composed,
    Running,
    Failed,
}

impl fmt::Display for CompositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompositionState::Uninitialized => "Uninitialized",
            CompositionState::CapabilitiesPhase => "CapabilitiesPhase",
            CompositionState::PipelinePhase => "PipelinePhase",
            CompositionState::Composed => "Composed",
            CompositionState::Running => "Running",
            CompositionState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Frozen capabilities and pipeline, built once and owned by the host afterwards.
pub struct ComposedApplication {
    modules: Vec<String>,
    capabilities: Arc<CapabilityProvider>,
    pipeline: Pipeline,
    composed_at: DateTime<Utc>,
}

impl ComposedApplication {
    /// Module names in composition order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn capabilities(&self) -> &Arc<CapabilityProvider> {
        &self.capabilities
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn composed_at(&self) -> DateTime<Utc> {
        self.composed_at
    }
}

/// Runs the two-phase composition over an ordered module list.
///
/// Every module contributes capabilities first, in list order; the registry is
/// then frozen and every module contributes pipeline steps, again in list order.
/// The first failing module aborts the whole composition and nothing built so
/// far is exposed.
pub struct ModuleComposer {
    modules: Vec<Arc<dyn IModule>>,
    configuration: Configuration,
    state: CompositionState,
    composed: Option<Arc<ComposedApplication>>,
}

impl ModuleComposer {
    pub fn new(modules: Vec<Arc<dyn IModule>>, configuration: Configuration) -> Self {
        Self {
            modules,
            configuration,
            state: CompositionState::Uninitialized,
            composed: None,
        }
    }

    /// Modules are taken from `catalog` in the order listed under `modules`
    /// in `configuration`.
    pub fn from_catalog(
        catalog: &ModuleCatalog,
        configuration: Configuration,
    ) -> Result<Self, ModularError> {
        let modules = catalog.discover(&configuration)?;
        Ok(Self::new(modules, configuration))
    }

    pub fn state(&self) -> CompositionState {
        self.state
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|module| module.name()).collect()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn compose(&mut self) -> Result<Arc<ComposedApplication>, ModularError> {
        if self.state != CompositionState::Uninitialized {
            return Err(ModularError::AlreadyComposed(self.state.to_string()));
        }

        match self.run_phases() {
            Ok(application) => {
                self.transition(CompositionState::Composed);
                self.composed = Some(Arc::clone(&application));
                Ok(application)
            }
            Err(err) => {
                #[cfg(feature = "logging")]
                log::error!("Modular. Composition aborted: {}", err);

                self.transition(CompositionState::Failed);
                Err(err)
            }
        }
    }

    /// Composes if that has not happened yet and hands the result to a
    /// [`HostRuntime`]. The composer keeps no reference afterwards.
    pub fn start(&mut self) -> Result<HostRuntime, ModularError> {
        if self.state == CompositionState::Uninitialized {
            self.compose()?;
        }

        match (self.state, self.composed.take()) {
            (CompositionState::Composed, Some(application)) => {
                self.transition(CompositionState::Running);
                Ok(HostRuntime::new(application))
            }
            (state, _) => Err(ModularError::NotComposed(state.to_string())),
        }
    }

    fn run_phases(&mut self) -> Result<Arc<ComposedApplication>, ModularError> {
        let registry = CapabilityRegistry::new();

        self.transition(CompositionState::CapabilitiesPhase);
        for module in &self.modules {
            registry.set_contributor(Some(module.name()));
            contribute(module.name(), CompositionState::CapabilitiesPhase, || {
                module.contribute_capabilities(&registry, &self.configuration)?;
                if registry.is_frozen() {
                    return Err("froze the capability registry before all modules contributed".into());
                }
                Ok(())
            })?;
        }
        registry.set_contributor(None);
        let capabilities = registry.freeze()?;

        self.transition(CompositionState::PipelinePhase);
        let mut builder = PipelineBuilder::new(Arc::clone(&capabilities));
        for module in &self.modules {
            contribute(module.name(), CompositionState::PipelinePhase, || {
                module.contribute_pipeline(&mut builder)
            })?;
        }
        let pipeline = builder.freeze()?;

        Ok(Arc::new(ComposedApplication {
            modules: self.modules.iter().map(|module| module.name().to_string()).collect(),
            capabilities,
            pipeline,
            composed_at: Utc::now(),
        }))
    }

    fn transition(&mut self, next: CompositionState) {
        #[cfg(feature = "logging")]
        log::info!("Modular. Composition state {} -> {}", self.state, next);

        self.state = next;
    }
}

fn contribute<F>(module: &str, phase: CompositionState, contribution: F) -> Result<(), ModularError>
where
    F: FnOnce() -> Result<(), ContributionError>,
{
    #[cfg(feature = "logging")]
    log::debug!("Modular. Module '{}' contributing in {}", module, phase);

    let failure = match panic::catch_unwind(AssertUnwindSafe(contribution)) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => err.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };

    Err(ModularError::ModuleContribution(
        module.to_string(),
        phase.to_string(),
        failure,
    ))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

/// Composes `modules` and returns the running host.
pub fn start(
    modules: Vec<Arc<dyn IModule>>,
    configuration: Configuration,
) -> Result<HostRuntime, ModularError> {
    ModuleComposer::new(modules, configuration).start()
}
