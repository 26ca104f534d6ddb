pub mod core;
pub mod notification;
pub mod web;

use crate::core::catalog::ModuleCatalog;
use crate::core::configuration::Configuration;
use crate::core::contracts::IModule;
use crate::core::error_modular::ModularError;
use crate::core::runtime::HostRuntime;
use std::sync::Arc;

pub use crate::core::composer::{ComposedApplication, CompositionState, ModuleComposer};
pub use crate::core::contracts::{IPipelineStep, IRequestDelegate};
pub use crate::core::lifetime::Lifetime;
pub use crate::core::registry::CapabilityRegistry;
pub use crate::core::runtime::{Request, RequestContext, Response};

/// Composes the given modules in order and starts the host.
pub fn start(
    modules: Vec<Arc<dyn IModule>>,
    configuration: Configuration,
) -> Result<HostRuntime, ModularError> {
    crate::core::composer::start(modules, configuration)
}

/// Composes the modules listed under the `modules` configuration key, looked
/// up in `catalog`, and starts the host.
pub fn start_discovered(
    catalog: &ModuleCatalog,
    configuration: Configuration,
) -> Result<HostRuntime, ModularError> {
    ModuleComposer::from_catalog(catalog, configuration)?.start()
}

/// Catalog of the modules shipped with this crate.
pub fn builtin_catalog() -> Result<ModuleCatalog, ModularError> {
    let catalog = ModuleCatalog::default();
    catalog.add("web-host", || Arc::new(web::WebHostModule) as Arc<dyn IModule>)?;
    catalog.add("smtp-notifier", || {
        Arc::new(notification::SmtpNotifierModule) as Arc<dyn IModule>
    })?;
    catalog.add("fancy-api-notifier", || {
        Arc::new(notification::FancyApiNotifierModule) as Arc<dyn IModule>
    })?;
    Ok(catalog)
}
