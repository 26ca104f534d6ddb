use crate::core::configuration::Configuration;
use crate::core::contracts::IModule;
use crate::core::error_modular::ModularError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

type ModuleConstructor = dyn Fn() -> Arc<dyn IModule> + Send + Sync;

/// Configuration key holding the ordered list of module identifiers.
pub const MODULES_KEY: &str = "modules";

/// Maps module identifiers to constructors so the list of composed modules can
/// come from configuration instead of code.
#[derive(Default)]
pub struct ModuleCatalog {
    constructors: DashMap<String, Arc<ModuleConstructor>>,
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, id: &str, constructor: F) -> Result<(), ModularError>
    where
        F: Fn() -> Arc<dyn IModule> + Send + Sync + 'static,
    {
        match self.constructors.entry(normalize_id(id)) {
            Entry::Occupied(entry) => Err(ModularError::ModuleAlreadyCataloged(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(constructor));
                Ok(())
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(&normalize_id(id))
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .constructors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Builds the modules named by `ids`, preserving their order.
    pub fn instantiate<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Arc<dyn IModule>>, ModularError> {
        ids.iter()
            .map(|id| {
                let id = normalize_id(id.as_ref());
                let constructor = self
                    .constructors
                    .get(&id)
                    .map(|entry| Arc::clone(entry.value()))
                    .ok_or(ModularError::UnknownModule(id))?;
                Ok(constructor())
            })
            .collect()
    }

    pub fn discover(&self, configuration: &Configuration) -> Result<Vec<Arc<dyn IModule>>, ModularError> {
        let ids = configuration.get_list(MODULES_KEY);

        #[cfg(feature = "logging")]
        log::info!("Modular. Discovered modules from configuration: {:?}", ids);

        self.instantiate(&ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contracts::ContributionError;
    use crate::core::registry::CapabilityRegistry;

    struct Named(&'static str);

    impl IModule for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn contribute_capabilities(
            &self,
            _registry: &CapabilityRegistry,
            _configuration: &Configuration,
        ) -> Result<(), ContributionError> {
            Ok(())
        }
    }

    fn catalog() -> ModuleCatalog {
        let catalog = ModuleCatalog::new();
        catalog.add("alpha", || Arc::new(Named("alpha")) as Arc<dyn IModule>).unwrap();
        catalog.add("beta", || Arc::new(Named("beta")) as Arc<dyn IModule>).unwrap();
        catalog
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let catalog = catalog();
        let result = catalog.add(" Alpha ", || Arc::new(Named("other")) as Arc<dyn IModule>);

        assert_eq!(result, Err(ModularError::ModuleAlreadyCataloged("alpha".into())));
        assert_eq!(catalog.ids(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_instantiate_preserves_given_order() {
        let modules = catalog().instantiate(&["beta", "ALPHA"]).unwrap();
        let names: Vec<&str> = modules.iter().map(|module| module.name()).collect();
        assert_eq!(names, vec!["beta", "alpha"]);
    }

    #[test]
    fn test_unknown_id_fails() {
        let err = catalog().instantiate(&["alpha", "gamma"]).err().unwrap();
        assert_eq!(err, ModularError::UnknownModule("gamma".into()));
    }

    #[test]
    fn test_discover_reads_configuration() {
        let configuration = Configuration::from_pairs([("modules:0", "beta"), ("modules:1", "alpha")]);
        let modules = catalog().discover(&configuration).unwrap();
        let names: Vec<&str> = modules.iter().map(|module| module.name()).collect();
        assert_eq!(names, vec!["beta", "alpha"]);
    }

    #[test]
    fn test_discover_without_modules_key_is_empty() {
        let modules = catalog().discover(&Configuration::new()).unwrap();
        assert!(modules.is_empty());
        assert!(catalog().contains("BETA"));
    }
}
