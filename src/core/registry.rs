use crate::core::error_modular::ModularError;
use crate::core::lifetime::Lifetime;
use crate::core::provider::{CapabilityProvider, ResolutionContext};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

pub(crate) type ErasedInstance = Arc<dyn Any + Send + Sync>;

pub(crate) type ErasedFactory = dyn Fn(&ResolutionContext<'_>) -> Result<ErasedInstance, Box<dyn Error + Send + Sync>>
    + Send
    + Sync;

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) contract: &'static str,
    pub(crate) lifetime: Lifetime,
    pub(crate) registered_by: Option<String>,
    pub(crate) factory: Arc<ErasedFactory>,
}

/// Contract → factory mapping filled during the capabilities phase.
///
/// Registering a contract twice replaces the earlier registration entirely, so
/// the module contributing last wins. Once [`freeze`](Self::freeze) has been
/// called every further `register` fails with [`ModularError::RegistryFrozen`].
pub struct CapabilityRegistry {
    registrations: DashMap<TypeId, Registration>,
    frozen: RwLock<Option<Arc<CapabilityProvider>>>,
    contributor: RwLock<Option<String>>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            registrations: DashMap::new(),
            frozen: RwLock::new(None),
            contributor: RwLock::new(None),
        }
    }

    pub fn register<C, F>(&self, factory: F, lifetime: Lifetime) -> Result<(), ModularError>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<C>, Box<dyn Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        let contract = type_name::<C>();

        // held until the insert lands so a concurrent freeze cannot miss it
        let frozen = self.frozen.read();
        if frozen.is_some() {
            return Err(ModularError::RegistryFrozen(contract.to_string()));
        }

        let erased: Arc<ErasedFactory> = Arc::new(move |context: &ResolutionContext<'_>| {
            let instance = factory(context)?;
            Ok(Arc::new(instance) as ErasedInstance)
        });

        let registration = Registration {
            contract,
            lifetime,
            registered_by: self.contributor.read().clone(),
            factory: erased,
        };

        #[cfg(feature = "logging")]
        log::debug!(
            "Modular. Capability '{}' registered as {} by '{}'",
            contract,
            lifetime,
            registration.registered_by.as_deref().unwrap_or("host")
        );

        if let Some(_previous) = self.registrations.insert(TypeId::of::<C>(), registration) {
            #[cfg(feature = "logging")]
            log::debug!(
                "Modular. Capability '{}' previously registered by '{}' has been overridden",
                contract,
                _previous.registered_by.as_deref().unwrap_or("host")
            );
        }

        Ok(())
    }

    /// Same as [`register`](Self::register) with the lifetime given as text,
    /// e.g. read from configuration.
    pub fn register_with_policy<C, F>(&self, factory: F, policy: &str) -> Result<(), ModularError>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<C>, Box<dyn Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        let lifetime = Lifetime::try_from(policy)?;
        self.register::<C, F>(factory, lifetime)
    }

    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.read().is_some()
    }

    /// Resolves through the frozen provider. Scoped contracts need a request
    /// scope, see [`CapabilityProvider::create_scope`].
    pub fn resolve<C>(&self) -> Result<Arc<C>, ModularError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        match self.frozen.read().as_ref() {
            Some(provider) => provider.resolve::<C>(),
            None => Err(ModularError::RegistryNotFrozen(
                type_name::<C>().to_string(),
            )),
        }
    }

    /// Snapshots the registrations into a read-only provider. Calling it again
    /// returns the same provider. Only the composer freezes, once every module
    /// has contributed.
    pub(crate) fn freeze(&self) -> Result<Arc<CapabilityProvider>, ModularError> {
        let mut frozen = self.frozen.write();
        if let Some(provider) = frozen.as_ref() {
            return Ok(Arc::clone(provider));
        }

        let registrations: HashMap<TypeId, Registration> = self
            .registrations
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        #[cfg(feature = "logging")]
        log::info!(
            "Modular. Capability registry frozen with {} contract(s)",
            registrations.len()
        );

        let provider = Arc::new(CapabilityProvider::new(registrations));
        *frozen = Some(Arc::clone(&provider));
        Ok(provider)
    }

    pub(crate) fn set_contributor(&self, module: Option<&str>) {
        *self.contributor.write() = module.map(str::to_string);
    }
}
