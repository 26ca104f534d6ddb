use crate::core::error_modular::ModularError;
use crate::core::lifetime::Lifetime;
use crate::core::registry::{ErasedInstance, Registration};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::ReentrantMutex;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

struct ProviderEntry {
    registration: Registration,
    singleton: OnceCell<ErasedInstance>,
}

/// Read-only resolver produced by freezing a [`CapabilityRegistry`].
///
/// Safe to share between request handlers; singleton instances are created
/// lazily on first resolution and reused afterwards.
///
/// [`CapabilityRegistry`]: crate::core::registry::CapabilityRegistry
pub struct CapabilityProvider {
    entries: HashMap<TypeId, ProviderEntry>,
    // one singleton graph is built at a time; nested singletons re-enter on
    // the same thread, so a cycle is always seen on a single resolution path
    singleton_build: ReentrantMutex<()>,
}

impl CapabilityProvider {
    pub(crate) fn new(registrations: HashMap<TypeId, Registration>) -> Self {
        let entries = registrations
            .into_iter()
            .map(|(type_id, registration)| {
                (
                    type_id,
                    ProviderEntry {
                        registration,
                        singleton: OnceCell::new(),
                    },
                )
            })
            .collect();

        Self {
            entries,
            singleton_build: ReentrantMutex::new(()),
        }
    }

    pub fn resolve<C>(&self) -> Result<Arc<C>, ModularError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        ResolutionContext::new(self, None).resolve::<C>()
    }

    pub fn create_scope(self: &Arc<Self>) -> CapabilityScope {
        CapabilityScope::new(Arc::clone(self))
    }

    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<C>())
    }

    pub fn lifetime_of<C: ?Sized + 'static>(&self) -> Option<Lifetime> {
        self.entries
            .get(&TypeId::of::<C>())
            .map(|entry| entry.registration.lifetime)
    }

    /// Name of the module whose registration is active for `C`.
    pub fn registered_by<C: ?Sized + 'static>(&self) -> Option<&str> {
        self.entries
            .get(&TypeId::of::<C>())
            .and_then(|entry| entry.registration.registered_by.as_deref())
    }

    pub fn contracts(&self) -> Vec<&'static str> {
        let mut contracts: Vec<&'static str> = self
            .entries
            .values()
            .map(|entry| entry.registration.contract)
            .collect();
        contracts.sort_unstable();
        contracts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-request cache for scoped capabilities.
pub struct CapabilityScope {
    provider: Arc<CapabilityProvider>,
    instances: DashMap<TypeId, ErasedInstance>,
}

impl CapabilityScope {
    pub fn new(provider: Arc<CapabilityProvider>) -> Self {
        Self {
            provider,
            instances: DashMap::new(),
        }
    }

    pub fn resolve<C>(&self) -> Result<Arc<C>, ModularError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        ResolutionContext::new(&self.provider, Some(self)).resolve::<C>()
    }

    pub fn provider(&self) -> &Arc<CapabilityProvider> {
        &self.provider
    }

    fn get_or_create(
        &self,
        type_id: TypeId,
        create: impl FnOnce() -> Result<ErasedInstance, ModularError>,
    ) -> Result<ErasedInstance, ModularError> {
        if let Some(existing) = self.instances.get(&type_id) {
            return Ok(Arc::clone(existing.value()));
        }

        // created outside the map lock: factories may resolve further scoped contracts
        let created = create()?;
        Ok(Arc::clone(
            self.instances.entry(type_id).or_insert(created).value(),
        ))
    }
}

/// Handed to capability factories so they can resolve their own dependencies.
pub struct ResolutionContext<'a> {
    provider: &'a CapabilityProvider,
    scope: Option<&'a CapabilityScope>,
    path: Vec<(TypeId, &'static str)>,
}

impl<'a> ResolutionContext<'a> {
    fn new(provider: &'a CapabilityProvider, scope: Option<&'a CapabilityScope>) -> Self {
        Self {
            provider,
            scope,
            path: Vec::new(),
        }
    }

    pub fn resolve<C>(&self) -> Result<Arc<C>, ModularError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let contract = type_name::<C>();
        let erased = self.resolve_erased(TypeId::of::<C>(), contract)?;

        erased
            .downcast_ref::<Arc<C>>()
            .cloned()
            .ok_or_else(|| ModularError::CapabilityIncorrectType(contract.to_string()))
    }

    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    fn resolve_erased(
        &self,
        type_id: TypeId,
        contract: &'static str,
    ) -> Result<ErasedInstance, ModularError> {
        if self.path.iter().any(|(seen, _)| *seen == type_id) {
            let chain = self
                .path
                .iter()
                .map(|(_, name)| *name)
                .chain(std::iter::once(contract))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ModularError::CircularDependency(contract.to_string(), chain));
        }

        let entry = self
            .provider
            .entries
            .get(&type_id)
            .ok_or_else(|| ModularError::UnregisteredContract(contract.to_string()))?;

        match entry.registration.lifetime {
            Lifetime::Transient => self.child(type_id, contract, self.scope).create(entry),
            Lifetime::Singleton => {
                if let Some(existing) = entry.singleton.get() {
                    return Ok(Arc::clone(existing));
                }

                let _building = self.provider.singleton_build.lock();
                entry
                    .singleton
                    // singletons never capture request-scoped dependencies
                    .get_or_try_init(|| self.child(type_id, contract, None).create(entry))
                    .map(Arc::clone)
            }
            Lifetime::Scoped => {
                let scope = self
                    .scope
                    .ok_or_else(|| ModularError::ScopeRequired(contract.to_string()))?;
                scope.get_or_create(type_id, || {
                    self.child(type_id, contract, Some(scope)).create(entry)
                })
            }
        }
    }

    fn child(
        &self,
        type_id: TypeId,
        contract: &'static str,
        scope: Option<&'a CapabilityScope>,
    ) -> ResolutionContext<'a> {
        let mut path = self.path.clone();
        path.push((type_id, contract));
        ResolutionContext {
            provider: self.provider,
            scope,
            path,
        }
    }

    fn create(&self, entry: &ProviderEntry) -> Result<ErasedInstance, ModularError> {
        (entry.registration.factory)(self).map_err(|err| {
            // keep resolution errors of nested contracts intact
            match err.downcast::<ModularError>() {
                Ok(inner) => *inner,
                Err(err) => ModularError::CapabilityFactoryFailed(
                    entry.registration.contract.to_string(),
                    err.to_string(),
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::CapabilityRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Clock: Send + Sync {
        fn id(&self) -> usize;
    }

    struct CountingClock(usize);
    impl Clock for CountingClock {
        fn id(&self) -> usize {
            self.0
        }
    }

    trait Reporter: Send + Sync {
        fn clock_id(&self) -> usize;
    }

    struct ClockReporter(Arc<dyn Clock>);
    impl Reporter for ClockReporter {
        fn clock_id(&self) -> usize {
            self.0.id()
        }
    }

    fn counting_registry(lifetime: Lifetime) -> (CapabilityRegistry, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = CapabilityRegistry::new();
        let created = Arc::clone(&counter);
        registry
            .register::<dyn Clock, _>(
                move |_| {
                    let id = created.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(CountingClock(id)) as Arc<dyn Clock>)
                },
                lifetime,
            )
            .unwrap();
        (registry, counter)
    }

    #[test]
    fn test_singleton_is_created_once() {
        let (registry, counter) = counting_registry(Lifetime::Singleton);
        let provider = registry.freeze().unwrap();

        let first = provider.resolve::<dyn Clock>().unwrap();
        let second = provider.create_scope().resolve::<dyn Clock>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_is_created_every_time() {
        let (registry, counter) = counting_registry(Lifetime::Transient);
        let provider = registry.freeze().unwrap();

        let first = provider.resolve::<dyn Clock>().unwrap();
        let second = provider.resolve::<dyn Clock>().unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_scoped_is_shared_within_scope_only() {
        let (registry, counter) = counting_registry(Lifetime::Scoped);
        let provider = registry.freeze().unwrap();

        let scope_a = provider.create_scope();
        let a1 = scope_a.resolve::<dyn Clock>().unwrap();
        let a2 = scope_a.resolve::<dyn Clock>().unwrap();
        let b = provider.create_scope().resolve::<dyn Clock>().unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_scoped_from_root_requires_scope() {
        let (registry, _) = counting_registry(Lifetime::Scoped);
        let provider = registry.freeze().unwrap();

        let err = provider.resolve::<dyn Clock>().err().unwrap();
        assert!(matches!(err, ModularError::ScopeRequired(_)));
    }

    #[test]
    fn test_factory_resolves_dependencies() {
        let (registry, _) = counting_registry(Lifetime::Singleton);
        registry
            .register::<dyn Reporter, _>(
                |context| {
                    let clock = context.resolve::<dyn Clock>()?;
                    Ok(Arc::new(ClockReporter(clock)) as Arc<dyn Reporter>)
                },
                Lifetime::Transient,
            )
            .unwrap();
        let provider = registry.freeze().unwrap();

        let reporter = provider.resolve::<dyn Reporter>().unwrap();
        assert_eq!(reporter.clock_id(), provider.resolve::<dyn Clock>().unwrap().id());
    }

    #[test]
    fn test_singleton_cannot_capture_scoped_dependency() {
        let (registry, _) = counting_registry(Lifetime::Scoped);
        registry
            .register::<dyn Reporter, _>(
                |context| {
                    let clock = context.resolve::<dyn Clock>()?;
                    Ok(Arc::new(ClockReporter(clock)) as Arc<dyn Reporter>)
                },
                Lifetime::Singleton,
            )
            .unwrap();
        let provider = registry.freeze().unwrap();

        let err = provider.create_scope().resolve::<dyn Reporter>().err().unwrap();
        assert!(matches!(err, ModularError::ScopeRequired(_)));
    }

    #[test]
    fn test_missing_dependency_keeps_original_error() {
        let registry = CapabilityRegistry::new();
        registry
            .register::<dyn Reporter, _>(
                |context| {
                    let clock = context.resolve::<dyn Clock>()?;
                    Ok(Arc::new(ClockReporter(clock)) as Arc<dyn Reporter>)
                },
                Lifetime::Transient,
            )
            .unwrap();
        let provider = registry.freeze().unwrap();

        let err = provider.resolve::<dyn Reporter>().err().unwrap();
        assert_eq!(
            err,
            ModularError::UnregisteredContract(type_name::<dyn Clock>().to_string())
        );
    }

    #[test]
    fn test_circular_dependency_is_reported() {
        let registry = CapabilityRegistry::new();
        registry
            .register::<dyn Clock, _>(
                |context| {
                    let reporter = context.resolve::<dyn Reporter>()?;
                    Ok(Arc::new(CountingClock(reporter.clock_id())) as Arc<dyn Clock>)
                },
                Lifetime::Transient,
            )
            .unwrap();
        registry
            .register::<dyn Reporter, _>(
                |context| {
                    let clock = context.resolve::<dyn Clock>()?;
                    Ok(Arc::new(ClockReporter(clock)) as Arc<dyn Reporter>)
                },
                Lifetime::Transient,
            )
            .unwrap();
        let provider = registry.freeze().unwrap();

        let err = provider.resolve::<dyn Clock>().err().unwrap();
        assert!(matches!(err, ModularError::CircularDependency(_, _)));
    }

    #[test]
    fn test_failing_factory_is_reported() {
        let registry = CapabilityRegistry::new();
        registry
            .register::<dyn Clock, _>(|_| Err("clock offline".into()), Lifetime::Transient)
            .unwrap();
        let provider = registry.freeze().unwrap();

        let err = provider.resolve::<dyn Clock>().err().unwrap();
        assert_eq!(
            err,
            ModularError::CapabilityFactoryFailed(
                type_name::<dyn Clock>().to_string(),
                "clock offline".into()
            )
        );
    }

    #[test]
    fn test_concurrent_resolution_shares_singleton() {
        let (registry, counter) = counting_registry(Lifetime::Singleton);
        let provider = registry.freeze().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                std::thread::spawn(move || provider.resolve::<dyn Clock>().unwrap().id())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_singleton_cycle_entered_from_both_ends_concurrently() {
        let registry = CapabilityRegistry::new();
        registry
            .register::<dyn Clock, _>(
                |context| {
                    let reporter = context.resolve::<dyn Reporter>()?;
                    Ok(Arc::new(CountingClock(reporter.clock_id())) as Arc<dyn Clock>)
                },
                Lifetime::Singleton,
            )
            .unwrap();
        registry
            .register::<dyn Reporter, _>(
                |context| {
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    let clock = context.resolve::<dyn Clock>()?;
                    Ok(Arc::new(ClockReporter(clock)) as Arc<dyn Reporter>)
                },
                Lifetime::Singleton,
            )
            .unwrap();
        let provider = registry.freeze().unwrap();
        let barrier = std::sync::Barrier::new(2);

        let (clock, reporter) = std::thread::scope(|scope| {
            let clock = scope.spawn(|| {
                barrier.wait();
                provider.resolve::<dyn Clock>().err()
            });
            let reporter = scope.spawn(|| {
                barrier.wait();
                provider.resolve::<dyn Reporter>().err()
            });
            (clock.join().unwrap(), reporter.join().unwrap())
        });

        assert!(matches!(clock, Some(ModularError::CircularDependency(_, _))));
        assert!(matches!(reporter, Some(ModularError::CircularDependency(_, _))));
    }

    #[test]
    fn test_contracts_are_listed() {
        let (registry, _) = counting_registry(Lifetime::Singleton);
        let provider = registry.freeze().unwrap();

        assert_eq!(provider.contracts(), vec![type_name::<dyn Clock>()]);
        assert_eq!(provider.len(), 1);
        assert!(provider.contains::<dyn Clock>());
        assert!(!provider.contains::<dyn Reporter>());
    }
}
