use crate::core::configuration::Configuration;
use crate::core::contracts::{ContributionError, IModule};
use crate::core::registry::CapabilityRegistry;
use crate::notification::{INotifier, LIFETIME_KEY, NotificationError, validate};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_ENDPOINT: &str = "https://api.somefancy.example/v1/messages";

pub struct FancyApiNotifier {
    endpoint: String,
    sent: AtomicUsize,
}

impl FancyApiNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            sent: AtomicUsize::new(0),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl INotifier for FancyApiNotifier {
    fn channel(&self) -> &'static str {
        "fancy-api"
    }

    async fn send(&self, email: &str, subject: &str, _message: &str) -> Result<(), NotificationError> {
        validate(email, subject)?;

        #[cfg(feature = "logging")]
        log::info!(
            "FancyApiNotifier. Posting '{}' for '{}' to {}",
            subject,
            email,
            self.endpoint
        );

        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Registers [`FancyApiNotifier`] as the `INotifier`, replacing any notifier
/// registered by a module composed before it.
#[derive(Default)]
pub struct FancyApiNotifierModule;

impl IModule for FancyApiNotifierModule {
    fn name(&self) -> &str {
        "fancy-api-notifier"
    }

    fn contribute_capabilities(
        &self,
        registry: &CapabilityRegistry,
        configuration: &Configuration,
    ) -> Result<(), ContributionError> {
        let endpoint = configuration
            .get_or("fancy:endpoint", DEFAULT_ENDPOINT)
            .to_string();

        registry.register_with_policy::<dyn INotifier, _>(
            move |_| Ok(Arc::new(FancyApiNotifier::new(endpoint.clone())) as Arc<dyn INotifier>),
            configuration.get_or(LIFETIME_KEY, "scoped"),
        )?;
        Ok(())
    }
}
