use crate::core::configuration::Configuration;
use crate::core::contracts::{ContributionError, IModule};
use crate::core::registry::CapabilityRegistry;
use crate::notification::{INotifier, LIFETIME_KEY, NotificationError, validate};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct SmtpNotifier {
    host: String,
    sent: AtomicUsize,
}

impl SmtpNotifier {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            sent: AtomicUsize::new(0),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl INotifier for SmtpNotifier {
    fn channel(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, email: &str, subject: &str, _message: &str) -> Result<(), NotificationError> {
        validate(email, subject)?;

        #[cfg(feature = "logging")]
        log::info!(
            "SmtpNotifier. Sending '{}' to '{}' via {}",
            subject,
            email,
            self.host
        );

        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Registers [`SmtpNotifier`] as the `INotifier`.
///
/// Reads `smtp:enabled` (skip registration when false), `smtp:host` and
/// `notifications:lifetime` (default `scoped`).
#[derive(Default)]
pub struct SmtpNotifierModule;

impl IModule for SmtpNotifierModule {
    fn name(&self) -> &str {
        "smtp-notifier"
    }

    fn contribute_capabilities(
        &self,
        registry: &CapabilityRegistry,
        configuration: &Configuration,
    ) -> Result<(), ContributionError> {
        if configuration.get_bool("smtp:enabled")? == Some(false) {
            return Ok(());
        }

        let host = configuration.get_or("smtp:host", "localhost:25").to_string();
        registry.register_with_policy::<dyn INotifier, _>(
            move |_| Ok(Arc::new(SmtpNotifier::new(host.clone())) as Arc<dyn INotifier>),
            configuration.get_or(LIFETIME_KEY, "scoped"),
        )?;
        Ok(())
    }
}
