//! Notification capability and the two interchangeable modules providing it.
//!
//! Both modules register the same [`INotifier`] contract; whichever is composed
//! last is the one the host resolves.

mod fancy_api;
mod smtp;

pub use fancy_api::{FancyApiNotifier, FancyApiNotifierModule};
pub use smtp::{SmtpNotifier, SmtpNotifierModule};

use async_trait::async_trait;
use thiserror::Error;

/// Configuration key for the lifetime of the registered notifier.
pub const LIFETIME_KEY: &str = "notifications:lifetime";

#[derive(Debug, Error, PartialEq)]
pub enum NotificationError {
    #[error("NotificationError: Invalid recipient address '{0}'")]
    InvalidRecipient(String),

    #[error("NotificationError: Empty subject for recipient '{0}'")]
    EmptySubject(String),
}

#[async_trait]
pub trait INotifier: Send + Sync {
    /// Transport the notifier sends through, e.g. `smtp`.
    fn channel(&self) -> &'static str;

    async fn send(&self, email: &str, subject: &str, message: &str) -> Result<(), NotificationError>;
}

pub(crate) fn validate(email: &str, subject: &str) -> Result<(), NotificationError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(NotificationError::InvalidRecipient(email.to_string()));
    }
    if subject.trim().is_empty() {
        return Err(NotificationError::EmptySubject(email.to_string()));
    }
    Ok(())
}
