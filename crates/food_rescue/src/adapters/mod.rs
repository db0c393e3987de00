// Rust guideline compliant 2026-02-16

//! Adapters (secondary ports) for the food-rescue binary.
//!
//! Each sub-module implements one hexagonal port trait defined in the
//! `domain` crate. The in-memory `Store` lives in the `memory_store` crate so
//! component tests can share it.

pub mod log_notifier;
pub mod sqlite_store;
pub mod twilio_notifier;

use domain::{NotificationError, Notifier};

use log_notifier::LogNotifier;
use twilio_notifier::TwilioNotifier;

/// The notifier picked at startup: real SMS when credentials exist, log otherwise.
#[derive(Debug, Clone)]
pub enum SmsGateway {
    Log(LogNotifier),
    Twilio(TwilioNotifier),
}

impl SmsGateway {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Twilio(_) => "twilio",
        }
    }
}

impl Notifier for SmsGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        match self {
            Self::Log(n) => n.send(phone, message).await,
            Self::Twilio(n) => n.send(phone, message).await,
        }
    }
}
