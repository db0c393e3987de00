// Rust guideline compliant 2026-02-27

//! Fallback adapter for the `Notifier` port.
//!
//! Used when SMS credentials are absent: the message that would have been
//! sent is logged via `tracing::info!` and `send` always returns `Ok(())`.

use domain::{NotificationError, Notifier};

/// `Notifier` adapter that logs each outbound message instead of sending it.
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        tracing::info!(to = phone, message, "log_notifier.sms_not_configured");
        Ok(())
    }
}
