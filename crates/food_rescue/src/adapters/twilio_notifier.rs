// Rust guideline compliant 2026-02-27

//! SMS adapter for the `Notifier` port, backed by the Twilio Messages API.
//!
//! One form-encoded `POST` per message, authenticated with HTTP basic auth
//! (account SID / auth token). Any transport error or non-2xx status becomes
//! `NotificationError::DeliveryFailed`; the coordinator logs it and moves on.

use std::sync::Arc;
use std::time::Duration;

use domain::{NotificationError, Notifier};
use reqwest::Client;

/// Production Twilio REST endpoint.
pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Credentials and sender number for the Twilio account.
#[derive(Clone, PartialEq, Eq)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 form.
    pub from_number: String,
}

// Keep the auth token out of logs.
impl std::fmt::Debug for TwilioOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioOptions")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// `Notifier` adapter that sends SMS through Twilio.
#[derive(Debug, Clone)]
pub struct TwilioNotifier {
    client: Client,
    options: Arc<TwilioOptions>,
    base_url: String,
}

impl TwilioNotifier {
    /// Build a notifier with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` when the HTTP client cannot be constructed.
    pub fn new(options: TwilioOptions, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, options: Arc::new(options), base_url: TWILIO_API_BASE.to_owned() })
    }

    /// Point the notifier at another API host.
    #[cfg(test)]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.options.account_sid
        )
    }
}

impl Notifier for TwilioNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        let o = &self.options;
        if o.account_sid.is_empty() || o.auth_token.is_empty() || o.from_number.is_empty() {
            return Err(NotificationError::NotConfigured {
                reason: "twilio account sid, auth token and sender number are required".to_owned(),
            });
        }

        let form = [("To", phone), ("From", o.from_number.as_str()), ("Body", message)];
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&o.account_sid, Some(&o.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| NotificationError::DeliveryFailed { reason: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::DeliveryFailed {
                reason: format!("twilio returned {status}: {body}"),
            });
        }
        tracing::debug!(to = phone, "twilio_notifier.sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::post;
    use axum::{Form, Router};
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Captured = Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>;

    fn options() -> TwilioOptions {
        TwilioOptions {
            account_sid: "AC123".to_owned(),
            auth_token: "secret".to_owned(),
            from_number: "+15550001111".to_owned(),
        }
    }

    /// Local stand-in for the Messages endpoint; answers with `status`.
    async fn fake_twilio(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/2010-04-01/Accounts/:sid/Messages.json",
                post(
                    |State((captured, status)): State<(Captured, StatusCode)>,
                     headers: HeaderMap,
                     Form(form): Form<HashMap<String, String>>| async move {
                        let auth = headers
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_owned);
                        captured.lock().unwrap().push((auth, form));
                        (status, "{}")
                    },
                ),
            )
            .with_state((Arc::clone(&captured), status));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}"), captured)
    }

    #[test]
    fn messages_url_uses_account_sid() {
        let n = TwilioNotifier::new(options(), Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9/");
        assert_eq!(n.messages_url(), "http://localhost:9/2010-04-01/Accounts/AC123/Messages.json");
    }

    #[test]
    fn debug_redacts_token() {
        let s = format!("{:?}", options());
        assert!(!s.contains("secret"));
        assert!(s.contains("AC123"));
    }

    #[tokio::test]
    async fn posts_form_with_basic_auth() {
        let (base, captured) = fake_twilio(StatusCode::CREATED).await;
        let n = TwilioNotifier::new(options(), Duration::from_secs(5)).unwrap().with_base_url(base);

        n.send("+1234567890", "New food donation matched!").await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (auth, form) = &captured[0];
        assert!(auth.as_deref().is_some_and(|a| a.starts_with("Basic ")));
        assert_eq!(form["To"], "+1234567890");
        assert_eq!(form["From"], "+15550001111");
        assert_eq!(form["Body"], "New food donation matched!");
    }

    #[tokio::test]
    async fn error_status_is_delivery_failure() {
        let (base, _captured) = fake_twilio(StatusCode::BAD_REQUEST).await;
        let n = TwilioNotifier::new(options(), Duration::from_secs(5)).unwrap().with_base_url(base);
        let r = n.send("+1234567890", "hi").await;
        assert!(matches!(r, Err(NotificationError::DeliveryFailed { .. })), "{r:?}");
    }

    #[tokio::test]
    async fn missing_credentials_are_not_configured() {
        let mut o = options();
        o.auth_token.clear();
        let n = TwilioNotifier::new(o, Duration::from_secs(5)).unwrap();
        let r = n.send("+1234567890", "hi").await;
        assert!(matches!(r, Err(NotificationError::NotConfigured { .. })));
    }
}
