// Rust guideline compliant 2026-02-23

//! Process configuration loaded from environment variables.

use std::time::Duration;

use crate::adapters::twilio_notifier::TwilioOptions;

/// Errors raised while reading the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Port for the REST API server.
    pub api_port: u16,
    /// `sqlite:` URL; `None` keeps everything in memory.
    pub database_url: Option<String>,
    /// Present only when all three Twilio variables are set.
    pub twilio: Option<TwilioOptions>,
    /// Seed the demo restaurants and shelters on startup.
    pub seed_sample_data: bool,
    /// Fixed RNG seed for generated coordinates.
    pub location_seed: Option<u64>,
    /// Upper bound on one SMS attempt.
    pub notify_timeout: Duration,
}

impl Config {
    /// Read the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let twilio = match (
            var("TWILIO_ACCOUNT_SID"),
            var("TWILIO_AUTH_TOKEN"),
            var("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => {
                Some(TwilioOptions { account_sid, auth_token, from_number })
            }
            _ => None,
        };

        Ok(Self {
            api_port: parse(&var, "API_PORT")?.unwrap_or(5000),
            database_url: var("DATABASE_URL"),
            twilio,
            seed_sample_data: flag(&var, "SEED_SAMPLE_DATA")?,
            location_seed: parse(&var, "LOCATION_SEED")?,
            notify_timeout: Duration::from_secs(parse(&var, "NOTIFY_TIMEOUT_SECS")?.unwrap_or(10)),
        })
    }
}

fn parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    var(key)
        .map(|value| match value.parse() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::Invalid { key, value }),
        })
        .transpose()
}

fn flag(var: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<bool, ConfigError> {
    match var(key) {
        None => Ok(false),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
    }
}
