// Rust guideline compliant 2026-02-23

//! Donation and shelter registries -- validation, lifecycle and the points ledger.
//!
//! Entry points: [`DonationRegistry`], [`ShelterRegistry`].
//! Configuration via [`RegistryConfig::builder`].
//!
//! Both registries are stateless apart from their coordinate scatter; the
//! `Store` port is injected per call.

mod donations;
mod scatter;
mod shelters;

pub use donations::{DonationRegistry, DonationRequest};
pub use scatter::Scatter;
pub use shelters::{DEFAULT_NEEDS, ShelterProfile, ShelterRegistry};

use domain::{DonationId, ErrorKind, GeoPoint, ShelterId, StoreError};

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Errors that can occur in registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The supplied configuration is invalid.
    #[error("invalid registry configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// Malformed input, rejected before any write.
    #[error("invalid input: {reason}")]
    Validation {
        /// Human-readable description of the problem.
        reason: String,
    },
    #[error("donation {0} not found")]
    DonationNotFound(DonationId),
    #[error("shelter {0} not found")]
    ShelterNotFound(ShelterId),
    /// The donation was already claimed.
    #[error("donation {0} is already matched")]
    AlreadyMatched(DonationId),
    #[error("shelter name already registered: {0}")]
    DuplicateShelter(String),
    /// The store failed; nothing was applied.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl RegistryError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    /// Outcome class for transports.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. } | Self::Validation { .. } => ErrorKind::Validation,
            Self::DonationNotFound(_) | Self::ShelterNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyMatched(_) | Self::DuplicateShelter(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DonationNotFound(id) => Self::DonationNotFound(id),
            StoreError::ShelterNotFound(id) => Self::ShelterNotFound(id),
            StoreError::StatusConflict(id) => Self::AlreadyMatched(id),
            StoreError::DuplicateName { name } => Self::DuplicateShelter(name),
            e @ StoreError::Unavailable { .. } => Self::Storage(e),
        }
    }
}

// ---------------------------------------------------------------------------
// RegistryConfig + builder
// ---------------------------------------------------------------------------

/// San Francisco city centre, where the original sample data lives.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::new(37.7749, -122.4194);

/// Runtime configuration shared by both registries.
///
/// Construct via [`RegistryConfig::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Shortest accepted donation shelf life, in hours.
    pub min_expiry_hours: u32,
    /// Longest accepted donation shelf life, in hours.
    pub max_expiry_hours: u32,
    /// Centre of the area where missing coordinates are seeded.
    pub center: GeoPoint,
    /// Half-width of the seeding square, in degrees.
    pub spread_degrees: f64,
    /// Optional RNG seed for reproducible coordinates. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Builder for [`RegistryConfig`].
///
/// Obtain via [`RegistryConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct RegistryConfigBuilder {
    min_expiry_hours: u32,
    max_expiry_hours: u32,
    center: GeoPoint,
    spread_degrees: f64,
    seed: Option<u64>,
}

impl RegistryConfig {
    /// Create a builder.
    ///
    /// Default values: expiry `[1, 48]` hours, centre [`DEFAULT_CENTER`],
    /// `spread_degrees = 0.05` (a few km), `seed = None`.
    #[must_use]
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder {
            min_expiry_hours: 1,
            max_expiry_hours: 48,
            center: DEFAULT_CENTER,
            spread_degrees: 0.05,
            seed: None,
        }
    }
}

impl RegistryConfigBuilder {
    /// Override the accepted shelf-life window (inclusive).
    #[must_use]
    pub fn expiry_hours(mut self, min: u32, max: u32) -> Self {
        self.min_expiry_hours = min;
        self.max_expiry_hours = max;
        self
    }

    #[must_use]
    pub fn center(mut self, center: GeoPoint) -> Self {
        self.center = center;
        self
    }

    #[must_use]
    pub fn spread_degrees(mut self, spread_degrees: f64) -> Self {
        self.spread_degrees = spread_degrees;
        self
    }

    /// Fix the RNG seed for deterministic coordinates (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`] when the expiry window is empty
    /// or starts at zero, the centre is not a valid coordinate, or the spread is
    /// negative or not finite.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<RegistryConfig, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidConfig { reason: reason.to_owned() };
        if self.min_expiry_hours == 0 {
            return Err(invalid("min_expiry_hours must be >= 1"));
        }
        if self.min_expiry_hours > self.max_expiry_hours {
            return Err(invalid("min_expiry_hours must be <= max_expiry_hours"));
        }
        if !is_valid_point(self.center) {
            return Err(invalid("center must be a valid latitude/longitude"));
        }
        if !self.spread_degrees.is_finite() || self.spread_degrees < 0.0 {
            return Err(invalid("spread_degrees must be finite and >= 0"));
        }
        Ok(RegistryConfig {
            min_expiry_hours: self.min_expiry_hours,
            max_expiry_hours: self.max_expiry_hours,
            center: self.center,
            spread_degrees: self.spread_degrees,
            seed: self.seed,
        })
    }
}

/// `true` for finite coordinates inside `[-90, 90] x [-180, 180]`.
pub(crate) fn is_valid_point(p: GeoPoint) -> bool {
    p.lat.is_finite()
        && p.lng.is_finite()
        && (-90.0..=90.0).contains(&p.lat)
        && (-180.0..=180.0).contains(&p.lng)
}

/// Trimmed copy of `value`, or a validation error naming `field` when blank.
pub(crate) fn required(field: &str, value: &str) -> Result<String, RegistryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_owned())
}
