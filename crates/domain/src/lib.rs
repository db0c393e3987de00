// Rust guideline compliant 2026-02-23

//! Shared domain types for the food-rescue matching engine.
//!
//! Defines `Donation`, `Shelter`, `Match`, `Stats`, the error taxonomy of the
//! ports, and the hexagonal port traits: `Store` and `Notifier`.
//! All engine components depend on this crate; adapters live in the binary.

use std::fmt;
use std::future::Future;
use std::iter::Sum;
use std::ops::Add;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Points awarded to a shelter for every successful claim.
pub const POINTS_PER_MATCH: u32 = 10;

/// Estimated CO2 avoided per rescued meal, in grams (0.76 kg).
pub const CARBON_GRAMS_PER_MEAL: u64 = 760;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Store-assigned donation identifier. Sequential, so id order is creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(pub u64);

/// Store-assigned shelter identifier. Sequential, so id order is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShelterId(pub u64);

/// Match identifier, generated by the coordinator before commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub uuid::Uuid);

impl MatchId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for DonationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ShelterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A point plus the free-text address it was given for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Location {
    #[must_use]
    pub fn new(point: GeoPoint, address: impl Into<String>) -> Self {
        Self { lat: point.lat, lng: point.lng, address: address.into() }
    }

    /// Coordinates without the address.
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint { lat: self.lat, lng: self.lng }
    }
}

// ---------------------------------------------------------------------------
// Carbon accounting unit
// ---------------------------------------------------------------------------

/// An amount of CO2, held as whole grams so sums never drift.
///
/// Converted to kilograms only for presentation. Serializes as kilograms
/// rounded to one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CarbonMass {
    grams: u64,
}

impl CarbonMass {
    pub const ZERO: Self = Self { grams: 0 };

    #[must_use]
    pub const fn from_grams(grams: u64) -> Self {
        Self { grams }
    }

    #[must_use]
    pub const fn grams(self) -> u64 {
        self.grams
    }

    /// Exact value in kilograms (every gram count below 2^53 is exact in `f64`).
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "gram totals stay far below 2^53")]
    pub fn kilograms(self) -> f64 {
        self.grams as f64 / 1000.0
    }

    /// Kilograms rounded half-up to one decimal, for display.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "gram totals stay far below 2^53")]
    pub fn display_kilograms(self) -> f64 {
        let tenths = self.grams.saturating_add(50) / 100;
        tenths as f64 / 10.0
    }
}

impl Add for CarbonMass {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { grams: self.grams.saturating_add(rhs.grams) }
    }
}

impl Sum for CarbonMass {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for CarbonMass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} kg", self.display_kilograms())
    }
}

impl Serialize for CarbonMass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.display_kilograms())
    }
}

// ---------------------------------------------------------------------------
// Donation
// ---------------------------------------------------------------------------

/// Lifecycle state of a donation. `Available -> Matched` happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Available,
    Matched,
}

impl DonationStatus {
    /// Stable lowercase name, as persisted and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Matched => "matched",
        }
    }

    /// Parse the persisted name; `None` for anything unknown.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "matched" => Some(Self::Matched),
            _ => None,
        }
    }
}

/// A posted batch of surplus meals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: DonationId,
    pub restaurant_name: String,
    pub food_type: String,
    /// Number of meals, always at least 1.
    pub quantity: u32,
    pub location: Location,
    pub expires_at: DateTime<Utc>,
    pub status: DonationStatus,
    pub carbon_saved: CarbonMass,
    pub created_at: DateTime<Utc>,
    pub meal_category: Option<String>,
    pub allergens: Vec<String>,
    pub dietary_info: Vec<String>,
    /// Shelter that claimed this donation; set together with `Matched`.
    pub claimed_by: Option<ShelterId>,
}

impl Donation {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == DonationStatus::Available
    }

    /// `true` once `now` has passed `expires_at`. Expired donations stay claimable.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Validated donation fields handed to [`Store::insert_donation`].
///
/// The store assigns the id; status starts at `Available`.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationDraft {
    pub restaurant_name: String,
    pub food_type: String,
    pub quantity: u32,
    pub location: Location,
    pub expires_at: DateTime<Utc>,
    pub carbon_saved: CarbonMass,
    pub created_at: DateTime<Utc>,
    pub meal_category: Option<String>,
    pub allergens: Vec<String>,
    pub dietary_info: Vec<String>,
}

// ---------------------------------------------------------------------------
// Shelter
// ---------------------------------------------------------------------------

/// A shelter that can claim donations. `name` is the unique business key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelter {
    pub id: ShelterId,
    pub name: String,
    /// People served.
    pub capacity: u32,
    pub location: Location,
    pub contact_phone: String,
    pub needs: String,
    /// Never decreases.
    pub points: u32,
}

/// Shelter fields handed to [`Store::insert_shelter`] / [`Store::upsert_shelter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShelterDraft {
    pub name: String,
    pub capacity: u32,
    pub location: Location,
    pub contact_phone: String,
    pub needs: String,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub points: u32,
}

/// A shelter annotated with its distance from a donation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedShelter {
    pub shelter: Shelter,
    pub distance_km: f64,
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// Pickup state of a match. Only the initial state exists in this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    PendingPickup,
}

impl MatchStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPickup => "pending_pickup",
        }
    }
}

/// Immutable record of a shelter accepting a donation.
///
/// Names, food type, quantity and carbon are a snapshot taken at match time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub donation_id: DonationId,
    pub shelter_id: ShelterId,
    pub restaurant_name: String,
    pub shelter_name: String,
    pub food_type: String,
    pub quantity: u32,
    pub carbon_saved: CarbonMass,
    pub matched_at: DateTime<Utc>,
    pub status: MatchStatus,
}

/// How the claiming shelter is identified inside [`ClaimCommit`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimTarget {
    /// A shelter known to exist.
    Existing(ShelterId),
    /// Find the shelter by `draft.name`, registering it from `draft` if absent.
    Register(ShelterDraft),
}

/// Everything [`Store::commit_claim`] applies as one all-or-nothing unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimCommit {
    pub match_id: MatchId,
    pub donation_id: DonationId,
    pub target: ClaimTarget,
    pub points: u32,
    pub matched_at: DateTime<Utc>,
}

/// Post-commit view of the three records a claim touched.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimReceipt {
    pub record: Match,
    pub donation: Donation,
    pub shelter: Shelter,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Platform-wide impact figures, derived on read and never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_donations: u64,
    pub total_meals_saved: u64,
    pub total_carbon_saved: CarbonMass,
    pub active_shelters: u64,
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Coarse outcome class shared by every engine error, used by transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; rejected before any mutation.
    Validation,
    /// A referenced donation or shelter does not exist.
    NotFound,
    /// Lost race or duplicate; state unchanged.
    Conflict,
    /// Persistence failed; the operation was rolled back.
    Storage,
}

/// Errors from the Store hexagonal port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No donation with this id.
    #[error("donation {0} not found")]
    DonationNotFound(DonationId),
    /// No shelter with this id.
    #[error("shelter {0} not found")]
    ShelterNotFound(ShelterId),
    /// The compare-and-set on donation status found it already matched.
    #[error("donation {0} is no longer available")]
    StatusConflict(DonationId),
    /// A shelter with this name is already registered.
    #[error("shelter name already registered: {name}")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },
    /// The backend failed; nothing was applied.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
}

impl StoreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DonationNotFound(_) | Self::ShelterNotFound(_) => ErrorKind::NotFound,
            Self::StatusConflict(_) | Self::DuplicateName { .. } => ErrorKind::Conflict,
            Self::Unavailable { .. } => ErrorKind::Storage,
        }
    }
}

/// Errors from the Notifier hexagonal port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    /// Message could not be delivered.
    #[error("delivery failed: {reason}")]
    DeliveryFailed {
        /// Human-readable description.
        reason: String,
    },
    /// The outbound channel is missing credentials or a sender.
    #[error("notifier not configured: {reason}")]
    NotConfigured {
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: authoritative storage for donations, shelters and matches.
///
/// Two guarantees are required of every implementation: the donation status
/// transition is a compare-and-set, and shelter point awards are atomic
/// increments. [`commit_claim`](Self::commit_claim) combines both with the
/// match append into a single all-or-nothing unit.
///
/// Futures are `Send` so the engine can run on a multi-threaded runtime.
pub trait Store: Send + Sync {
    /// Persist a new donation and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    fn insert_donation(
        &self,
        draft: DonationDraft,
    ) -> impl Future<Output = Result<Donation, StoreError>> + Send;

    /// Fetch one donation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    fn donation(
        &self,
        id: DonationId,
    ) -> impl Future<Output = Result<Option<Donation>, StoreError>> + Send;

    /// All donations, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    fn donations(&self) -> impl Future<Output = Result<Vec<Donation>, StoreError>> + Send;

    /// Compare-and-set the donation status from `Available` to `Matched`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DonationNotFound`], [`StoreError::StatusConflict`]
    /// when already matched, or [`StoreError::Unavailable`].
    fn mark_matched(
        &self,
        id: DonationId,
    ) -> impl Future<Output = Result<Donation, StoreError>> + Send;

    /// Register a shelter with zero points.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateName`] when the name is taken, or
    /// [`StoreError::Unavailable`].
    fn insert_shelter(
        &self,
        draft: ShelterDraft,
    ) -> impl Future<Output = Result<Shelter, StoreError>> + Send;

    /// Return the shelter named `draft.name`, registering it from `draft` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    fn upsert_shelter(
        &self,
        draft: ShelterDraft,
    ) -> impl Future<Output = Result<Shelter, StoreError>> + Send;

    /// Fetch one shelter by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    fn shelter(
        &self,
        id: ShelterId,
    ) -> impl Future<Output = Result<Option<Shelter>, StoreError>> + Send;

    /// Fetch one shelter by its exact name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    fn shelter_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Shelter>, StoreError>> + Send;

    /// All shelters, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    fn shelters(&self) -> impl Future<Output = Result<Vec<Shelter>, StoreError>> + Send;

    /// Atomically add `delta` to a shelter's points.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShelterNotFound`] or [`StoreError::Unavailable`].
    fn award_points(
        &self,
        id: ShelterId,
        delta: u32,
    ) -> impl Future<Output = Result<Shelter, StoreError>> + Send;

    /// All matches, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    fn matches(&self) -> impl Future<Output = Result<Vec<Match>, StoreError>> + Send;

    /// Apply a claim as one unit: status compare-and-set, optional shelter
    /// registration, points award and match append. On any error nothing is applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DonationNotFound`], [`StoreError::StatusConflict`],
    /// [`StoreError::ShelterNotFound`] for a missing `Existing` target, or
    /// [`StoreError::Unavailable`].
    fn commit_claim(
        &self,
        commit: ClaimCommit,
    ) -> impl Future<Output = Result<ClaimReceipt, StoreError>> + Send;
}

/// Hexagonal port: best-effort outbound message to a shelter's phone.
///
/// The coordinator calls `send` once per successful claim, after commit, and
/// never retries.
pub trait Notifier: Send + Sync {
    /// Deliver `message` to `phone`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::DeliveryFailed`] when the message cannot be delivered.
    fn send(
        &self,
        phone: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}
