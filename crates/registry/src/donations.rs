// Rust guideline compliant 2026-02-23

//! Donation lifecycle: validated creation, listing and the single-claim transition.

use chrono::{DateTime, Duration, Utc};
use domain::{Donation, DonationDraft, DonationId, GeoPoint, Location, Store};

use crate::{RegistryConfig, RegistryError, Scatter, is_valid_point, required};

// ---------------------------------------------------------------------------
// DonationRequest
// ---------------------------------------------------------------------------

/// Unvalidated input for [`DonationRegistry::create`].
///
/// `quantity` and `expires_in_hours` are signed so that malformed input can be
/// represented and rejected rather than silently wrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationRequest {
    pub restaurant_name: String,
    pub food_type: String,
    pub quantity: i64,
    pub address: String,
    pub expires_in_hours: i64,
    /// Seeded randomly around the configured centre when `None`.
    pub coordinates: Option<GeoPoint>,
    pub meal_category: Option<String>,
    pub allergens: Vec<String>,
    pub dietary_info: Vec<String>,
}

impl DonationRequest {
    #[must_use]
    pub fn new(
        restaurant_name: impl Into<String>,
        food_type: impl Into<String>,
        quantity: i64,
        address: impl Into<String>,
        expires_in_hours: i64,
    ) -> Self {
        Self {
            restaurant_name: restaurant_name.into(),
            food_type: food_type.into(),
            quantity,
            address: address.into(),
            expires_in_hours,
            coordinates: None,
            meal_category: None,
            allergens: vec![],
            dietary_info: vec![],
        }
    }

    /// Pin the pickup point instead of seeding it.
    #[must_use]
    pub fn at(mut self, point: GeoPoint) -> Self {
        self.coordinates = Some(point);
        self
    }
}

// ---------------------------------------------------------------------------
// DonationRegistry
// ---------------------------------------------------------------------------

/// Validates and records donations through a `Store` port.
#[derive(Debug)]
pub struct DonationRegistry {
    config: RegistryConfig,
    scatter: Scatter,
}

impl DonationRegistry {
    #[must_use]
    pub fn new(config: &RegistryConfig) -> Self {
        let scatter = Scatter::new(config.center, config.spread_degrees, config.seed);
        Self { config: config.clone(), scatter }
    }

    /// Validate `request` and persist it as an `Available` donation created now.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for a non-positive quantity, a shelf
    /// life outside the configured window, blank names or invalid coordinates;
    /// [`RegistryError::Storage`] when the store fails.
    pub async fn create<S: Store>(
        &self,
        store: &S,
        request: DonationRequest,
    ) -> Result<Donation, RegistryError> {
        self.create_at(store, request, Utc::now()).await
    }

    /// [`create`](Self::create) with an explicit creation time.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub async fn create_at<S: Store>(
        &self,
        store: &S,
        request: DonationRequest,
        now: DateTime<Utc>,
    ) -> Result<Donation, RegistryError> {
        let draft = self.draft(request, now)?;
        let donation = store.insert_donation(draft).await?;
        tracing::info!(
            donation_id = %donation.id,
            quantity = donation.quantity,
            carbon_grams = donation.carbon_saved.grams(),
            "registry.donation.created"
        );
        Ok(donation)
    }

    fn draft(&self, request: DonationRequest, now: DateTime<Utc>) -> Result<DonationDraft, RegistryError> {
        let restaurant_name = required("restaurant name", &request.restaurant_name)?;
        let food_type = required("food type", &request.food_type)?;

        if request.quantity <= 0 {
            return Err(RegistryError::validation("quantity must be a positive number of meals"));
        }
        let quantity = u32::try_from(request.quantity)
            .map_err(|e| RegistryError::validation(format!("quantity too large: {e}")))?;

        let (min, max) = (self.config.min_expiry_hours, self.config.max_expiry_hours);
        if request.expires_in_hours < i64::from(min) || request.expires_in_hours > i64::from(max) {
            return Err(RegistryError::validation(format!(
                "expires_in_hours must be between {min} and {max}, got {}",
                request.expires_in_hours
            )));
        }

        let point = match request.coordinates {
            Some(p) if is_valid_point(p) => p,
            Some(_) => return Err(RegistryError::validation("coordinates out of range")),
            None => self.scatter.next_point(),
        };

        Ok(DonationDraft {
            restaurant_name,
            food_type,
            quantity,
            location: Location::new(point, request.address.trim()),
            expires_at: now + Duration::hours(request.expires_in_hours),
            carbon_saved: impact::carbon_saved(quantity),
            created_at: now,
            meal_category: request.meal_category.filter(|c| !c.trim().is_empty()),
            allergens: request.allergens,
            dietary_info: request.dietary_info,
        })
    }

    /// Donations still open for claims, most recently created first.
    ///
    /// Expired donations are included; expiry never closes a donation.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] when the store fails.
    pub async fn list_available<S: Store>(&self, store: &S) -> Result<Vec<Donation>, RegistryError> {
        let mut available: Vec<Donation> =
            store.donations().await?.into_iter().filter(Donation::is_available).collect();
        available.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(available)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::DonationNotFound`] when absent, or
    /// [`RegistryError::Storage`].
    pub async fn get_by_id<S: Store>(&self, store: &S, id: DonationId) -> Result<Donation, RegistryError> {
        store.donation(id).await?.ok_or(RegistryError::DonationNotFound(id))
    }

    /// Atomically flip the donation to `Matched`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyMatched`] if another caller got there
    /// first, [`RegistryError::DonationNotFound`], or [`RegistryError::Storage`].
    pub async fn mark_matched<S: Store>(&self, store: &S, id: DonationId) -> Result<Donation, RegistryError> {
        let donation = store.mark_matched(id).await?;
        tracing::info!(donation_id = %id, "registry.donation.matched");
        Ok(donation)
    }
}
