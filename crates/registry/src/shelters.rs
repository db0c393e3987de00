// Rust guideline compliant 2026-02-23

//! Shelter records, upsert-by-name and the points ledger.

use domain::{GeoPoint, LeaderboardEntry, Location, Shelter, ShelterDraft, ShelterId, Store};

use crate::{RegistryConfig, RegistryError, Scatter, is_valid_point, required};

/// Needs recorded for shelters registered by name only.
pub const DEFAULT_NEEDS: &str = "Any food welcome";

// ---------------------------------------------------------------------------
// ShelterProfile
// ---------------------------------------------------------------------------

/// Unvalidated shelter fields for [`ShelterRegistry::create`] and
/// [`ShelterRegistry::upsert_by_name`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShelterProfile {
    pub name: String,
    pub capacity: u32,
    pub contact_phone: String,
    pub needs: String,
    pub address: String,
    /// Seeded randomly around the configured centre when `None`.
    pub coordinates: Option<GeoPoint>,
}

impl ShelterProfile {
    /// Profile with the defaults used for lazy registration on first claim:
    /// zero capacity, no phone, [`DEFAULT_NEEDS`], no address, seeded location.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: 0,
            contact_phone: String::new(),
            needs: DEFAULT_NEEDS.to_owned(),
            address: String::new(),
            coordinates: None,
        }
    }

    #[must_use]
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn contact_phone(mut self, phone: impl Into<String>) -> Self {
        self.contact_phone = phone.into();
        self
    }

    #[must_use]
    pub fn needs(mut self, needs: impl Into<String>) -> Self {
        self.needs = needs.into();
        self
    }

    #[must_use]
    pub fn located(mut self, point: GeoPoint, address: impl Into<String>) -> Self {
        self.coordinates = Some(point);
        self.address = address.into();
        self
    }
}

// ---------------------------------------------------------------------------
// ShelterRegistry
// ---------------------------------------------------------------------------

/// Registers shelters and keeps their points through a `Store` port.
#[derive(Debug)]
pub struct ShelterRegistry {
    scatter: Scatter,
}

impl ShelterRegistry {
    #[must_use]
    pub fn new(config: &RegistryConfig) -> Self {
        Self { scatter: Scatter::new(config.center, config.spread_degrees, config.seed) }
    }

    /// Validate `profile` and resolve its location into a storable draft.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for a blank name or invalid coordinates.
    pub fn draft(&self, profile: ShelterProfile) -> Result<ShelterDraft, RegistryError> {
        let name = required("shelter name", &profile.name)?;
        let point = match profile.coordinates {
            Some(p) if is_valid_point(p) => p,
            Some(_) => return Err(RegistryError::validation("coordinates out of range")),
            None => self.scatter.next_point(),
        };
        Ok(ShelterDraft {
            name,
            capacity: profile.capacity,
            location: Location::new(point, profile.address.trim()),
            contact_phone: profile.contact_phone.trim().to_owned(),
            needs: profile.needs,
        })
    }

    /// Register a new shelter with zero points.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`], [`RegistryError::DuplicateShelter`]
    /// when the name is taken, or [`RegistryError::Storage`].
    pub async fn create<S: Store>(&self, store: &S, profile: ShelterProfile) -> Result<Shelter, RegistryError> {
        let shelter = store.insert_shelter(self.draft(profile)?).await?;
        tracing::info!(shelter_id = %shelter.id, name = %shelter.name, "registry.shelter.created");
        Ok(shelter)
    }

    /// Return the shelter with `profile.name`, registering it if it does not exist.
    ///
    /// Never fails for a well-formed name: a concurrent registration of the
    /// same name resolves to the same shelter.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for a blank name, or [`RegistryError::Storage`].
    pub async fn upsert_by_name<S: Store>(
        &self,
        store: &S,
        profile: ShelterProfile,
    ) -> Result<Shelter, RegistryError> {
        let draft = self.draft(profile)?;
        if let Some(existing) = store.shelter_by_name(&draft.name).await? {
            return Ok(existing);
        }
        let shelter = store.upsert_shelter(draft).await?;
        tracing::info!(shelter_id = %shelter.id, name = %shelter.name, "registry.shelter.upserted");
        Ok(shelter)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::ShelterNotFound`] when absent, or [`RegistryError::Storage`].
    pub async fn get_by_id<S: Store>(&self, store: &S, id: ShelterId) -> Result<Shelter, RegistryError> {
        store.shelter(id).await?.ok_or(RegistryError::ShelterNotFound(id))
    }

    /// Exact-name lookup; surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] when the store fails.
    pub async fn get_by_name<S: Store>(&self, store: &S, name: &str) -> Result<Option<Shelter>, RegistryError> {
        Ok(store.shelter_by_name(name.trim()).await?)
    }

    /// All shelters in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] when the store fails.
    pub async fn list<S: Store>(&self, store: &S) -> Result<Vec<Shelter>, RegistryError> {
        Ok(store.shelters().await?)
    }

    /// Atomically add `delta` points.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ShelterNotFound`] or [`RegistryError::Storage`].
    pub async fn award_points<S: Store>(
        &self,
        store: &S,
        id: ShelterId,
        delta: u32,
    ) -> Result<Shelter, RegistryError> {
        let shelter = store.award_points(id, delta).await?;
        tracing::debug!(shelter_id = %id, delta, points = shelter.points, "registry.shelter.points_awarded");
        Ok(shelter)
    }

    /// Shelters by points, highest first; ties keep registration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] when the store fails.
    pub async fn leaderboard<S: Store>(&self, store: &S) -> Result<Vec<LeaderboardEntry>, RegistryError> {
        let mut shelters = store.shelters().await?;
        shelters.sort_by_key(|s| s.id);
        // Stable sort: equal points stay in id (registration) order.
        shelters.sort_by(|a, b| b.points.cmp(&a.points));
        Ok(shelters
            .into_iter()
            .map(|s| LeaderboardEntry { name: s.name, points: s.points })
            .collect())
    }
}
