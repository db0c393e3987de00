// Rust guideline compliant 2026-02-23

//! Impact accounting -- per-donation carbon savings and platform statistics.
//!
//! Entry points: [`carbon_saved`], [`compute_stats`], [`ImpactAccountant::stats`].
//!
//! Statistics are always aggregated on read from the authoritative donation
//! and shelter sets. No counter is ever incremented anywhere, so there is a
//! single source of truth and nothing to drift.

use domain::{CARBON_GRAMS_PER_MEAL, CarbonMass, Donation, DonationStatus, Shelter, Stats, Store, StoreError};

/// CO2 avoided by rescuing `quantity` meals: `quantity x 0.76 kg`, exact.
#[must_use]
pub fn carbon_saved(quantity: u32) -> CarbonMass {
    CarbonMass::from_grams(u64::from(quantity) * CARBON_GRAMS_PER_MEAL)
}

/// Aggregate [`Stats`] over the given records.
///
/// Meals and carbon count only matched donations; `total_donations` counts
/// every donation ever posted; `active_shelters` counts every shelter.
#[must_use]
pub fn compute_stats(donations: &[Donation], shelters: &[Shelter]) -> Stats {
    let matched = donations.iter().filter(|d| d.status == DonationStatus::Matched);
    let (meals, carbon) = matched.fold((0u64, CarbonMass::ZERO), |(meals, carbon), d| {
        (meals + u64::from(d.quantity), carbon + d.carbon_saved)
    });
    Stats {
        total_donations: donations.len() as u64,
        total_meals_saved: meals,
        total_carbon_saved: carbon,
        active_shelters: shelters.len() as u64,
    }
}

// ---------------------------------------------------------------------------
// ImpactAccountant
// ---------------------------------------------------------------------------

/// Reads the authoritative record sets from a `Store` port and aggregates them.
///
/// Stateless; the store is injected per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImpactAccountant;

impl ImpactAccountant {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Recompute platform statistics from the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when either record set cannot be read.
    pub async fn stats<S: Store>(&self, store: &S) -> Result<Stats, StoreError> {
        let donations = store.donations().await?;
        let shelters = store.shelters().await?;
        let stats = compute_stats(&donations, &shelters);
        tracing::debug!(
            total_donations = stats.total_donations,
            total_meals_saved = stats.total_meals_saved,
            total_carbon_grams = stats.total_carbon_saved.grams(),
            "impact.stats.computed"
        );
        Ok(stats)
    }
}
