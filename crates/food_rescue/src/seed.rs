// Rust guideline compliant 2026-02-23

//! Demo data: two San Francisco restaurants and two shelters.

use domain::{GeoPoint, Store};
use registry::{DonationRegistry, DonationRequest, RegistryError, ShelterProfile, ShelterRegistry};

fn sample_donations() -> [DonationRequest; 2] {
    [
        DonationRequest::new(
            "Tony's Pizza Palace",
            "Pizza, Pasta",
            20,
            "123 Market St, San Francisco, CA",
            4,
        )
        .at(GeoPoint::new(37.7749, -122.4194)),
        DonationRequest::new(
            "Green Leaf Bistro",
            "Salads, Sandwiches",
            15,
            "456 Mission St, San Francisco, CA",
            3,
        )
        .at(GeoPoint::new(37.7849, -122.4094)),
    ]
}

/// Shelters with the points they start with.
fn sample_shelters() -> [(ShelterProfile, u32); 2] {
    [
        (
            ShelterProfile::named("Hope Center")
                .capacity(50)
                .contact_phone("+1234567890")
                .needs("Any food welcome")
                .located(GeoPoint::new(37.7739, -122.4312), "789 Howard St, San Francisco, CA"),
            145,
        ),
        (
            ShelterProfile::named("Community Care Shelter")
                .capacity(80)
                .contact_phone("+1234567891")
                .needs("Hot meals preferred")
                .located(GeoPoint::new(37.7839, -122.4212), "321 Folsom St, San Francisco, CA"),
            230,
        ),
    ]
}

/// Insert the sample records unless the store already holds data.
///
/// Returns `false` when seeding was skipped.
///
/// # Errors
///
/// Returns [`RegistryError`] when any insert fails.
pub async fn seed_sample_data<S: Store>(
    store: &S,
    donations: &DonationRegistry,
    shelters: &ShelterRegistry,
) -> Result<bool, RegistryError> {
    if !store.donations().await?.is_empty() || !store.shelters().await?.is_empty() {
        tracing::info!("seed.skipped: store is not empty");
        return Ok(false);
    }
    for request in sample_donations() {
        donations.create(store, request).await?;
    }
    for (profile, points) in sample_shelters() {
        let shelter = shelters.create(store, profile).await?;
        shelters.award_points(store, shelter.id, points).await?;
    }
    tracing::info!("seed.done");
    Ok(true)
}
