// Rust guideline compliant 2026-02-23

//! Proximity ranking -- great-circle distance and nearest-shelter ordering.
//!
//! Entry points: [`distance_km`], [`rank`], [`rank_for_donation`].
//! Everything here is pure: inputs are borrowed and never mutated.

use domain::{Donation, GeoPoint, RankedShelter, Shelter};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two points, in kilometres.
///
/// Symmetric in its arguments and exactly `0.0` for identical points.
#[must_use]
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Order `shelters` by distance from `origin`, nearest first.
///
/// Equal distances keep ascending shelter-id order, so the output is fully
/// deterministic regardless of input order.
#[must_use]
pub fn rank(origin: GeoPoint, shelters: &[Shelter]) -> Vec<RankedShelter> {
    let mut ranked: Vec<RankedShelter> = shelters
        .iter()
        .map(|shelter| RankedShelter {
            distance_km: distance_km(origin, shelter.location.point()),
            shelter: shelter.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.shelter.id.cmp(&b.shelter.id))
    });
    ranked
}

/// [`rank`] from the donation's pickup location.
#[must_use]
pub fn rank_for_donation(donation: &Donation, shelters: &[Shelter]) -> Vec<RankedShelter> {
    rank(donation.location.point(), shelters)
}
