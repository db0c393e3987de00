// Rust guideline compliant 2026-02-23

//! Random coordinate seeding for records created without coordinates.
//!
//! Free-text addresses are never geocoded; instead a point is drawn uniformly
//! from a square around the configured centre.

use std::sync::{Mutex, PoisonError};

use domain::GeoPoint;
use rand::{Rng as _, SeedableRng, rngs::StdRng};

/// Draws points uniformly within `spread_degrees` of `center`.
#[derive(Debug)]
pub struct Scatter {
    center: GeoPoint,
    spread_degrees: f64,
    /// Shared across request handlers, hence a mutex rather than a `RefCell`.
    rng: Mutex<StdRng>,
}

impl Scatter {
    /// Create a scatter seeded from `seed`, or from the OS when `None`.
    #[must_use]
    pub fn new(center: GeoPoint, spread_degrees: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { center, spread_degrees, rng: Mutex::new(rng) }
    }

    /// Next random point, clamped to valid latitude/longitude.
    pub fn next_point(&self) -> GeoPoint {
        // RNG state cannot be left inconsistent by a panic; keep using it.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let s = self.spread_degrees;
        let dlat = rng.random_range(-s..=s);
        let dlng = rng.random_range(-s..=s);
        GeoPoint::new(
            (self.center.lat + dlat).clamp(-90.0, 90.0),
            (self.center.lng + dlng).clamp(-180.0, 180.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_stay_within_spread() {
        let center = GeoPoint::new(37.7749, -122.4194);
        let scatter = Scatter::new(center, 0.05, Some(7));
        for _ in 0..200 {
            let p = scatter.next_point();
            assert!((p.lat - center.lat).abs() <= 0.05 + 1e-12);
            assert!((p.lng - center.lng).abs() <= 0.05 + 1e-12);
        }
    }

    #[test]
    fn seeded_scatter_is_deterministic() {
        let a = Scatter::new(GeoPoint::new(0.0, 0.0), 1.0, Some(42));
        let b = Scatter::new(GeoPoint::new(0.0, 0.0), 1.0, Some(42));
        for _ in 0..10 {
            assert_eq!(a.next_point(), b.next_point());
        }
    }

    #[test]
    fn zero_spread_returns_center() {
        let center = GeoPoint::new(44.98, -93.27);
        let scatter = Scatter::new(center, 0.0, Some(1));
        assert_eq!(scatter.next_point(), center);
    }

    #[test]
    fn clamps_near_the_pole() {
        let scatter = Scatter::new(GeoPoint::new(89.99, 179.99), 0.5, Some(3));
        for _ in 0..50 {
            let p = scatter.next_point();
            assert!(p.lat <= 90.0 && p.lng <= 180.0);
        }
    }
}
