// Rust guideline compliant 2026-02-16

//! In-memory adapter for the `Store` port.
//!
//! Backs the default binary and every component test. All state sits behind a
//! single `std::sync::Mutex`; each operation takes the lock once, checks, then
//! mutates, and never holds it across an `.await`. That makes the donation
//! status compare-and-set and [`Store::commit_claim`] serializable.
//! A poisoned lock surfaces as `StoreError::Unavailable`.

use std::sync::{Mutex, MutexGuard};

use domain::{
    ClaimCommit, ClaimReceipt, ClaimTarget, Donation, DonationDraft, DonationId, DonationStatus,
    Match, MatchStatus, Shelter, ShelterDraft, ShelterId, Store, StoreError,
};

// ---------------------------------------------------------------------------
// Inner state
// ---------------------------------------------------------------------------

/// Record sets in id order; ids are `position + 1`.
#[derive(Debug, Default)]
struct Inner {
    donations: Vec<Donation>,
    shelters: Vec<Shelter>,
    matches: Vec<Match>,
}

impl Inner {
    fn donation_index(&self, id: DonationId) -> Option<usize> {
        self.donations.iter().position(|d| d.id == id)
    }

    fn shelter_index(&self, id: ShelterId) -> Option<usize> {
        self.shelters.iter().position(|s| s.id == id)
    }

    fn shelter_index_by_name(&self, name: &str) -> Option<usize> {
        self.shelters.iter().position(|s| s.name == name)
    }

    fn next_shelter(&self, draft: ShelterDraft) -> Shelter {
        Shelter {
            id: ShelterId(self.shelters.len() as u64 + 1),
            name: draft.name,
            capacity: draft.capacity,
            location: draft.location,
            contact_phone: draft.contact_phone,
            needs: draft.needs,
            points: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

/// `Store` adapter holding donations, shelters and matches in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|e| {
            tracing::error!("memory_store.lock: {e}");
            StoreError::Unavailable { reason: "state lock poisoned".to_owned() }
        })
    }
}

impl Store for InMemoryStore {
    async fn insert_donation(&self, draft: DonationDraft) -> Result<Donation, StoreError> {
        let mut inner = self.lock()?;
        let donation = Donation {
            id: DonationId(inner.donations.len() as u64 + 1),
            restaurant_name: draft.restaurant_name,
            food_type: draft.food_type,
            quantity: draft.quantity,
            location: draft.location,
            expires_at: draft.expires_at,
            status: DonationStatus::Available,
            carbon_saved: draft.carbon_saved,
            created_at: draft.created_at,
            meal_category: draft.meal_category,
            allergens: draft.allergens,
            dietary_info: draft.dietary_info,
            claimed_by: None,
        };
        inner.donations.push(donation.clone());
        Ok(donation)
    }

    async fn donation(&self, id: DonationId) -> Result<Option<Donation>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.donation_index(id).map(|i| inner.donations[i].clone()))
    }

    async fn donations(&self) -> Result<Vec<Donation>, StoreError> {
        Ok(self.lock()?.donations.clone())
    }

    /// Compare-and-set under the lock: check and write happen in one critical section.
    async fn mark_matched(&self, id: DonationId) -> Result<Donation, StoreError> {
        let mut inner = self.lock()?;
        let i = inner.donation_index(id).ok_or(StoreError::DonationNotFound(id))?;
        let donation = &mut inner.donations[i];
        if donation.status != DonationStatus::Available {
            return Err(StoreError::StatusConflict(id));
        }
        donation.status = DonationStatus::Matched;
        Ok(donation.clone())
    }

    async fn insert_shelter(&self, draft: ShelterDraft) -> Result<Shelter, StoreError> {
        let mut inner = self.lock()?;
        if inner.shelter_index_by_name(&draft.name).is_some() {
            return Err(StoreError::DuplicateName { name: draft.name });
        }
        let shelter = inner.next_shelter(draft);
        inner.shelters.push(shelter.clone());
        Ok(shelter)
    }

    async fn upsert_shelter(&self, draft: ShelterDraft) -> Result<Shelter, StoreError> {
        let mut inner = self.lock()?;
        if let Some(i) = inner.shelter_index_by_name(&draft.name) {
            return Ok(inner.shelters[i].clone());
        }
        let shelter = inner.next_shelter(draft);
        inner.shelters.push(shelter.clone());
        Ok(shelter)
    }

    async fn shelter(&self, id: ShelterId) -> Result<Option<Shelter>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.shelter_index(id).map(|i| inner.shelters[i].clone()))
    }

    async fn shelter_by_name(&self, name: &str) -> Result<Option<Shelter>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.shelter_index_by_name(name).map(|i| inner.shelters[i].clone()))
    }

    async fn shelters(&self) -> Result<Vec<Shelter>, StoreError> {
        Ok(self.lock()?.shelters.clone())
    }

    async fn award_points(&self, id: ShelterId, delta: u32) -> Result<Shelter, StoreError> {
        let mut inner = self.lock()?;
        let i = inner.shelter_index(id).ok_or(StoreError::ShelterNotFound(id))?;
        let shelter = &mut inner.shelters[i];
        shelter.points = shelter.points.saturating_add(delta);
        Ok(shelter.clone())
    }

    async fn matches(&self) -> Result<Vec<Match>, StoreError> {
        Ok(self.lock()?.matches.clone())
    }

    /// Every check runs before the first write, so an error leaves state untouched.
    async fn commit_claim(&self, commit: ClaimCommit) -> Result<ClaimReceipt, StoreError> {
        let mut inner = self.lock()?;

        let d = inner
            .donation_index(commit.donation_id)
            .ok_or(StoreError::DonationNotFound(commit.donation_id))?;
        if inner.donations[d].status != DonationStatus::Available {
            return Err(StoreError::StatusConflict(commit.donation_id));
        }

        let s = match commit.target {
            ClaimTarget::Existing(id) => {
                inner.shelter_index(id).ok_or(StoreError::ShelterNotFound(id))?
            }
            ClaimTarget::Register(draft) => match inner.shelter_index_by_name(&draft.name) {
                Some(s) => s,
                None => {
                    let shelter = inner.next_shelter(draft);
                    tracing::debug!(shelter_id = %shelter.id, "memory_store.shelter.registered");
                    inner.shelters.push(shelter);
                    inner.shelters.len() - 1
                }
            },
        };

        let shelter = &mut inner.shelters[s];
        shelter.points = shelter.points.saturating_add(commit.points);
        let shelter = shelter.clone();

        let donation = &mut inner.donations[d];
        donation.status = DonationStatus::Matched;
        donation.claimed_by = Some(shelter.id);
        let donation = donation.clone();

        let record = Match {
            id: commit.match_id,
            donation_id: donation.id,
            shelter_id: shelter.id,
            restaurant_name: donation.restaurant_name.clone(),
            shelter_name: shelter.name.clone(),
            food_type: donation.food_type.clone(),
            quantity: donation.quantity,
            carbon_saved: donation.carbon_saved,
            matched_at: commit.matched_at,
            status: MatchStatus::PendingPickup,
        };
        inner.matches.push(record.clone());

        Ok(ClaimReceipt { record, donation, shelter })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::InMemoryStore;
    use domain::{
        CarbonMass, ClaimCommit, ClaimTarget, DonationDraft, DonationId, DonationStatus, GeoPoint,
        Location, MatchId, ShelterDraft, ShelterId, Store as _, StoreError,
    };
    use std::sync::Arc;

    fn make_draft(quantity: u32) -> DonationDraft {
        let now = chrono::Utc::now();
        DonationDraft {
            restaurant_name: "Tony's Pizza Palace".to_owned(),
            food_type: "Pizza, Pasta".to_owned(),
            quantity,
            location: Location::new(GeoPoint::new(37.7749, -122.4194), "123 Market St"),
            expires_at: now + chrono::Duration::hours(4),
            carbon_saved: CarbonMass::from_grams(u64::from(quantity) * 760),
            created_at: now,
            meal_category: None,
            allergens: vec![],
            dietary_info: vec![],
        }
    }

    fn make_shelter(name: &str) -> ShelterDraft {
        ShelterDraft {
            name: name.to_owned(),
            capacity: 50,
            location: Location::new(GeoPoint::new(37.7739, -122.4312), "789 Howard St"),
            contact_phone: "+1234567890".to_owned(),
            needs: "Any food welcome".to_owned(),
        }
    }

    fn claim(donation_id: DonationId, target: ClaimTarget) -> ClaimCommit {
        ClaimCommit {
            match_id: MatchId::new_v4(),
            donation_id,
            target,
            points: 10,
            matched_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let store = InMemoryStore::new();
        let a = store.insert_donation(make_draft(1)).await.unwrap();
        let b = store.insert_donation(make_draft(2)).await.unwrap();
        assert_eq!(a.id, DonationId(1));
        assert_eq!(b.id, DonationId(2));
        assert_eq!(a.status, DonationStatus::Available);
        assert!(a.claimed_by.is_none());
    }

    #[tokio::test]
    async fn mark_matched_is_compare_and_set() {
        let store = InMemoryStore::new();
        let d = store.insert_donation(make_draft(5)).await.unwrap();
        let matched = store.mark_matched(d.id).await.unwrap();
        assert_eq!(matched.status, DonationStatus::Matched);
        assert_eq!(store.mark_matched(d.id).await, Err(StoreError::StatusConflict(d.id)));
        assert_eq!(
            store.mark_matched(DonationId(99)).await,
            Err(StoreError::DonationNotFound(DonationId(99)))
        );
    }

    #[tokio::test]
    async fn duplicate_shelter_name_rejected() {
        let store = InMemoryStore::new();
        store.insert_shelter(make_shelter("Hope Center")).await.unwrap();
        let result = store.insert_shelter(make_shelter("Hope Center")).await;
        assert!(
            matches!(result, Err(StoreError::DuplicateName { ref name }) if name == "Hope Center"),
            "expected DuplicateName, got {result:?}"
        );
    }

    #[tokio::test]
    async fn upsert_returns_existing() {
        let store = InMemoryStore::new();
        let first = store.upsert_shelter(make_shelter("Hope Center")).await.unwrap();
        let second = store.upsert_shelter(make_shelter("Hope Center")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.shelters().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn award_points_accumulates() {
        let store = InMemoryStore::new();
        let s = store.insert_shelter(make_shelter("Hope Center")).await.unwrap();
        store.award_points(s.id, 10).await.unwrap();
        let s = store.award_points(s.id, 10).await.unwrap();
        assert_eq!(s.points, 20);
        assert_eq!(
            store.award_points(ShelterId(42), 10).await,
            Err(StoreError::ShelterNotFound(ShelterId(42)))
        );
    }

    #[tokio::test]
    async fn commit_claim_applies_all_three_writes() {
        let store = InMemoryStore::new();
        let d = store.insert_donation(make_draft(20)).await.unwrap();
        let receipt =
            store.commit_claim(claim(d.id, ClaimTarget::Register(make_shelter("Hope Center")))).await.unwrap();

        assert_eq!(receipt.donation.status, DonationStatus::Matched);
        assert_eq!(receipt.donation.claimed_by, Some(receipt.shelter.id));
        assert_eq!(receipt.shelter.points, 10);
        assert_eq!(receipt.record.shelter_name, "Hope Center");
        assert_eq!(receipt.record.quantity, 20);
        assert_eq!(store.matches().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_commit_leaves_state_untouched() {
        let store = InMemoryStore::new();
        let d = store.insert_donation(make_draft(20)).await.unwrap();

        let missing = store.commit_claim(claim(d.id, ClaimTarget::Existing(ShelterId(7)))).await;
        assert_eq!(missing.unwrap_err(), StoreError::ShelterNotFound(ShelterId(7)));
        assert_eq!(store.donation(d.id).await.unwrap().unwrap().status, DonationStatus::Available);
        assert!(store.matches().await.unwrap().is_empty());

        store.mark_matched(d.id).await.unwrap();
        let conflict =
            store.commit_claim(claim(d.id, ClaimTarget::Register(make_shelter("Late Shelter")))).await;
        assert_eq!(conflict.unwrap_err(), StoreError::StatusConflict(d.id));
        // The losing claim must not leave a freshly registered shelter behind.
        assert!(store.shelters().await.unwrap().is_empty());
        assert!(store.matches().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_commits_have_one_winner() {
        let store = Arc::new(InMemoryStore::new());
        let d = store.insert_donation(make_draft(20)).await.unwrap();
        let s = store.insert_shelter(make_shelter("Hope Center")).await.unwrap();
        let (donation_id, shelter_id) = (d.id, s.id);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.commit_claim(claim(donation_id, ClaimTarget::Existing(shelter_id))).await
                })
            })
            .collect();

        let mut wins = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => wins += 1,
                Err(e) => assert_eq!(e, StoreError::StatusConflict(d.id)),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.shelter(s.id).await.unwrap().unwrap().points, 10);
        assert_eq!(store.matches().await.unwrap().len(), 1);
    }
}
