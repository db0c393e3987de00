// Rust guideline compliant 2026-02-23

//! Match coordinator -- the claim state machine.
//!
//! A donation moves `Available -> Matched` exactly once. [`MatchCoordinator::claim`]
//! checks the request, hands the status compare-and-set, the points award and
//! the match append to the store as one unit, then notifies the shelter in a
//! tracked background task that can never fail or delay the claim.
//!
//! Entry points: [`MatchCoordinator::claim`], [`MatchCoordinator::rank_shelters`],
//! [`MatchCoordinator::history`], [`MatchCoordinator::shutdown`].
//! Configuration via [`CoordinatorConfig::builder`].

use std::time::Duration;

use chrono::Utc;
use domain::{
    ClaimCommit, ClaimReceipt, ClaimTarget, Donation, DonationId, ErrorKind, Match, MatchId,
    Notifier, POINTS_PER_MATCH, RankedShelter, ShelterId, Store, StoreError,
};
use registry::{DonationRegistry, RegistryConfig, RegistryError, ShelterProfile, ShelterRegistry};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

// ---------------------------------------------------------------------------
// CoordinatorError
// ---------------------------------------------------------------------------

/// Errors that can occur while coordinating a claim.
///
/// Notification failures never appear here; they are logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    /// The supplied configuration is invalid.
    #[error("invalid coordinator configuration: {reason}")]
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
    /// The donation was already claimed, possibly by a concurrent request.
    #[error("donation {0} has already been claimed")]
    Conflict(DonationId),
    #[error("shelter name already registered: {0}")]
    DuplicateShelter(String),
    /// The store failed and the claim was rolled back.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl CoordinatorError {
    /// Outcome class for transports.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. } | Self::Validation { .. } => ErrorKind::Validation,
            Self::DonationNotFound(_) | Self::ShelterNotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) | Self::DuplicateShelter(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<RegistryError> for CoordinatorError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::InvalidConfig { reason } => Self::InvalidConfig { reason },
            RegistryError::Validation { reason } => Self::Validation { reason },
            RegistryError::DonationNotFound(id) => Self::DonationNotFound(id),
            RegistryError::ShelterNotFound(id) => Self::ShelterNotFound(id),
            RegistryError::AlreadyMatched(id) => Self::Conflict(id),
            RegistryError::DuplicateShelter(name) => Self::DuplicateShelter(name),
            RegistryError::Storage(e) => Self::Storage(e),
        }
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(e: StoreError) -> Self {
        RegistryError::from(e).into()
    }
}

// ---------------------------------------------------------------------------
// CoordinatorConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`MatchCoordinator`].
///
/// Construct via [`CoordinatorConfig::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Upper bound on a single notification attempt.
    pub notify_timeout: Duration,
    /// When `false`, claims commit without notifying anyone.
    pub notifications: bool,
}

/// Builder for [`CoordinatorConfig`].
///
/// Obtain via [`CoordinatorConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct CoordinatorConfigBuilder {
    notify_timeout: Duration,
    notifications: bool,
}

impl CoordinatorConfig {
    /// Create a builder.
    ///
    /// Default values: `notify_timeout = 10 s`, `notifications = true`.
    #[must_use]
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder { notify_timeout: Duration::from_secs(10), notifications: true }
    }
}

impl CoordinatorConfigBuilder {
    #[must_use]
    pub fn notify_timeout(mut self, notify_timeout: Duration) -> Self {
        self.notify_timeout = notify_timeout;
        self
    }

    /// Turn shelter notifications on or off.
    #[must_use]
    pub fn notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidConfig`] when `notify_timeout` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<CoordinatorConfig, CoordinatorError> {
        if self.notify_timeout.is_zero() {
            return Err(CoordinatorError::InvalidConfig {
                reason: "notify_timeout must be > 0".to_owned(),
            });
        }
        Ok(CoordinatorConfig { notify_timeout: self.notify_timeout, notifications: self.notifications })
    }
}

// ---------------------------------------------------------------------------
// ShelterRef
// ---------------------------------------------------------------------------

/// Who is claiming: a registered shelter, or a name to find or register.
#[derive(Debug, Clone, PartialEq)]
pub enum ShelterRef {
    Id(ShelterId),
    /// Resolved by name; registered from the profile if unknown.
    Name(ShelterProfile),
}

impl ShelterRef {
    /// Name reference with default registration fields.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Name(ShelterProfile::named(name))
    }
}

/// SMS body sent to the claiming shelter.
#[must_use]
pub fn pickup_message(donation: &Donation) -> String {
    format!(
        "New food donation matched! {} meals of {} from {}. Location: {}. Pickup before {}.",
        donation.quantity,
        donation.food_type,
        donation.restaurant_name,
        donation.location.address,
        donation.expires_at.format("%H:%M UTC"),
    )
}

// ---------------------------------------------------------------------------
// MatchCoordinator
// ---------------------------------------------------------------------------

/// Orchestrates claims over the two registries.
///
/// Generic methods take the `Store` and `Notifier` ports per call. The only
/// state owned here is the set of in-flight notification tasks.
#[derive(Debug)]
pub struct MatchCoordinator {
    config: CoordinatorConfig,
    donations: DonationRegistry,
    shelters: ShelterRegistry,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl MatchCoordinator {
    #[must_use]
    pub fn new(config: CoordinatorConfig, registry_config: &RegistryConfig) -> Self {
        Self {
            config,
            donations: DonationRegistry::new(registry_config),
            shelters: ShelterRegistry::new(registry_config),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn donations(&self) -> &DonationRegistry {
        &self.donations
    }

    #[must_use]
    pub fn shelters(&self) -> &ShelterRegistry {
        &self.shelters
    }

    /// Claim `donation_id` for `shelter` and return the new match.
    ///
    /// Lookups and validation run before anything is written. The status
    /// compare-and-set, the optional shelter registration, the
    /// [`POINTS_PER_MATCH`] award and the match append are one store unit, so a
    /// losing concurrent claim changes nothing. The shelter is then notified
    /// in the background; that outcome is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::DonationNotFound`],
    /// [`CoordinatorError::Conflict`] when the donation is no longer available,
    /// [`CoordinatorError::ShelterNotFound`] for an unknown explicit id,
    /// [`CoordinatorError::Validation`] for a blank shelter name, or
    /// [`CoordinatorError::Storage`] when the commit fails.
    pub async fn claim<S, N>(
        &self,
        store: &S,
        notifier: &N,
        donation_id: DonationId,
        shelter: ShelterRef,
    ) -> Result<Match, CoordinatorError>
    where
        S: Store,
        N: Notifier + Clone + 'static,
    {
        let donation = self.donations.get_by_id(store, donation_id).await?;
        if !donation.is_available() {
            tracing::info!(donation_id = %donation_id, "coordinator.claim.rejected: already matched");
            return Err(CoordinatorError::Conflict(donation_id));
        }

        let target = match shelter {
            ShelterRef::Id(id) => ClaimTarget::Existing(self.shelters.get_by_id(store, id).await?.id),
            ShelterRef::Name(profile) => {
                let draft = self.shelters.draft(profile)?;
                match self.shelters.get_by_name(store, &draft.name).await? {
                    Some(existing) => ClaimTarget::Existing(existing.id),
                    None => ClaimTarget::Register(draft),
                }
            }
        };

        let commit = ClaimCommit {
            match_id: MatchId::new_v4(),
            donation_id,
            target,
            points: POINTS_PER_MATCH,
            matched_at: Utc::now(),
        };
        let receipt = store.commit_claim(commit).await.map_err(|e| {
            if matches!(e, StoreError::Unavailable { .. }) {
                tracing::error!(donation_id = %donation_id, error = %e, "coordinator.claim.rolled_back");
            } else {
                tracing::info!(donation_id = %donation_id, error = %e, "coordinator.claim.rejected");
            }
            CoordinatorError::from(e)
        })?;

        tracing::info!(
            match_id = %receipt.record.id,
            donation_id = %donation_id,
            shelter_id = %receipt.shelter.id,
            points = receipt.shelter.points,
            "coordinator.claim.committed"
        );

        self.notify(notifier, &receipt);
        Ok(receipt.record)
    }

    /// Spawn the best-effort shelter notification for a committed claim.
    fn notify<N: Notifier + Clone + 'static>(&self, notifier: &N, receipt: &ClaimReceipt) {
        let match_id = receipt.record.id;
        if !self.config.notifications {
            return;
        }
        if receipt.shelter.contact_phone.is_empty() {
            tracing::debug!(match_id = %match_id, "coordinator.notify.skipped: no contact phone");
            return;
        }

        let notifier = notifier.clone();
        let phone = receipt.shelter.contact_phone.clone();
        let message = pickup_message(&receipt.donation);
        let timeout = self.config.notify_timeout;
        let cancelled = self.shutdown.clone();

        self.tasks.spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {
                    tracing::debug!(match_id = %match_id, "coordinator.notify.cancelled");
                }
                result = tokio::time::timeout(timeout, notifier.send(&phone, &message)) => match result {
                    Ok(Ok(())) => tracing::info!(match_id = %match_id, "coordinator.notify.sent"),
                    Ok(Err(e)) => {
                        tracing::warn!(match_id = %match_id, error = %e, "coordinator.notify.failed");
                    }
                    Err(elapsed) => {
                        tracing::warn!(match_id = %match_id, error = %elapsed, "coordinator.notify.timed_out");
                    }
                },
            }
        });
    }

    /// Shelters ordered by distance from the donation, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::DonationNotFound`] or [`CoordinatorError::Storage`].
    pub async fn rank_shelters<S: Store>(
        &self,
        store: &S,
        donation_id: DonationId,
    ) -> Result<Vec<RankedShelter>, CoordinatorError> {
        let donation = self.donations.get_by_id(store, donation_id).await?;
        let shelters = self.shelters.list(store).await?;
        Ok(ranker::rank_for_donation(&donation, &shelters))
    }

    /// Every match ever made, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Storage`] when the store fails.
    pub async fn history<S: Store>(&self, store: &S) -> Result<Vec<Match>, CoordinatorError> {
        Ok(store.matches().await?)
    }

    /// Wait for every in-flight notification to finish.
    ///
    /// After [`Self::shutdown`] the tracker stays closed.
    pub async fn flush_notifications(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        if !self.shutdown.is_cancelled() {
            self.tasks.reopen();
        }
    }

    /// Cancel in-flight notifications and wait for their tasks to exit.
    pub async fn shutdown(&self) {
        tracing::info!(in_flight = self.tasks.len(), "coordinator.shutdown");
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{
        DonationDraft, DonationStatus, GeoPoint, NotificationError, Shelter, ShelterDraft,
    };
    use memory_store::InMemoryStore;
    use registry::DonationRequest;
    use std::sync::{Arc, Mutex};

    // ------------------------------------------------------------------
    // Mock adapters
    // ------------------------------------------------------------------

    /// Records every message; optionally fails each send.
    #[derive(Debug, Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        async fn send(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
            self.sent.lock().unwrap().push((phone.to_owned(), message.to_owned()));
            if self.fail {
                return Err(NotificationError::DeliveryFailed { reason: "gateway down".to_owned() });
            }
            Ok(())
        }
    }

    /// Never completes; only cancellation or timeout ends a send.
    #[derive(Debug, Clone, Default)]
    struct HangingNotifier;

    impl Notifier for HangingNotifier {
        async fn send(&self, _phone: &str, _message: &str) -> Result<(), NotificationError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// Delegates to an in-memory store but fails every `commit_claim`.
    #[derive(Debug, Default)]
    struct BrokenCommitStore {
        inner: InMemoryStore,
    }

    impl Store for BrokenCommitStore {
        async fn insert_donation(&self, draft: DonationDraft) -> Result<Donation, StoreError> {
            self.inner.insert_donation(draft).await
        }
        async fn donation(&self, id: DonationId) -> Result<Option<Donation>, StoreError> {
            self.inner.donation(id).await
        }
        async fn donations(&self) -> Result<Vec<Donation>, StoreError> {
            self.inner.donations().await
        }
        async fn mark_matched(&self, id: DonationId) -> Result<Donation, StoreError> {
            self.inner.mark_matched(id).await
        }
        async fn insert_shelter(&self, draft: ShelterDraft) -> Result<Shelter, StoreError> {
            self.inner.insert_shelter(draft).await
        }
        async fn upsert_shelter(&self, draft: ShelterDraft) -> Result<Shelter, StoreError> {
            self.inner.upsert_shelter(draft).await
        }
        async fn shelter(&self, id: ShelterId) -> Result<Option<Shelter>, StoreError> {
            self.inner.shelter(id).await
        }
        async fn shelter_by_name(&self, name: &str) -> Result<Option<Shelter>, StoreError> {
            self.inner.shelter_by_name(name).await
        }
        async fn shelters(&self) -> Result<Vec<Shelter>, StoreError> {
            self.inner.shelters().await
        }
        async fn award_points(&self, id: ShelterId, delta: u32) -> Result<Shelter, StoreError> {
            self.inner.award_points(id, delta).await
        }
        async fn matches(&self) -> Result<Vec<Match>, StoreError> {
            self.inner.matches().await
        }
        async fn commit_claim(&self, _commit: ClaimCommit) -> Result<ClaimReceipt, StoreError> {
            Err(StoreError::Unavailable { reason: "disk full".to_owned() })
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn coordinator() -> MatchCoordinator {
        coordinator_with(CoordinatorConfig::builder().build().unwrap())
    }

    fn coordinator_with(config: CoordinatorConfig) -> MatchCoordinator {
        MatchCoordinator::new(config, &RegistryConfig::builder().seed(11).build().unwrap())
    }

    async fn post_donation<S: Store>(c: &MatchCoordinator, store: &S, quantity: i64) -> Donation {
        let request = DonationRequest::new("Tony's Pizza Palace", "Pizza, Pasta", quantity, "123 Market St", 4)
            .at(GeoPoint::new(37.7749, -122.4194));
        c.donations().create(store, request).await.unwrap()
    }

    async fn register<S: Store>(c: &MatchCoordinator, store: &S, name: &str, point: GeoPoint) -> Shelter {
        let profile = ShelterProfile::named(name).contact_phone("+1234567890").located(point, "");
        c.shelters().create(store, profile).await.unwrap()
    }

    // ------------------------------------------------------------------
    // Config
    // ------------------------------------------------------------------

    #[test]
    fn config_defaults() {
        let cfg = CoordinatorConfig::builder().build().unwrap();
        assert_eq!(cfg.notify_timeout, Duration::from_secs(10));
        assert!(cfg.notifications);
    }

    #[test]
    fn config_zero_timeout_rejected() {
        let cfg = CoordinatorConfig::builder().notify_timeout(Duration::ZERO).build();
        assert!(matches!(cfg, Err(CoordinatorError::InvalidConfig { .. })));
    }

    // ------------------------------------------------------------------
    // Claim scenarios
    // ------------------------------------------------------------------

    #[tokio::test]
    #[expect(clippy::float_cmp, reason = "15.2 is the correctly rounded quotient 15200/1000")]
    async fn claim_by_new_name_registers_shelter() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let c = coordinator();
        let d = post_donation(&c, &store, 20).await;
        assert_eq!(d.carbon_saved.kilograms(), 15.2);

        let m = c.claim(&store, &notifier, d.id, ShelterRef::named("Hope Center")).await.unwrap();

        let shelter = c.shelters().get_by_name(&store, "Hope Center").await.unwrap().unwrap();
        assert_eq!(shelter.points, 10);
        let donation = c.donations().get_by_id(&store, d.id).await.unwrap();
        assert_eq!(donation.status, DonationStatus::Matched);
        assert_eq!(donation.claimed_by, Some(shelter.id));

        let history = c.history(&store).await.unwrap();
        assert_eq!(history, vec![m.clone()]);
        assert_eq!(m.donation_id, d.id);
        assert_eq!(m.shelter_id, shelter.id);
        assert_eq!(m.shelter_name, "Hope Center");
        assert_eq!(m.restaurant_name, "Tony's Pizza Palace");
        assert_eq!(m.quantity, 20);
        assert_eq!(m.carbon_saved, d.carbon_saved);
        assert_eq!(m.status, domain::MatchStatus::PendingPickup);
    }

    #[tokio::test]
    async fn repeat_claim_conflicts_without_side_effects() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let c = coordinator();
        let d = post_donation(&c, &store, 20).await;
        c.claim(&store, &notifier, d.id, ShelterRef::named("Hope Center")).await.unwrap();

        let again = c.claim(&store, &notifier, d.id, ShelterRef::named("Hope Center")).await;
        assert_eq!(again, Err(CoordinatorError::Conflict(d.id)));
        let other = c.claim(&store, &notifier, d.id, ShelterRef::named("Someone Else")).await;
        assert_eq!(other, Err(CoordinatorError::Conflict(d.id)));

        let shelters = c.shelters().list(&store).await.unwrap();
        assert_eq!(shelters.len(), 1);
        assert_eq!(shelters[0].points, 10);
        assert_eq!(c.history(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_shelter_id_is_not_found() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let c = coordinator();
        let d = post_donation(&c, &store, 5).await;

        let r = c.claim(&store, &notifier, d.id, ShelterRef::Id(ShelterId(404))).await;
        assert_eq!(r, Err(CoordinatorError::ShelterNotFound(ShelterId(404))));
        assert_eq!(r.unwrap_err().kind(), ErrorKind::NotFound);

        assert!(c.donations().get_by_id(&store, d.id).await.unwrap().is_available());
        assert!(c.shelters().list(&store).await.unwrap().is_empty());
        assert!(c.history(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_donation_is_not_found() {
        let store = InMemoryStore::new();
        let c = coordinator();
        let r = c
            .claim(&store, &RecordingNotifier::default(), DonationId(9), ShelterRef::named("Hope Center"))
            .await;
        assert_eq!(r, Err(CoordinatorError::DonationNotFound(DonationId(9))));
        assert!(c.shelters().list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_shelter_name_is_validation_error() {
        let store = InMemoryStore::new();
        let c = coordinator();
        let d = post_donation(&c, &store, 5).await;
        let r = c.claim(&store, &RecordingNotifier::default(), d.id, ShelterRef::named("  ")).await;
        assert!(matches!(r, Err(CoordinatorError::Validation { .. })));
        assert!(c.donations().get_by_id(&store, d.id).await.unwrap().is_available());
    }

    #[tokio::test]
    async fn claim_by_existing_id_and_name_award_same_shelter() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let c = coordinator();
        let s = register(&c, &store, "Hope Center", GeoPoint::new(37.7739, -122.4312)).await;
        let d1 = post_donation(&c, &store, 3).await;
        let d2 = post_donation(&c, &store, 4).await;

        c.claim(&store, &notifier, d1.id, ShelterRef::Id(s.id)).await.unwrap();
        c.claim(&store, &notifier, d2.id, ShelterRef::named("Hope Center")).await.unwrap();

        let s = c.shelters().get_by_id(&store, s.id).await.unwrap();
        assert_eq!(s.points, 20);
        assert_eq!(c.shelters().list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_rolls_back() {
        let store = BrokenCommitStore::default();
        let c = coordinator();
        let d = post_donation(&c, &store, 20).await;
        let r = c.claim(&store, &RecordingNotifier::default(), d.id, ShelterRef::named("Hope Center")).await;
        assert!(matches!(r, Err(CoordinatorError::Storage(StoreError::Unavailable { .. }))));
        assert!(c.donations().get_by_id(&store, d.id).await.unwrap().is_available());
        assert!(c.shelters().list(&store).await.unwrap().is_empty());
        assert!(c.history(&store).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_exactly_one_winner() {
        let store = Arc::new(InMemoryStore::new());
        let c = Arc::new(coordinator());
        let notifier = RecordingNotifier::default();
        let d = post_donation(&c, &*store, 20).await;
        let s = register(&c, &*store, "Hope Center", GeoPoint::new(37.7739, -122.4312)).await;
        let (donation_id, shelter_id) = (d.id, s.id);

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let (store, c, notifier) = (Arc::clone(&store), Arc::clone(&c), notifier.clone());
                tokio::spawn(async move {
                    // Mix id- and name-based references to the same shelter.
                    let target = if i % 2 == 0 {
                        ShelterRef::Id(shelter_id)
                    } else {
                        ShelterRef::named("Hope Center")
                    };
                    c.claim(&*store, &notifier, donation_id, target).await
                })
            })
            .collect();

        let mut wins = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => wins += 1,
                Err(e) => assert_eq!(e, CoordinatorError::Conflict(donation_id)),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(c.shelters().get_by_id(&*store, shelter_id).await.unwrap().points, 10);
        assert_eq!(c.history(&*store).await.unwrap().len(), 1);
        assert_eq!(
            c.donations().get_by_id(&*store, donation_id).await.unwrap().status,
            DonationStatus::Matched
        );

        c.flush_notifications().await;
        assert_eq!(notifier.sent().len(), 1);
    }

    // ------------------------------------------------------------------
    // Notification
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn notification_carries_pickup_details() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let c = coordinator();
        let s = register(&c, &store, "Hope Center", GeoPoint::new(37.7739, -122.4312)).await;
        let d = post_donation(&c, &store, 20).await;

        c.claim(&store, &notifier, d.id, ShelterRef::Id(s.id)).await.unwrap();
        c.flush_notifications().await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+1234567890");
        assert!(sent[0].1.starts_with("New food donation matched! 20 meals of Pizza, Pasta from Tony's Pizza Palace."));
        assert!(sent[0].1.contains("Location: 123 Market St."));
    }

    #[tokio::test]
    async fn failed_notification_does_not_fail_claim() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::failing();
        let c = coordinator();
        let s = register(&c, &store, "Hope Center", GeoPoint::new(37.7739, -122.4312)).await;
        let d = post_donation(&c, &store, 8).await;

        let m = c.claim(&store, &notifier, d.id, ShelterRef::Id(s.id)).await;
        assert!(m.is_ok(), "claim must succeed despite notifier failure: {m:?}");
        c.flush_notifications().await;
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(c.shelters().get_by_id(&store, s.id).await.unwrap().points, 10);
    }

    #[tokio::test]
    async fn shelter_without_phone_is_not_notified() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let c = coordinator();
        let d = post_donation(&c, &store, 2).await;
        c.claim(&store, &notifier, d.id, ShelterRef::named("Quiet Shelter")).await.unwrap();
        c.flush_notifications().await;
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn disabled_notifications_send_nothing() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::default();
        let c = coordinator_with(CoordinatorConfig::builder().notifications(false).build().unwrap());
        let s = register(&c, &store, "Hope Center", GeoPoint::new(37.7739, -122.4312)).await;
        let d = post_donation(&c, &store, 2).await;
        c.claim(&store, &notifier, d.id, ShelterRef::Id(s.id)).await.unwrap();
        c.flush_notifications().await;
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn hanging_notifier_never_blocks_claim_and_is_cancelled_on_shutdown() {
        let store = InMemoryStore::new();
        let c = coordinator();
        let s = register(&c, &store, "Hope Center", GeoPoint::new(37.7739, -122.4312)).await;
        let d = post_donation(&c, &store, 2).await;

        let m = c.claim(&store, &HangingNotifier, d.id, ShelterRef::Id(s.id)).await;
        assert!(m.is_ok());
        assert_eq!(c.history(&store).await.unwrap().len(), 1);

        // Shutdown cancels the pending send; this must return promptly.
        tokio::time::timeout(Duration::from_secs(5), c.shutdown()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_notifier_times_out() {
        let store = InMemoryStore::new();
        let c = coordinator_with(
            CoordinatorConfig::builder().notify_timeout(Duration::from_millis(50)).build().unwrap(),
        );
        let s = register(&c, &store, "Hope Center", GeoPoint::new(37.7739, -122.4312)).await;
        let d = post_donation(&c, &store, 2).await;
        c.claim(&store, &HangingNotifier, d.id, ShelterRef::Id(s.id)).await.unwrap();
        // With time paused, the runtime auto-advances to the timeout.
        c.flush_notifications().await;
    }

    #[tokio::test]
    async fn flush_keeps_tracker_open_until_shutdown() {
        let c = coordinator();
        c.flush_notifications().await;
        assert!(!c.tasks.is_closed());

        c.shutdown().await;
        c.flush_notifications().await;
        assert!(c.tasks.is_closed());
        assert!(c.shutdown.is_cancelled());
    }

    // ------------------------------------------------------------------
    // Ranking and history
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn rank_shelters_nearest_first() {
        let store = InMemoryStore::new();
        let c = coordinator();
        let far = register(&c, &store, "Far", GeoPoint::new(37.8049, -122.4194)).await;
        let near = register(&c, &store, "Near", GeoPoint::new(37.7759, -122.4194)).await;
        let d = post_donation(&c, &store, 1).await;

        let ranked = c.rank_shelters(&store, d.id).await.unwrap();
        let ids: Vec<ShelterId> = ranked.iter().map(|r| r.shelter.id).collect();
        assert_eq!(ids, vec![near.id, far.id]);
        assert!(ranked[0].distance_km < ranked[1].distance_km);

        let r = c.rank_shelters(&store, DonationId(99)).await;
        assert_eq!(r, Err(CoordinatorError::DonationNotFound(DonationId(99))));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(CoordinatorError::Conflict(DonationId(1)).kind(), ErrorKind::Conflict);
        assert_eq!(
            CoordinatorError::from(StoreError::Unavailable { reason: String::new() }).kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            CoordinatorError::from(RegistryError::AlreadyMatched(DonationId(2))),
            CoordinatorError::Conflict(DonationId(2))
        );
    }
}
