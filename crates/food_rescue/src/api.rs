// Rust guideline compliant 2026-02-23

//! Axum REST API over the engine.
//!
//! JSON in camelCase. Engine errors map to status codes by their
//! [`ErrorKind`]: validation 400, not found 404, conflict 409, storage 500,
//! always with an `{"error": "..."}` body.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coordinator::{CoordinatorError, MatchCoordinator, ShelterRef};
use domain::{
    Donation, DonationId, ErrorKind, GeoPoint, LeaderboardEntry, Match, Notifier, Shelter,
    ShelterId, Stats, Store, StoreError,
};
use impact::ImpactAccountant;
use registry::{DonationRequest, RegistryError, ShelterProfile};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Everything a request handler needs.
#[derive(Debug)]
pub struct AppState<S, N> {
    pub store: S,
    pub notifier: N,
    pub coordinator: MatchCoordinator,
    pub impact: ImpactAccountant,
}

type Shared<S, N> = State<Arc<AppState<S, N>>>;

/// Build the application router.
pub fn router<S, N>(state: Arc<AppState<S, N>>) -> Router
where
    S: Store + 'static,
    N: Notifier + Clone + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/donations", get(list_donations::<S, N>).post(create_donation::<S, N>))
        .route("/api/shelters", get(list_shelters::<S, N>).post(register_shelter::<S, N>))
        .route("/api/nearby-shelters/:donation_id", get(nearby_shelters::<S, N>))
        .route("/api/matches", get(list_matches::<S, N>).post(claim_by_id::<S, N>))
        .route("/api/claim", post(claim_by_name::<S, N>))
        .route("/api/stats", get(stats::<S, N>))
        .route("/api/leaderboard", get(leaderboard::<S, N>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Engine error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(kind: ErrorKind, message: String) -> Self {
        let status = match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::new(ErrorKind::Validation, e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::new(ErrorKind::Validation, e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "api.request.failed");
        }
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationBody {
    pub restaurant_name: String,
    pub food_type: String,
    pub quantity: i64,
    #[serde(default)]
    pub address: String,
    /// Shelf life in hours.
    pub expires_in: i64,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    #[serde(default)]
    pub meal_category: Option<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub dietary_info: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterShelterBody {
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub needs: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimByIdBody {
    pub donation_id: u64,
    pub shelter_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimByNameBody {
    pub donation_id: u64,
    pub shelter_name: String,
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DonationCreated {
    pub success: bool,
    pub donation: Donation,
}

#[derive(Debug, Serialize)]
pub struct ShelterCreated {
    pub success: bool,
    pub shelter: Shelter,
}

#[derive(Debug, Serialize)]
pub struct MatchCreated {
    pub success: bool,
    #[serde(rename = "match")]
    pub record: Match,
}

/// A shelter plus its distance in km, rounded to two decimals.
#[derive(Debug, Serialize)]
pub struct NearbyShelter {
    #[serde(flatten)]
    pub shelter: Shelter,
    pub distance: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_donations: u64,
    pub total_meals_saved: u64,
    /// Kilograms, rounded to one decimal.
    pub total_carbon_saved: f64,
    pub active_shelters: u64,
}

impl From<Stats> for StatsResponse {
    fn from(s: Stats) -> Self {
        Self {
            total_donations: s.total_donations,
            total_meals_saved: s.total_meals_saved,
            total_carbon_saved: s.total_carbon_saved.display_kilograms(),
            active_shelters: s.active_shelters,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

/// `GET /api/donations`: available donations, newest first.
async fn list_donations<S: Store, N: Notifier>(State(state): Shared<S, N>) -> ApiResult<Vec<Donation>> {
    let donations = state.coordinator.donations().list_available(&state.store).await?;
    Ok(Json(donations))
}

/// `POST /api/donations`
async fn create_donation<S: Store, N: Notifier>(
    State(state): Shared<S, N>,
    body: Result<Json<CreateDonationBody>, JsonRejection>,
) -> Result<(StatusCode, Json<DonationCreated>), ApiError> {
    let Json(body) = body?;
    let mut request =
        DonationRequest::new(body.restaurant_name, body.food_type, body.quantity, body.address, body.expires_in);
    request.coordinates = body.coordinates;
    request.meal_category = body.meal_category;
    request.allergens = body.allergens;
    request.dietary_info = body.dietary_info;

    let donation = state.coordinator.donations().create(&state.store, request).await?;
    Ok((StatusCode::CREATED, Json(DonationCreated { success: true, donation })))
}

/// `GET /api/shelters`
async fn list_shelters<S: Store, N: Notifier>(State(state): Shared<S, N>) -> ApiResult<Vec<Shelter>> {
    Ok(Json(state.coordinator.shelters().list(&state.store).await?))
}

/// `POST /api/shelters`
async fn register_shelter<S: Store, N: Notifier>(
    State(state): Shared<S, N>,
    body: Result<Json<RegisterShelterBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ShelterCreated>), ApiError> {
    let Json(body) = body?;
    let mut profile = ShelterProfile::named(body.name).capacity(body.capacity).contact_phone(body.contact_phone);
    if let Some(needs) = body.needs {
        profile = profile.needs(needs);
    }
    profile.address = body.address;
    profile.coordinates = body.coordinates;

    let shelter = state.coordinator.shelters().create(&state.store, profile).await?;
    Ok((StatusCode::CREATED, Json(ShelterCreated { success: true, shelter })))
}

/// `GET /api/nearby-shelters/:donation_id`: shelters nearest first.
async fn nearby_shelters<S: Store, N: Notifier>(
    State(state): Shared<S, N>,
    donation_id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Vec<NearbyShelter>> {
    let Path(donation_id) = donation_id?;
    let ranked = state.coordinator.rank_shelters(&state.store, DonationId(donation_id)).await?;
    Ok(Json(
        ranked
            .into_iter()
            .map(|r| NearbyShelter { shelter: r.shelter, distance: (r.distance_km * 100.0).round() / 100.0 })
            .collect(),
    ))
}

/// `POST /api/matches`: claim for a registered shelter.
async fn claim_by_id<S: Store, N: Notifier + Clone + 'static>(
    State(state): Shared<S, N>,
    body: Result<Json<ClaimByIdBody>, JsonRejection>,
) -> ApiResult<MatchCreated> {
    let Json(body) = body?;
    let record = state
        .coordinator
        .claim(&state.store, &state.notifier, DonationId(body.donation_id), ShelterRef::Id(ShelterId(body.shelter_id)))
        .await?;
    Ok(Json(MatchCreated { success: true, record }))
}

/// `POST /api/claim`: claim by shelter name, registering unknown names.
async fn claim_by_name<S: Store, N: Notifier + Clone + 'static>(
    State(state): Shared<S, N>,
    body: Result<Json<ClaimByNameBody>, JsonRejection>,
) -> ApiResult<MatchCreated> {
    let Json(body) = body?;
    let record = state
        .coordinator
        .claim(&state.store, &state.notifier, DonationId(body.donation_id), ShelterRef::named(body.shelter_name))
        .await?;
    Ok(Json(MatchCreated { success: true, record }))
}

/// `GET /api/matches`
async fn list_matches<S: Store, N: Notifier>(State(state): Shared<S, N>) -> ApiResult<Vec<Match>> {
    Ok(Json(state.coordinator.history(&state.store).await?))
}

/// `GET /api/stats`
async fn stats<S: Store, N: Notifier>(State(state): Shared<S, N>) -> ApiResult<StatsResponse> {
    Ok(Json(state.impact.stats(&state.store).await?.into()))
}

/// `GET /api/leaderboard`
async fn leaderboard<S: Store, N: Notifier>(State(state): Shared<S, N>) -> ApiResult<Vec<LeaderboardEntry>> {
    Ok(Json(state.coordinator.shelters().leaderboard(&state.store).await?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
