// Rust guideline compliant 2026-02-16

//! `SQLite` adapter for the `Store` port.
//!
//! Persists donations, shelters and matches via `sqlx`. The schema is created
//! with `CREATE TABLE IF NOT EXISTS` on connect, so a fresh file needs no
//! manual setup.
//!
//! # Atomicity
//!
//! The donation status compare-and-set is
//! `UPDATE donations SET status = 'matched' WHERE id = ? AND status = 'available'`;
//! zero affected rows means the claim lost. [`Store::commit_claim`] runs that
//! statement, the optional shelter registration, the points increment and the
//! match insert in one transaction. Any early return drops the transaction,
//! which rolls it back.
//!
//! # In-memory databases
//!
//! Every `sqlite::memory:` connection is a separate database, so such URLs get
//! a single pooled connection that is never recycled.

use std::str::FromStr as _;

use domain::{
    CarbonMass, ClaimCommit, ClaimReceipt, ClaimTarget, Donation, DonationDraft, DonationId,
    DonationStatus, Location, Match, MatchId, MatchStatus, Shelter, ShelterDraft, ShelterId, Store,
    StoreError,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row as _, SqliteConnection, SqlitePool};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS shelters (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT    NOT NULL UNIQUE,
        capacity      INTEGER NOT NULL,
        lat           REAL    NOT NULL,
        lng           REAL    NOT NULL,
        address       TEXT    NOT NULL,
        contact_phone TEXT    NOT NULL,
        needs         TEXT    NOT NULL,
        points        INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS donations (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        restaurant_name TEXT    NOT NULL,
        food_type       TEXT    NOT NULL,
        quantity        INTEGER NOT NULL,
        lat             REAL    NOT NULL,
        lng             REAL    NOT NULL,
        address         TEXT    NOT NULL,
        expires_at      TEXT    NOT NULL,
        status          TEXT    NOT NULL DEFAULT 'available',
        carbon_grams    INTEGER NOT NULL,
        created_at      TEXT    NOT NULL,
        meal_category   TEXT,
        allergens       TEXT    NOT NULL DEFAULT '[]', -- JSON array
        dietary_info    TEXT    NOT NULL DEFAULT '[]', -- JSON array
        claimed_by      INTEGER REFERENCES shelters(id)
    )",
    "CREATE TABLE IF NOT EXISTS matches (
        seq             INTEGER PRIMARY KEY AUTOINCREMENT,
        id              TEXT    NOT NULL UNIQUE,
        donation_id     INTEGER NOT NULL UNIQUE REFERENCES donations(id),
        shelter_id      INTEGER NOT NULL REFERENCES shelters(id),
        restaurant_name TEXT    NOT NULL,
        shelter_name    TEXT    NOT NULL,
        food_type       TEXT    NOT NULL,
        quantity        INTEGER NOT NULL,
        carbon_grams    INTEGER NOT NULL,
        matched_at      TEXT    NOT NULL,
        status          TEXT    NOT NULL
    )",
];

/// `Store` adapter backed by a `SQLite` database via `sqlx`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create the database at `db_url` and initialize the schema.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when the URL is malformed, the connection fails or
    /// schema creation fails.
    pub async fn connect(db_url: &str) -> Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
        let pool = if db_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(opts).await?
        };
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        tracing::info!(url = db_url, "sqlite_store.connected");
        Ok(Self { pool })
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Log the backend error and surface it as `Unavailable`.
fn unavailable(op: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        tracing::error!("sqlite_store.{op}: {e}");
        StoreError::Unavailable { reason: e.to_string() }
    }
}

/// Row key for an id. Ids above `i64::MAX` are never assigned and map to a key
/// that matches no row.
fn key(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(-1)
}

fn decode_err(e: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

fn int<T: TryFrom<i64>>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T::Error: std::error::Error + Send + Sync + 'static,
{
    T::try_from(row.try_get::<i64, _>(column)?).map_err(decode_err)
}

fn string_list(row: &SqliteRow, column: &str) -> Result<Vec<String>, sqlx::Error> {
    serde_json::from_str(&row.try_get::<String, _>(column)?).map_err(decode_err)
}

fn location(row: &SqliteRow) -> Result<Location, sqlx::Error> {
    Ok(Location { lat: row.try_get("lat")?, lng: row.try_get("lng")?, address: row.try_get("address")? })
}

fn donation_from_row(row: &SqliteRow) -> Result<Donation, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let claimed_by = row
        .try_get::<Option<i64>, _>("claimed_by")?
        .map(u64::try_from)
        .transpose()
        .map_err(decode_err)?;
    Ok(Donation {
        id: DonationId(int(row, "id")?),
        restaurant_name: row.try_get("restaurant_name")?,
        food_type: row.try_get("food_type")?,
        quantity: int(row, "quantity")?,
        location: location(row)?,
        expires_at: row.try_get("expires_at")?,
        status: DonationStatus::parse(&status)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown donation status {status:?}").into()))?,
        carbon_saved: CarbonMass::from_grams(int(row, "carbon_grams")?),
        created_at: row.try_get("created_at")?,
        meal_category: row.try_get("meal_category")?,
        allergens: string_list(row, "allergens")?,
        dietary_info: string_list(row, "dietary_info")?,
        claimed_by: claimed_by.map(ShelterId),
    })
}

fn shelter_from_row(row: &SqliteRow) -> Result<Shelter, sqlx::Error> {
    Ok(Shelter {
        id: ShelterId(int(row, "id")?),
        name: row.try_get("name")?,
        capacity: int(row, "capacity")?,
        location: location(row)?,
        contact_phone: row.try_get("contact_phone")?,
        needs: row.try_get("needs")?,
        points: int(row, "points")?,
    })
}

fn match_from_row(row: &SqliteRow) -> Result<Match, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    if status != MatchStatus::PendingPickup.as_str() {
        return Err(sqlx::Error::Decode(format!("unknown match status {status:?}").into()));
    }
    Ok(Match {
        id: MatchId(uuid::Uuid::parse_str(&id).map_err(decode_err)?),
        donation_id: DonationId(int(row, "donation_id")?),
        shelter_id: ShelterId(int(row, "shelter_id")?),
        restaurant_name: row.try_get("restaurant_name")?,
        shelter_name: row.try_get("shelter_name")?,
        food_type: row.try_get("food_type")?,
        quantity: int(row, "quantity")?,
        carbon_saved: CarbonMass::from_grams(int(row, "carbon_grams")?),
        matched_at: row.try_get("matched_at")?,
        status: MatchStatus::PendingPickup,
    })
}

fn grams(carbon: CarbonMass) -> Result<i64, sqlx::Error> {
    i64::try_from(carbon.grams()).map_err(decode_err)
}

// ---------------------------------------------------------------------------
// Queries shared by the pool and transactions
// ---------------------------------------------------------------------------

async fn fetch_donation(conn: &mut SqliteConnection, id: i64) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query("SELECT * FROM donations WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .as_ref()
        .map(donation_from_row)
        .transpose()
}

async fn fetch_shelter(conn: &mut SqliteConnection, id: i64) -> Result<Option<Shelter>, sqlx::Error> {
    sqlx::query("SELECT * FROM shelters WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .as_ref()
        .map(shelter_from_row)
        .transpose()
}

async fn fetch_shelter_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Shelter>, sqlx::Error> {
    sqlx::query("SELECT * FROM shelters WHERE name = ?")
        .bind(name)
        .fetch_optional(conn)
        .await?
        .as_ref()
        .map(shelter_from_row)
        .transpose()
}

/// Insert `draft` unless the name is taken; either way return the stored shelter.
async fn upsert_shelter_row(conn: &mut SqliteConnection, draft: &ShelterDraft) -> Result<Shelter, sqlx::Error> {
    sqlx::query(
        "INSERT INTO shelters (name, capacity, lat, lng, address, contact_phone, needs)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(name) DO NOTHING",
    )
    .bind(&draft.name)
    .bind(draft.capacity)
    .bind(draft.location.lat)
    .bind(draft.location.lng)
    .bind(&draft.location.address)
    .bind(&draft.contact_phone)
    .bind(&draft.needs)
    .execute(&mut *conn)
    .await?;
    fetch_shelter_by_name(conn, &draft.name).await?.ok_or(sqlx::Error::RowNotFound)
}

// ---------------------------------------------------------------------------
// Store impl
// ---------------------------------------------------------------------------

impl Store for SqliteStore {
    async fn insert_donation(&self, draft: DonationDraft) -> Result<Donation, StoreError> {
        let op = "insert_donation";
        let allergens = serde_json::to_string(&draft.allergens)
            .map_err(|e| unavailable(op)(decode_err(e)))?;
        let dietary_info = serde_json::to_string(&draft.dietary_info)
            .map_err(|e| unavailable(op)(decode_err(e)))?;
        let done = sqlx::query(
            "INSERT INTO donations
             (restaurant_name, food_type, quantity, lat, lng, address, expires_at,
              carbon_grams, created_at, meal_category, allergens, dietary_info)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.restaurant_name)
        .bind(&draft.food_type)
        .bind(draft.quantity)
        .bind(draft.location.lat)
        .bind(draft.location.lng)
        .bind(&draft.location.address)
        .bind(draft.expires_at)
        .bind(grams(draft.carbon_saved).map_err(unavailable(op))?)
        .bind(draft.created_at)
        .bind(&draft.meal_category)
        .bind(allergens)
        .bind(dietary_info)
        .execute(&self.pool)
        .await
        .map_err(unavailable(op))?;

        let id = u64::try_from(done.last_insert_rowid()).map_err(|e| unavailable(op)(decode_err(e)))?;
        Ok(Donation {
            id: DonationId(id),
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
        })
    }

    async fn donation(&self, id: DonationId) -> Result<Option<Donation>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(unavailable("donation"))?;
        fetch_donation(&mut conn, key(id.0)).await.map_err(unavailable("donation"))
    }

    async fn donations(&self) -> Result<Vec<Donation>, StoreError> {
        let rows = sqlx::query("SELECT * FROM donations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("donations"))?;
        rows.iter().map(donation_from_row).collect::<Result<_, _>>().map_err(unavailable("donations"))
    }

    async fn mark_matched(&self, id: DonationId) -> Result<Donation, StoreError> {
        let op = "mark_matched";
        let mut tx = self.pool.begin().await.map_err(unavailable(op))?;
        let done = sqlx::query("UPDATE donations SET status = 'matched' WHERE id = ? AND status = 'available'")
            .bind(key(id.0))
            .execute(&mut *tx)
            .await
            .map_err(unavailable(op))?;
        let current = fetch_donation(&mut tx, key(id.0)).await.map_err(unavailable(op))?;
        let Some(donation) = current else {
            return Err(StoreError::DonationNotFound(id));
        };
        if done.rows_affected() == 0 {
            return Err(StoreError::StatusConflict(id));
        }
        tx.commit().await.map_err(unavailable(op))?;
        Ok(donation)
    }

    async fn insert_shelter(&self, draft: ShelterDraft) -> Result<Shelter, StoreError> {
        let op = "insert_shelter";
        let done = sqlx::query(
            "INSERT INTO shelters (name, capacity, lat, lng, address, contact_phone, needs)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.name)
        .bind(draft.capacity)
        .bind(draft.location.lat)
        .bind(draft.location.lng)
        .bind(&draft.location.address)
        .bind(&draft.contact_phone)
        .bind(&draft.needs)
        .execute(&self.pool)
        .await;

        let done = match done {
            Ok(done) => done,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(StoreError::DuplicateName { name: draft.name });
            }
            Err(e) => return Err(unavailable(op)(e)),
        };
        let id = u64::try_from(done.last_insert_rowid()).map_err(|e| unavailable(op)(decode_err(e)))?;
        Ok(Shelter {
            id: ShelterId(id),
            name: draft.name,
            capacity: draft.capacity,
            location: draft.location,
            contact_phone: draft.contact_phone,
            needs: draft.needs,
            points: 0,
        })
    }

    async fn upsert_shelter(&self, draft: ShelterDraft) -> Result<Shelter, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(unavailable("upsert_shelter"))?;
        upsert_shelter_row(&mut conn, &draft).await.map_err(unavailable("upsert_shelter"))
    }

    async fn shelter(&self, id: ShelterId) -> Result<Option<Shelter>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(unavailable("shelter"))?;
        fetch_shelter(&mut conn, key(id.0)).await.map_err(unavailable("shelter"))
    }

    async fn shelter_by_name(&self, name: &str) -> Result<Option<Shelter>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(unavailable("shelter_by_name"))?;
        fetch_shelter_by_name(&mut conn, name).await.map_err(unavailable("shelter_by_name"))
    }

    async fn shelters(&self) -> Result<Vec<Shelter>, StoreError> {
        let rows = sqlx::query("SELECT * FROM shelters ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("shelters"))?;
        rows.iter().map(shelter_from_row).collect::<Result<_, _>>().map_err(unavailable("shelters"))
    }

    async fn award_points(&self, id: ShelterId, delta: u32) -> Result<Shelter, StoreError> {
        let op = "award_points";
        let mut tx = self.pool.begin().await.map_err(unavailable(op))?;
        let done = sqlx::query("UPDATE shelters SET points = points + ? WHERE id = ?")
            .bind(delta)
            .bind(key(id.0))
            .execute(&mut *tx)
            .await
            .map_err(unavailable(op))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::ShelterNotFound(id));
        }
        let shelter = fetch_shelter(&mut tx, key(id.0))
            .await
            .map_err(unavailable(op))?
            .ok_or(StoreError::ShelterNotFound(id))?;
        tx.commit().await.map_err(unavailable(op))?;
        Ok(shelter)
    }

    async fn matches(&self) -> Result<Vec<Match>, StoreError> {
        let rows = sqlx::query("SELECT * FROM matches ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("matches"))?;
        rows.iter().map(match_from_row).collect::<Result<_, _>>().map_err(unavailable("matches"))
    }

    async fn commit_claim(&self, commit: ClaimCommit) -> Result<ClaimReceipt, StoreError> {
        let op = "commit_claim";
        let donation_id = commit.donation_id;
        let mut tx = self.pool.begin().await.map_err(unavailable(op))?;

        // Compare-and-set first: the write lock is taken before anything is read.
        let done = sqlx::query("UPDATE donations SET status = 'matched' WHERE id = ? AND status = 'available'")
            .bind(key(donation_id.0))
            .execute(&mut *tx)
            .await
            .map_err(unavailable(op))?;
        if done.rows_affected() == 0 {
            let exists = fetch_donation(&mut tx, key(donation_id.0)).await.map_err(unavailable(op))?;
            return Err(match exists {
                Some(_) => StoreError::StatusConflict(donation_id),
                None => StoreError::DonationNotFound(donation_id),
            });
        }

        let shelter_id = match &commit.target {
            ClaimTarget::Existing(id) => fetch_shelter(&mut tx, key(id.0))
                .await
                .map_err(unavailable(op))?
                .ok_or(StoreError::ShelterNotFound(*id))?
                .id,
            ClaimTarget::Register(draft) => upsert_shelter_row(&mut tx, draft).await.map_err(unavailable(op))?.id,
        };

        sqlx::query("UPDATE shelters SET points = points + ? WHERE id = ?")
            .bind(commit.points)
            .bind(key(shelter_id.0))
            .execute(&mut *tx)
            .await
            .map_err(unavailable(op))?;
        sqlx::query("UPDATE donations SET claimed_by = ? WHERE id = ?")
            .bind(key(shelter_id.0))
            .bind(key(donation_id.0))
            .execute(&mut *tx)
            .await
            .map_err(unavailable(op))?;

        let donation = fetch_donation(&mut tx, key(donation_id.0))
            .await
            .map_err(unavailable(op))?
            .ok_or(StoreError::DonationNotFound(donation_id))?;
        let shelter = fetch_shelter(&mut tx, key(shelter_id.0))
            .await
            .map_err(unavailable(op))?
            .ok_or(StoreError::ShelterNotFound(shelter_id))?;

        let record = Match {
            id: commit.match_id,
            donation_id,
            shelter_id,
            restaurant_name: donation.restaurant_name.clone(),
            shelter_name: shelter.name.clone(),
            food_type: donation.food_type.clone(),
            quantity: donation.quantity,
            carbon_saved: donation.carbon_saved,
            matched_at: commit.matched_at,
            status: MatchStatus::PendingPickup,
        };
        sqlx::query(
            "INSERT INTO matches
             (id, donation_id, shelter_id, restaurant_name, shelter_name, food_type,
              quantity, carbon_grams, matched_at, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.0.to_string())
        .bind(key(donation_id.0))
        .bind(key(shelter_id.0))
        .bind(&record.restaurant_name)
        .bind(&record.shelter_name)
        .bind(&record.food_type)
        .bind(record.quantity)
        .bind(grams(record.carbon_saved).map_err(unavailable(op))?)
        .bind(record.matched_at)
        .bind(record.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(unavailable(op))?;

        tx.commit().await.map_err(unavailable(op))?;
        tracing::debug!(donation_id = %donation_id, shelter_id = %shelter_id, "sqlite_store.claim.committed");
        Ok(ClaimReceipt { record, donation, shelter })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
