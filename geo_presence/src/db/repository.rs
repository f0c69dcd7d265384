//! Repository traits and their PostgreSQL implementation.
//!
//! Components depend on the narrow traits (`OfficeRepository`,
//! `AttendanceRepository`, ...) so they can be wired against either
//! [`PgStore`] or [`MemoryStore`](super::MemoryStore).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::errors::{StoreError, StoreResult};
use crate::{
    auth::{Role, User, UserId},
    face::FaceTemplate,
    ledger::{AttendanceRecord, FaceEvidence, NewAttendanceRecord},
    office::{Office, OfficeId, OfficeUpdate},
};

/// Office storage
#[async_trait]
pub trait OfficeRepository: Send + Sync {
    /// Find office by ID
    async fn find_office(&self, office_id: OfficeId) -> StoreResult<Option<Office>>;

    /// All offices ordered by ID
    async fn list_offices(&self) -> StoreResult<Vec<Office>>;

    /// Apply a partial update; `None` when the office does not exist
    async fn update_office(
        &self,
        office_id: OfficeId,
        update: &OfficeUpdate,
    ) -> StoreResult<Option<Office>>;
}

/// User lookup
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>>;
}

/// Face template storage
#[async_trait]
pub trait FaceTemplateRepository: Send + Sync {
    /// Store a new template
    async fn insert_template(
        &self,
        user_id: UserId,
        embedding: &[u8],
        model_id: &str,
    ) -> StoreResult<FaceTemplate>;

    /// Up to `limit` templates, most recent first
    async fn recent_templates(&self, user_id: UserId, limit: usize)
    -> StoreResult<Vec<FaceTemplate>>;

    /// Number of templates enrolled for a user
    async fn count_templates(&self, user_id: UserId) -> StoreResult<i64>;
}

/// Append-only attendance storage
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// A user's records with `start <= recorded_at < end`
    async fn records_for_user(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<AttendanceRecord>>;

    /// Everyone's records in `[start, end)`, optionally for one office
    async fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        office_id: Option<OfficeId>,
    ) -> StoreResult<Vec<AttendanceRecord>>;

    /// Append a record and return it with its assigned ID
    async fn insert_record(&self, record: &NewAttendanceRecord) -> StoreResult<AttendanceRecord>;
}

/// Everything the server needs from one backing store
#[async_trait]
pub trait Store:
    OfficeRepository + UserRepository + FaceTemplateRepository + AttendanceRepository
{
    /// Check that the store answers
    async fn ping(&self) -> StoreResult<()>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const OFFICE_COLUMNS: &str = "id, name, latitude, longitude, radius_meters, allowed_ranges";

const RECORD_COLUMNS: &str = "id, user_id, office_id, kind, recorded_at, latitude, longitude, \
     accuracy_meters, distance_meters, geofence, network, face, face_distance, face_model, \
     client_address, note";

fn parse_column<T>(table: &'static str, column: &str, raw: &str) -> StoreResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(|reason| StoreError::Corrupt {
        table,
        reason: format!("{column}: {reason}"),
    })
}

fn office_from_row(r: &PgRow) -> Office {
    Office {
        id: r.get("id"),
        name: r.get("name"),
        latitude: r.get("latitude"),
        longitude: r.get("longitude"),
        radius_meters: r.get("radius_meters"),
        allowed_ranges: r.get("allowed_ranges"),
    }
}

fn template_from_row(r: &PgRow) -> FaceTemplate {
    FaceTemplate {
        id: r.get("id"),
        user_id: r.get("user_id"),
        embedding: r.get("embedding"),
        model_id: r.get("model_id"),
        created_at: r.get::<NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn record_from_row(r: &PgRow) -> StoreResult<AttendanceRecord> {
    const TABLE: &str = "attendance_records";

    Ok(AttendanceRecord {
        id: r.get("id"),
        user_id: r.get("user_id"),
        office_id: r.get("office_id"),
        kind: parse_column(TABLE, "kind", r.get("kind"))?,
        recorded_at: r.get::<NaiveDateTime, _>("recorded_at").and_utc(),
        latitude: r.get("latitude"),
        longitude: r.get("longitude"),
        accuracy_meters: r.get("accuracy_meters"),
        distance_meters: r.get("distance_meters"),
        geofence: parse_column(TABLE, "geofence", r.get("geofence"))?,
        network: parse_column(TABLE, "network", r.get("network"))?,
        face: FaceEvidence {
            verdict: parse_column(TABLE, "face", r.get("face"))?,
            distance: r.get("face_distance"),
            model_id: r.get("face_model"),
        },
        client_address: r.get("client_address"),
        note: r.get("note"),
    })
}

#[async_trait]
impl OfficeRepository for PgStore {
    async fn find_office(&self, office_id: OfficeId) -> StoreResult<Option<Office>> {
        let row = sqlx::query(&format!("SELECT {OFFICE_COLUMNS} FROM offices WHERE id = $1"))
            .bind(office_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(office_from_row))
    }

    async fn list_offices(&self) -> StoreResult<Vec<Office>> {
        let rows = sqlx::query(&format!("SELECT {OFFICE_COLUMNS} FROM offices ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(office_from_row).collect())
    }

    async fn update_office(
        &self,
        office_id: OfficeId,
        update: &OfficeUpdate,
    ) -> StoreResult<Option<Office>> {
        let row = sqlx::query(&format!(
            "UPDATE offices
             SET radius_meters = COALESCE($2, radius_meters),
                 allowed_ranges = COALESCE($3, allowed_ranges)
             WHERE id = $1
             RETURNING {OFFICE_COLUMNS}"
        ))
        .bind(office_id)
        .bind(update.radius_meters)
        .bind(update.allowed_ranges.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(office_from_row))
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT id, display_name, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            Ok(User {
                id: r.get("id"),
                display_name: r.get("display_name"),
                role: parse_column::<Role>("users", "role", r.get("role"))?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl FaceTemplateRepository for PgStore {
    async fn insert_template(
        &self,
        user_id: UserId,
        embedding: &[u8],
        model_id: &str,
    ) -> StoreResult<FaceTemplate> {
        let row = sqlx::query(
            "INSERT INTO face_templates (user_id, embedding, model_id)
             VALUES ($1, $2, $3)
             RETURNING id, user_id, embedding, model_id, created_at",
        )
        .bind(user_id)
        .bind(embedding)
        .bind(model_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(template_from_row(&row))
    }

    async fn recent_templates(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StoreResult<Vec<FaceTemplate>> {
        let rows = sqlx::query(
            "SELECT id, user_id, embedding, model_id, created_at
             FROM face_templates
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(template_from_row).collect())
    }

    async fn count_templates(&self, user_id: UserId) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM face_templates WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("count"))
    }
}

#[async_trait]
impl AttendanceRepository for PgStore {
    async fn records_for_user(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_records
             WHERE user_id = $1 AND recorded_at >= $2 AND recorded_at < $3
             ORDER BY recorded_at, id"
        ))
        .bind(user_id)
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        office_id: Option<OfficeId>,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_records
             WHERE recorded_at >= $1 AND recorded_at < $2
               AND ($3::BIGINT IS NULL OR office_id = $3)
             ORDER BY recorded_at, id"
        ))
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .bind(office_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn insert_record(&self, record: &NewAttendanceRecord) -> StoreResult<AttendanceRecord> {
        let row = sqlx::query(
            "INSERT INTO attendance_records
                (user_id, office_id, kind, recorded_at, latitude, longitude, accuracy_meters,
                 distance_meters, geofence, network, face, face_distance, face_model,
                 client_address, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING id",
        )
        .bind(record.user_id)
        .bind(record.office_id)
        .bind(record.kind.to_string())
        .bind(record.recorded_at.naive_utc())
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.accuracy_meters)
        .bind(record.distance_meters)
        .bind(record.geofence.to_string())
        .bind(record.network.to_string())
        .bind(record.face.verdict.to_string())
        .bind(record.face.distance)
        .bind(record.face.model_id.as_deref())
        .bind(&record.client_address)
        .bind(record.note.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.clone().with_id(row.get("id")))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
