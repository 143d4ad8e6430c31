use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::ingest::{self, CallPayload, SuccessFlag};
use crate::models::{CallRecord, Load, LoadFilter};
use crate::store::{CallStore, LoadStore, StoreError};

const LOAD_COLUMNS: &str = "load_id, origin, destination, pickup_datetime, delivery_datetime, \
     equipment_type, loadboard_rate, maximum_rate, notes, weight, commodity_type, \
     num_of_pieces, miles, dimensions";

const CALL_COLUMNS: &str = "id, duration, mc_number, final_offer, final_counter_offer, \
     offer_iterations, successful, sentiment, created_at";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed implementation of both store capabilities.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Builds the load search; needles are matched literally with `strpos`, so
/// `%` and `_` in user text carry no pattern meaning.
fn search_query(filter: &LoadFilter) -> (String, Vec<String>) {
    let mut query = format!("SELECT {LOAD_COLUMNS} FROM freight_desk.loads WHERE TRUE");
    let mut binds = Vec::new();

    if let Some(origin) = &filter.origin {
        binds.push(origin.to_lowercase());
        query.push_str(&format!(" AND strpos(lower(origin), ${}) > 0", binds.len()));
    }
    if let Some(destination) = &filter.destination {
        binds.push(destination.to_lowercase());
        query.push_str(&format!(" AND strpos(lower(destination), ${}) > 0", binds.len()));
    }
    query.push_str(" ORDER BY load_id");

    (query, binds)
}

fn load_from_row(row: &PgRow) -> Load {
    Load {
        load_id: row.get("load_id"),
        origin: row.get("origin"),
        destination: row.get("destination"),
        pickup_datetime: row.get("pickup_datetime"),
        delivery_datetime: row.get("delivery_datetime"),
        equipment_type: row.get("equipment_type"),
        loadboard_rate: row.get("loadboard_rate"),
        maximum_rate: row.get("maximum_rate"),
        notes: row.get("notes"),
        weight: row.get("weight"),
        commodity_type: row.get("commodity_type"),
        num_of_pieces: row.get("num_of_pieces"),
        miles: row.get("miles"),
        dimensions: row.get("dimensions"),
    }
}

fn call_from_row(row: &PgRow) -> CallRecord {
    CallRecord {
        id: row.get("id"),
        duration: row.get("duration"),
        mc_number: row.get("mc_number"),
        final_offer: row.get("final_offer"),
        final_counter_offer: row.get("final_counter_offer"),
        offer_iterations: row.get("offer_iterations"),
        successful: row.get("successful"),
        sentiment: row.get("sentiment"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl LoadStore for PgStore {
    async fn get_by_id(&self, load_id: i64) -> Result<Option<Load>, StoreError> {
        let query = format!("SELECT {LOAD_COLUMNS} FROM freight_desk.loads WHERE load_id = $1");
        let row = sqlx::query(&query)
            .bind(load_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                tracing::error!(load_id, error = %err, "failed to fetch load");
                StoreError::Database(err)
            })?;

        Ok(row.as_ref().map(load_from_row))
    }

    async fn search(&self, filter: &LoadFilter) -> Result<Vec<Load>, StoreError> {
        let (query, binds) = search_query(filter);
        let mut rows = sqlx::query(&query);
        for value in binds {
            rows = rows.bind(value);
        }

        let records = rows.fetch_all(&self.pool).await.map_err(|err| {
            tracing::error!(error = %err, "failed to search loads");
            StoreError::Database(err)
        })?;

        Ok(records.iter().map(load_from_row).collect())
    }
}

#[async_trait]
impl CallStore for PgStore {
    async fn insert(&self, record: &CallRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO freight_desk.calls
            (id, duration, mc_number, final_offer, final_counter_offer,
             offer_iterations, successful, sentiment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&record.id)
        .bind(record.duration)
        .bind(record.mc_number)
        .bind(record.final_offer)
        .bind(record.final_counter_offer)
        .bind(record.offer_iterations)
        .bind(record.successful)
        .bind(&record.sentiment)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Duplicate(record.id.clone())
            }
            other => {
                tracing::error!(id = %record.id, error = %other, "failed to insert call");
                StoreError::Database(other)
            }
        })?;

        tracing::debug!(id = %record.id, "stored call record");
        Ok(())
    }

    async fn all(&self) -> Result<Vec<CallRecord>, StoreError> {
        let query = format!("SELECT {CALL_COLUMNS} FROM freight_desk.calls ORDER BY created_at");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(call_from_row).collect())
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let pickup = |day: u32, hour: u32| -> anyhow::Result<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2026, 11, day, hour, 0, 0)
            .single()
            .context("invalid seed timestamp")
    };

    let loads = vec![
        (1001_i64, "Dallas, TX", "Atlanta, GA", pickup(2, 8)?, pickup(3, 17)?,
         "Dry Van", 1850.0, 2300.0, "Dock appointment required", 38_000.0,
         "Paper goods", 22, 781.0, "53ft"),
        (1002, "Chicago, IL", "Denver, CO", pickup(4, 6)?, pickup(5, 20)?,
         "Reefer", 2600.0, 3150.0, "Maintain 34F", 41_500.0,
         "Frozen produce", 18, 1003.0, "53ft"),
        (1003, "Los Angeles, CA", "Phoenix, AZ", pickup(5, 10)?, pickup(5, 22)?,
         "Flatbed", 1200.0, 1550.0, "Tarps required", 44_000.0,
         "Steel coils", 6, 373.0, "48ft x 8.5ft"),
        (1004, "Dallas, TX", "Houston, TX", pickup(6, 7)?, pickup(6, 14)?,
         "Dry Van", 650.0, 820.0, "", 22_000.0,
         "Consumer electronics", 30, 239.0, "53ft"),
        (1005, "Newark, NJ", "Chicago, IL", pickup(9, 9)?, pickup(11, 12)?,
         "Reefer", 3000.0, 5000.0, "Team drivers preferred", 39_000.0,
         "Pharmaceuticals", 14, 790.0, "53ft"),
    ];

    for (load_id, origin, destination, pickup_at, delivery_at, equipment, loadboard, maximum,
         notes, weight, commodity, pieces, miles, dimensions) in loads
    {
        sqlx::query(
            r#"
            INSERT INTO freight_desk.loads
            (load_id, origin, destination, pickup_datetime, delivery_datetime, equipment_type,
             loadboard_rate, maximum_rate, notes, weight, commodity_type, num_of_pieces,
             miles, dimensions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (load_id) DO UPDATE
            SET loadboard_rate = EXCLUDED.loadboard_rate, maximum_rate = EXCLUDED.maximum_rate
            "#,
        )
        .bind(load_id)
        .bind(origin)
        .bind(destination)
        .bind(pickup_at)
        .bind(delivery_at)
        .bind(equipment)
        .bind(loadboard)
        .bind(maximum)
        .bind(notes)
        .bind(weight)
        .bind(commodity)
        .bind(pieces)
        .bind(miles)
        .bind(dimensions)
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let calls = vec![
        ("seed-call-001", 312_i64, 884_120_i64, 2100.0, 2200.0, 3_i64, true, "positive", 0_i64),
        ("seed-call-002", 95, 512_003, 2600.0, 3400.0, 1, false, "negative", 1),
        ("seed-call-003", 240, 730_441, 1350.0, 1400.0, 2, true, "neutral", 1),
        ("seed-call-004", 410, 884_120, 4000.0, 4000.0, 4, true, "Positive", 3),
        ("seed-call-005", 60, 220_981, 700.0, 950.0, 1, false, "frustrated", 5),
        ("seed-call-006", 188, 610_777, 1850.0, 1900.0, 2, true, "positive", 12),
    ];

    for (id, duration, mc_number, offer, counter, iterations, successful, sentiment, days_ago)
        in calls
    {
        sqlx::query(
            r#"
            INSERT INTO freight_desk.calls
            (id, duration, mc_number, final_offer, final_counter_offer,
             offer_iterations, successful, sentiment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(duration)
        .bind(mc_number)
        .bind(offer)
        .bind(counter)
        .bind(iterations)
        .bind(successful)
        .bind(sentiment)
        .bind(now - Duration::days(days_ago))
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

#[derive(serde::Deserialize)]
struct CsvRow {
    id: Option<String>,
    duration: i64,
    mc_number: i64,
    final_offer: f64,
    final_counter_offer: f64,
    offer_iterations: i64,
    successful: String,
    sentiment: String,
    created_at: Option<DateTime<Utc>>,
}

pub async fn import_csv(
    calls: &dyn CallStore,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportSummary> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    import_reader(calls, file, Utc::now()).await
}

pub async fn import_reader<R: std::io::Read>(
    calls: &dyn CallStore,
    input: R,
    now: DateTime<Utc>,
) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_reader(input);
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = result.with_context(|| format!("malformed CSV row on line {line}"))?;
        let successful = ingest::parse_success_text(&row.successful)
            .with_context(|| format!("invalid row on line {line}"))?;

        let payload = CallPayload {
            id: Some(
                row.id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("import-{}", Uuid::new_v4())),
            ),
            duration: Some(row.duration),
            mc_number: Some(row.mc_number),
            final_offer: Some(row.final_offer),
            final_counter_offer: Some(row.final_counter_offer),
            offer_iterations: Some(row.offer_iterations),
            successful: Some(SuccessFlag::Bool(successful)),
            sentiment: Some(row.sentiment),
            created_at: row.created_at,
        };
        let record = payload
            .validate(now)
            .with_context(|| format!("invalid row on line {line}"))?;

        match calls.insert(&record).await {
            Ok(()) => summary.inserted += 1,
            Err(StoreError::Duplicate(id)) => {
                tracing::warn!(%id, line, "skipping call already on record");
                summary.duplicates += 1;
            }
            Err(err) => return Err(err).with_context(|| format!("failed to store line {line}")),
        }
    }

    Ok(summary)
}
