use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use crate::models::{BillingRecord, DeviceUsage, Reading};

const SEED_METER: &str = "37182045123";
const SEED_TARIFF_PER_KWH: f64 = 24.5;

/// Which rows a command looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Meter(String),
    User(Uuid),
}

impl Scope {
    pub fn from_args(meter: Option<String>, user: Option<Uuid>) -> Self {
        match (meter, user) {
            (Some(meter), _) => Scope::Meter(meter),
            (None, Some(user)) => Scope::User(user),
            (None, None) => Scope::All,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::All => "all meters".to_string(),
            Scope::Meter(meter) => format!("meter {meter}"),
            Scope::User(user) => format!("user {user}"),
        }
    }

    fn clause(&self) -> &'static str {
        match self {
            Scope::All => "",
            Scope::Meter(_) => " AND meter_number = $2",
            Scope::User(_) => " AND user_id = $2",
        }
    }

    fn bind<'q>(
        &'q self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            Scope::All => query,
            Scope::Meter(meter) => query.bind(meter.as_str()),
            Scope::User(user) => query.bind(*user),
        }
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct SeedReading {
    timestamp: DateTime<Utc>,
    kwh: f64,
    source_key: String,
}

/// Two weeks of demo readings at fixed local hours, heavier in the evening
/// and trending up this week. Hours still ahead of `now` are left out.
fn seed_readings(now: DateTime<Utc>, offset: FixedOffset) -> anyhow::Result<Vec<SeedReading>> {
    let today = now.with_timezone(&offset).date_naive();
    let mut readings = Vec::new();

    for days_ago in 0..14i64 {
        let date = today - Duration::days(days_ago);
        let growth = if days_ago < 7 { 1.2 } else { 1.0 };
        for (hour, kwh) in [(7u32, 1.1), (13, 0.8), (19, 2.6), (21, 1.9)] {
            let local = date.and_hms_opt(hour, 0, 0).context("invalid seed hour")?;
            let timestamp = offset
                .from_local_datetime(&local)
                .single()
                .context("ambiguous seed time")?
                .with_timezone(&Utc);
            if timestamp > now {
                continue;
            }
            readings.push(SeedReading {
                timestamp,
                kwh: kwh * growth,
                source_key: format!("seed-reading-{date}-{hour:02}"),
            });
        }
    }

    Ok(readings)
}

pub async fn seed(pool: &PgPool, offset: FixedOffset) -> anyhow::Result<usize> {
    let user_id = Uuid::parse_str("6f1c2b7e-8a43-4c0e-9d2f-5b8e1a7c3d90")?;
    let now = Utc::now();
    let today = now.with_timezone(&offset).date_naive();
    let mut inserted = 0usize;

    for reading in seed_readings(now, offset)? {
        let created = insert_reading(
            pool,
            user_id,
            SEED_METER,
            reading.timestamp,
            reading.kwh,
            reading.kwh * SEED_TARIFF_PER_KWH,
            &reading.source_key,
        )
        .await?;
        inserted += created as usize;
    }

    let bills = [
        ("seed-bill-001", today - Duration::days(3), 1000.0),
        ("seed-bill-002", today - Duration::days(20), 1500.0),
    ];
    for (source_key, billing_date, amount) in bills {
        sqlx::query(
            r#"
            INSERT INTO energy_monitor.billing
            (id, user_id, meter_number, billing_date, amount, units_kwh, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(SEED_METER)
        .bind(billing_date)
        .bind(amount)
        .bind(amount / SEED_TARIFF_PER_KWH)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let devices = [
        ("Water heating", 14.2),
        ("Cooking", 9.6),
        ("Lighting", 4.1),
        ("Refrigeration", 6.3),
    ];
    for (category, kwh) in devices {
        sqlx::query(
            r#"
            INSERT INTO energy_monitor.device_usage
            (id, user_id, meter_number, category, kwh, recorded_on, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(SEED_METER)
        .bind(category)
        .bind(kwh)
        .bind(today)
        .bind(format!("seed-device-{today}-{category}"))
        .execute(pool)
        .await?;
    }

    tracing::info!(inserted, meter = SEED_METER, "seeded readings");
    Ok(inserted)
}

async fn insert_reading(
    pool: &PgPool,
    user_id: Uuid,
    meter_number: &str,
    recorded_at: DateTime<Utc>,
    kwh_consumed: f64,
    total_cost: f64,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO energy_monitor.readings
        (id, user_id, meter_number, recorded_at, kwh_consumed, total_cost, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(meter_number)
    .bind(recorded_at)
    .bind(kwh_consumed)
    .bind(total_cost)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Readings recorded since `since`, most recent first.
pub async fn fetch_readings(
    pool: &PgPool,
    since: DateTime<Utc>,
    scope: &Scope,
) -> anyhow::Result<Vec<Reading>> {
    let sql = format!(
        "SELECT id, user_id, meter_number, recorded_at, kwh_consumed, total_cost \
         FROM energy_monitor.readings \
         WHERE recorded_at >= $1{} \
         ORDER BY recorded_at DESC",
        scope.clause()
    );

    let records = scope
        .bind(sqlx::query(&sql).bind(since))
        .fetch_all(pool)
        .await
        .context("failed to fetch readings")?;

    let readings = records
        .into_iter()
        .map(|row| Reading {
            id: row.get("id"),
            user_id: row.get("user_id"),
            meter_number: row.get("meter_number"),
            timestamp: row.get("recorded_at"),
            kwh_consumed: row.get("kwh_consumed"),
            total_cost: row.get("total_cost"),
        })
        .collect();

    Ok(readings)
}

pub async fn fetch_billing(
    pool: &PgPool,
    since: NaiveDate,
    scope: &Scope,
) -> anyhow::Result<Vec<BillingRecord>> {
    let sql = format!(
        "SELECT id, user_id, meter_number, billing_date, amount, units_kwh \
         FROM energy_monitor.billing \
         WHERE billing_date >= $1{} \
         ORDER BY billing_date DESC",
        scope.clause()
    );

    let records = scope
        .bind(sqlx::query(&sql).bind(since))
        .fetch_all(pool)
        .await
        .context("failed to fetch billing")?;

    Ok(records
        .into_iter()
        .map(|row| BillingRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            meter_number: row.get("meter_number"),
            billing_date: row.get("billing_date"),
            amount: row.get("amount"),
            units_kwh: row.get("units_kwh"),
        })
        .collect())
}

/// Per-category kWh totals recorded on or after `since`.
pub async fn fetch_device_usage(
    pool: &PgPool,
    since: NaiveDate,
    scope: &Scope,
) -> anyhow::Result<Vec<DeviceUsage>> {
    let sql = format!(
        "SELECT category, SUM(kwh) AS kwh \
         FROM energy_monitor.device_usage \
         WHERE recorded_on >= $1{} \
         GROUP BY category \
         ORDER BY kwh DESC",
        scope.clause()
    );

    let records = scope
        .bind(sqlx::query(&sql).bind(since))
        .fetch_all(pool)
        .await
        .context("failed to fetch device usage")?;

    Ok(records
        .into_iter()
        .map(|row| DeviceUsage {
            category: row.get("category"),
            kwh: row.get("kwh"),
        })
        .collect())
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    user_id: Uuid,
    meter_number: String,
    timestamp: DateTime<Utc>,
    kwh_consumed: f64,
    total_cost: f64,
    source_key: Option<String>,
}

impl CsvRow {
    /// Rejects negative (or NaN) usage and cost.
    fn is_importable(&self) -> bool {
        self.kwh_consumed >= 0.0 && self.total_cost >= 0.0
    }

    fn source_key(&self) -> String {
        self.source_key.clone().unwrap_or_else(|| {
            format!("import-{}-{}", self.meter_number, self.timestamp.to_rfc3339())
        })
    }
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid row {}", line + 2))?;
        if !row.is_importable() {
            tracing::warn!(line = line + 2, "skipping row with negative usage or cost");
            skipped += 1;
            continue;
        }

        let source_key = row.source_key();
        if insert_reading(
            pool,
            row.user_id,
            &row.meter_number,
            row.timestamp,
            row.kwh_consumed,
            row.total_cost,
            &source_key,
        )
        .await?
        {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    tracing::info!(inserted, skipped, path = %csv_path.display(), "imported readings");
    Ok(inserted)
}
