// Period bucketing: each period keeps 60 buckets, so a bucket spans `period_minutes` seconds.
// Schema for the aggregate table lives here next to the math that fills it.

use sqlx::SqlitePool;

/// Dashboard periods in minutes: 1 hour, 6 hours, 24 hours, 7 days.
pub const PERIODS_MINUTES: [u32; 4] = [60, 360, 1440, 10080];

pub fn is_period(period_minutes: u32) -> bool {
    PERIODS_MINUTES.contains(&period_minutes)
}

/// Bucket width in seconds for a period.
pub fn bucket_width_secs(period_minutes: u32) -> i64 {
    period_minutes as i64 * 60 / 60
}

/// Start of the bucket containing `timestamp` (unix seconds).
pub fn bucket_start(timestamp: i64, period_minutes: u32) -> i64 {
    let width = bucket_width_secs(period_minutes);
    timestamp.div_euclid(width) * width
}

/// Oldest bucket start still inside the period ending at `now`.
pub fn period_floor(now: i64, period_minutes: u32) -> i64 {
    now - period_minutes as i64 * 60
}

pub async fn init_aggregate_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metric_aggregates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bucket INTEGER NOT NULL,
            period INTEGER NOT NULL,
            type TEXT NOT NULL,
            key TEXT NOT NULL,
            aggregate TEXT NOT NULL,
            value REAL NOT NULL,
            UNIQUE (bucket, period, type, aggregate, key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_aggregates_period_type_key ON metric_aggregates(period, type, key, bucket)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
