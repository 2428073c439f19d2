// SQLite metrics store. Samples land in per-period max buckets (re-recording the same
// or an overlapping window is a no-op); summaries are one JSON value per (type, key).

pub mod buckets;

use crate::models::{Datapoint, MetricKind, SeriesPoint};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Category of the per-bucket summaries. Exempt from retention so a failing
/// provider leaves the last summary in place.
pub const SUMMARY_CATEGORY: &str = "s3_bucket";

pub struct MetricsRepo {
    pool: SqlitePool,
    retention_secs: i64,
}

impl MetricsRepo {
    pub async fn connect(path: &str, max_pool_size: u32, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        let retention_secs = (retention_days as i64) * 24 * 60 * 60;
        Ok(Self {
            pool,
            retention_secs,
        })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        buckets::init_aggregate_table(&self.pool).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metric_values (
                type TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (type, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records one sample, keeping the larger value per bucket.
    pub async fn record_sample(
        &self,
        kind: MetricKind,
        key: &str,
        value: f64,
        timestamp: i64,
    ) -> anyhow::Result<()> {
        self.record_samples(kind, key, &[Datapoint::new(timestamp, value)])
            .await
            .map(|_| ())
    }

    /// Records every non-gap point in one transaction. Returns the number of points written.
    #[instrument(skip(self, points), fields(repo = "metrics", operation = "record_samples", kind = kind.store_type(), points_count = points.len()))]
    pub async fn record_samples(
        &self,
        kind: MetricKind,
        key: &str,
        points: &[Datapoint],
    ) -> anyhow::Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for point in points {
            let Some(value) = point.value else {
                continue;
            };
            for period in buckets::PERIODS_MINUTES {
                sqlx::query(
                    r#"
                    INSERT INTO metric_aggregates (bucket, period, type, key, aggregate, value)
                    VALUES ($1, $2, $3, $4, 'max', $5)
                    ON CONFLICT (bucket, period, type, aggregate, key)
                    DO UPDATE SET value = MAX(value, excluded.value)
                    "#,
                )
                .bind(buckets::bucket_start(point.timestamp, period))
                .bind(period as i64)
                .bind(kind.store_type())
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
            }
            written += 1;
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Replaces the value stored under (category, key).
    #[instrument(skip(self, value), fields(repo = "metrics", operation = "set_summary"))]
    pub async fn set_summary(&self, category: &str, key: &str, value: &str) -> anyhow::Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO metric_values (type, key, value, updated_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (type, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(category)
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_summary(&self, category: &str, key: &str) -> anyhow::Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM metric_values WHERE type = $1 AND key = $2",
        )
        .bind(category)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    /// All (key, value) pairs of a category, ordered by key.
    pub async fn list_summaries(&self, category: &str) -> anyhow::Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT key, value FROM metric_values WHERE type = $1 ORDER BY key ASC")
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push((row.try_get("key")?, row.try_get("value")?));
        }
        Ok(out)
    }

    /// Buckets of `period_minutes` with start >= `since`. Order: ascending by bucket.
    #[instrument(skip(self), fields(repo = "metrics", operation = "get_series"))]
    pub async fn get_series(
        &self,
        kind: MetricKind,
        key: &str,
        period_minutes: u32,
        since: i64,
    ) -> anyhow::Result<Vec<SeriesPoint>> {
        let rows = sqlx::query(
            "SELECT bucket, value FROM metric_aggregates
             WHERE period = $1 AND type = $2 AND key = $3 AND aggregate = 'max' AND bucket >= $4
             ORDER BY bucket ASC",
        )
        .bind(period_minutes as i64)
        .bind(kind.store_type())
        .bind(key)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(SeriesPoint {
                timestamp: row.try_get("bucket")?,
                value: row.try_get("value")?,
            });
        }
        Ok(out)
    }

    /// Total stored aggregate rows plus summary values.
    pub async fn count_rows(&self) -> anyhow::Result<i64> {
        let aggregates: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM metric_aggregates")
            .fetch_one(&self.pool)
            .await?;
        let values: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM metric_values")
            .fetch_one(&self.pool)
            .await?;
        Ok(aggregates + values)
    }

    /// Drops buckets that fell out of their period and values not updated within
    /// retention_days. Bucket summaries are kept regardless of age.
    #[instrument(skip(self), fields(repo = "metrics", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let mut pruned = 0;
        for period in buckets::PERIODS_MINUTES {
            let r = sqlx::query("DELETE FROM metric_aggregates WHERE period = $1 AND bucket < $2")
                .bind(period as i64)
                .bind(buckets::period_floor(now, period))
                .execute(&self.pool)
                .await?;
            pruned += r.rows_affected();
        }
        let r = sqlx::query("DELETE FROM metric_values WHERE updated_at < $1 AND type != $2")
            .bind(now - self.retention_secs)
            .bind(SUMMARY_CATEGORY)
            .execute(&self.pool)
            .await?;
        pruned += r.rows_affected();
        Ok(pruned)
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "metrics", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}
