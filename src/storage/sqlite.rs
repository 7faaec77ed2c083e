//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers (API handlers) are not blocked by probe writes
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//! - **Referential integrity**: Metrics cascade-delete with their monitor
//!
//! ## Limitations
//!
//! - **Concurrency**: A single writer at a time; writes queue behind the busy timeout
//! - **Distributed**: Single-machine only

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{MetricCount, MetricQuery, MonitorFilter, SortOrder, StatusPatch};
use crate::{Metric, Monitor, MonitorId};

const MONITOR_COLUMNS: &str = r#"
    id, name, url, method, interval_secs, timeout_secs, is_active, created_at, updated_at,
    current_status, current_status_code, current_response, last_checked, uptime_percentage
"#;

/// SQLite storage backend
///
/// This backend stores monitors and their metric log in a local SQLite
/// database file.
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite (WAL mode, foreign keys, busy timeout)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use pulsewatch::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./pulsewatch.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        info!("SQLite connection pool created");

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Helper to convert timestamp to Unix milliseconds for SQLite
    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    /// Helper to convert Unix milliseconds from SQLite to DateTime
    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn parse_id(raw: &str) -> StorageResult<MonitorId> {
        Uuid::parse_str(raw)
            .map_err(|e| StorageError::SerializationError(format!("invalid monitor id {raw}: {e}")))
    }

    fn monitor_from_row(row: &SqliteRow) -> StorageResult<Monitor> {
        let id: String = row.try_get("id")?;
        let method: String = row.try_get("method")?;
        let status: String = row.try_get("current_status")?;

        Ok(Monitor {
            id: Self::parse_id(&id)?,
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            method: method
                .parse()
                .map_err(|e| StorageError::SerializationError(format!("{e}")))?,
            interval: row.try_get::<i64, _>("interval_secs")? as u64,
            timeout: row.try_get::<i64, _>("timeout_secs")? as u64,
            is_active: row.try_get("is_active")?,
            created_at: Self::millis_to_timestamp(row.try_get("created_at")?),
            updated_at: Self::millis_to_timestamp(row.try_get("updated_at")?),
            current_status: status
                .parse()
                .map_err(|e| StorageError::SerializationError(format!("{e}")))?,
            current_status_code: row.try_get::<i64, _>("current_status_code")? as u16,
            current_response: row.try_get::<i64, _>("current_response")? as u64,
            last_checked: row
                .try_get::<Option<i64>, _>("last_checked")?
                .map(Self::millis_to_timestamp),
            uptime_percentage: row.try_get("uptime_percentage")?,
        })
    }

    fn metric_from_row(row: &SqliteRow) -> StorageResult<Metric> {
        let monitor_id: String = row.try_get("monitor_id")?;
        let status: String = row.try_get("status")?;

        Ok(Metric {
            monitor_id: Self::parse_id(&monitor_id)?,
            url: row.try_get("url")?,
            status: status
                .parse()
                .map_err(|e| StorageError::SerializationError(format!("{e}")))?,
            status_code: row.try_get::<i64, _>("status_code")? as u16,
            response_time: row.try_get::<i64, _>("response_time")? as u64,
            error: row.try_get("error")?,
            checked_at: Self::millis_to_timestamp(row.try_get("checked_at")?),
        })
    }

    fn filter_clause(filter: &MonitorFilter) -> &'static str {
        match filter {
            MonitorFilter::All => "",
            MonitorFilter::Active => "WHERE is_active = 1",
            MonitorFilter::Url(_) => "WHERE url = ?",
        }
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, monitor), fields(monitor_id = %monitor.id, url = %monitor.url))]
    async fn insert_monitor(&self, monitor: &Monitor) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO monitors (
                id, name, url, method, interval_secs, timeout_secs, is_active,
                created_at, updated_at, current_status, current_status_code,
                current_response, last_checked, uptime_percentage
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(monitor.id.to_string())
        .bind(&monitor.name)
        .bind(&monitor.url)
        .bind(monitor.method.as_str())
        .bind(monitor.interval as i64)
        .bind(monitor.timeout as i64)
        .bind(monitor.is_active)
        .bind(Self::timestamp_to_millis(&monitor.created_at))
        .bind(Self::timestamp_to_millis(&monitor.updated_at))
        .bind(monitor.current_status.as_str())
        .bind(monitor.current_status_code as i64)
        .bind(monitor.current_response as i64)
        .bind(monitor.last_checked.as_ref().map(Self::timestamp_to_millis))
        .bind(monitor.uptime_percentage)
        .execute(&self.pool)
        .await?;

        debug!("monitor inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_monitors(&self, filter: MonitorFilter) -> StorageResult<Vec<Monitor>> {
        let sql = format!(
            "SELECT {} FROM monitors {} ORDER BY created_at ASC",
            MONITOR_COLUMNS,
            Self::filter_clause(&filter)
        );

        let mut query = sqlx::query(&sql);
        if let MonitorFilter::Url(url) = &filter {
            query = query.bind(url);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::monitor_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn get_monitor(&self, id: MonitorId) -> StorageResult<Option<Monitor>> {
        let sql = format!("SELECT {} FROM monitors WHERE id = ?", MONITOR_COLUMNS);

        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::monitor_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn count_monitors(&self, filter: MonitorFilter) -> StorageResult<usize> {
        let sql = format!(
            "SELECT COUNT(*) FROM monitors {}",
            Self::filter_clause(&filter)
        );

        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        if let MonitorFilter::Url(url) = &filter {
            query = query.bind(url);
        }

        let (count,) = query.fetch_one(&self.pool).await?;
        Ok(count as usize)
    }

    #[instrument(skip(self, patch), fields(status = %patch.status))]
    async fn update_monitor_status(
        &self,
        id: MonitorId,
        patch: StatusPatch,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE monitors SET
                current_status = ?,
                current_status_code = ?,
                current_response = ?,
                last_checked = ?,
                uptime_percentage = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.status.as_str())
        .bind(patch.status_code as i64)
        .bind(patch.response_time as i64)
        .bind(Self::timestamp_to_millis(&patch.last_checked))
        .bind(patch.uptime_percentage)
        .bind(Self::timestamp_to_millis(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_monitor(&self, id: MonitorId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM monitors WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, metric), fields(monitor_id = %metric.monitor_id, status = %metric.status))]
    async fn insert_metric(&self, metric: &Metric) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO metrics (
                monitor_id, url, status, status_code, response_time, error, checked_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(metric.monitor_id.to_string())
        .bind(&metric.url)
        .bind(metric.status.as_str())
        .bind(metric.status_code as i64)
        .bind(metric.response_time as i64)
        .bind(&metric.error)
        .bind(Self::timestamp_to_millis(&metric.checked_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(monitor_id = %query.monitor_id))]
    async fn find_metrics(&self, query: MetricQuery) -> StorageResult<Vec<Metric>> {
        let order = match query.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let limit_clause = query
            .limit
            .map(|l| format!("LIMIT {}", l))
            .unwrap_or_default();

        let sql = format!(
            r#"
            SELECT monitor_id, url, status, status_code, response_time, error, checked_at
            FROM metrics
            WHERE monitor_id = ? AND checked_at >= ?
            ORDER BY checked_at {order}, id {order}
            {limit_clause}
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(query.monitor_id.to_string())
            .bind(Self::timestamp_to_millis(&query.since))
            .fetch_all(&self.pool)
            .await?;

        let results: Vec<Metric> = rows
            .iter()
            .map(Self::metric_from_row)
            .collect::<StorageResult<_>>()?;

        debug!("query returned {} metrics", results.len());
        Ok(results)
    }

    #[instrument(skip(self), fields(monitor_id = %count.monitor_id))]
    async fn count_metrics(&self, count: MetricCount) -> StorageResult<usize> {
        let (total,): (i64,) = match count.status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM metrics WHERE monitor_id = ? AND checked_at >= ? AND status = ?",
                )
                .bind(count.monitor_id.to_string())
                .bind(Self::timestamp_to_millis(&count.since))
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM metrics WHERE monitor_id = ? AND checked_at >= ?")
                    .bind(count.monitor_id.to_string())
                    .bind(Self::timestamp_to_millis(&count.since))
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(total as usize)
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn cleanup_old_metrics(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        info!("cleaning up metrics older than {}", before);

        let result = sqlx::query("DELETE FROM metrics WHERE checked_at < ?")
            .bind(Self::timestamp_to_millis(&before))
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        info!("deleted {} old metrics", deleted);

        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let (monitors,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM monitors")
            .fetch_one(&self.pool)
            .await?;

        let (metrics, oldest, newest): (i64, Option<i64>, Option<i64>) =
            sqlx::query_as("SELECT COUNT(*), MIN(checked_at), MAX(checked_at) FROM metrics")
                .fetch_one(&self.pool)
                .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        let file_size_mb = file_size as f64 / 1_000_000.0;

        let time_range = match (oldest, newest) {
            (Some(old), Some(new)) => format!(
                "{} to {}",
                Self::millis_to_timestamp(old).format("%Y-%m-%d"),
                Self::millis_to_timestamp(new).format("%Y-%m-%d")
            ),
            _ => "no data".to_string(),
        };

        Ok(format!(
            "SQLite: {} monitors, {} metrics, {:.2} MB on disk, time range: {}",
            monitors, metrics, file_size_mb, time_range
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
