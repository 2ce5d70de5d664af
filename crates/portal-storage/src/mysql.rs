use async_trait::async_trait;
use jiff::Timestamp;
use portal_core::repository::{ReadRepository, Repository, Result};
use portal_core::{long_url_digest, ShortCode, StorageError};
use sqlx::{MySqlPool, Row};
use tracing::{debug, trace};

/// Schema for the `short_url_map` table.
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_url_map.sql");

/// MySQL implementation of the repository contract.
///
/// Long URLs can be up to 2048 characters, which is too wide for a portable
/// unique index. Uniqueness and lookups go through the SHA-256 digest column
/// instead, and every digest hit is re-checked against the raw URL.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_url_map` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("Applied short_url_map schema");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn stored_code(raw: String) -> Result<ShortCode> {
    ShortCode::parse(&raw)
        .map_err(|e| StorageError::InvalidData(format!("invalid stored short code '{raw}': {e}")))
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "Looking up long url in MySQL");

        let row = sqlx::query(
            r#"
            SELECT long_url
            FROM short_url_map
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            debug!(code = %code, "Short code not found in MySQL");
            return Ok(None);
        };

        let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
        Ok(Some(long_url))
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortCode>> {
        let row = sqlx::query(
            r#"
            SELECT short_code
            FROM short_url_map
            WHERE long_url_digest = ?
              AND long_url = ?
            LIMIT 1
            "#,
        )
        .bind(long_url_digest(long_url))
        .bind(long_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("short_code").map_err(map_sqlx_error)?;
        stored_code(raw).map(Some)
    }

    async fn list_short_codes(&self) -> Result<Vec<ShortCode>> {
        let rows = sqlx::query("SELECT short_code FROM short_url_map")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let raw: String = row.try_get("short_code").map_err(map_sqlx_error)?;
                stored_code(raw)
            })
            .collect()
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn insert(&self, code: &ShortCode, long_url: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_url_map (short_code, long_url, long_url_digest, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(code.as_str())
        .bind(long_url)
        .bind(long_url_digest(long_url))
        .bind(Timestamp::now().as_second())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                trace!(code = %code, "Stored mapping in MySQL");
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => Err(StorageError::Conflict(code.to_string())),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }
}
