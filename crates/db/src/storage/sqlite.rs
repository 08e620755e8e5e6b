use std::{path::Path, str::FromStr, time::Duration};

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    Column, Executor, Row as _, SqlitePool, TypeInfo, ValueRef,
    query::Query,
    sqlite::{
        Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode,
        SqlitePoolOptions, SqliteRow, SqliteSynchronous,
    },
};
use tracing::info;

use super::{Row, RunResult, Statement, Storage, StorageError};

/// Default maximum connections in the pool.
/// SQLite benefits from limited connections due to single-writer model.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Connection acquisition (and busy) timeout in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Idle connection timeout in seconds (10 minutes).
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Per-connection pragmas, applied via `after_connect`.
///
/// `synchronous` must come after `mmap_size`, otherwise mmap'ed writes can
/// bypass fsync under load.
async fn apply_pragmas(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    conn.execute("PRAGMA temp_store = 2").await?;
    conn.execute("PRAGMA mmap_size = 67108864").await?;
    conn.execute("PRAGMA synchronous = NORMAL").await?;
    conn.execute("PRAGMA cache_size = -16000").await?;
    conn.execute("PRAGMA foreign_keys = ON").await?;
    Ok(())
}

/// Local SQLite backend.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if missing) the database file and apply pending migrations.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let database_url = format!("sqlite://{}", path.to_string_lossy());
        info!(
            path = %path.display(),
            max_connections,
            "Initializing SQLite connection pool"
        );

        let options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .min_connections(DEFAULT_MIN_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)))
            .after_connect(|conn, _meta| Box::pin(async move { apply_pragmas(conn).await }))
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    /// Wrap an existing pool. Migrations are the caller's responsibility.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Checkpoint the WAL and close every connection.
    pub async fn close(&self) {
        if let Err(error) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
        {
            tracing::warn!(?error, "final WAL checkpoint failed");
        }
        self.pool.close().await;
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(Option::<String>::None),
            Value::Bool(flag) => query.bind(i64::from(*flag)),
            Value::Number(n) => match n.as_i64() {
                Some(int) => query.bind(int),
                None => query.bind(n.as_f64().unwrap_or_default()),
            },
            Value::String(text) => query.bind(text.clone()),
            composite => query.bind(composite.to_string()),
        };
    }
    query
}

fn row_to_json(row: &SqliteRow) -> Result<Row, StorageError> {
    let mut map = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            // The value's own storage class, not the declared column type.
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" => Value::from(row.try_get_unchecked::<f64, _>(idx)?),
                "BLOB" => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

#[async_trait]
impl Storage for SqliteStorage {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn all(&self, stmt: &Statement) -> Result<Vec<Row>, StorageError> {
        let rows = bind_params(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn first(&self, stmt: &Statement) -> Result<Option<Row>, StorageError> {
        let row = bind_params(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_json).transpose()
    }

    async fn run(&self, stmt: &Statement) -> Result<RunResult, StorageError> {
        let result = bind_params(sqlx::query(&stmt.sql), &stmt.params)
            .execute(&self.pool)
            .await?;
        Ok(RunResult {
            changes: result.rows_affected(),
            last_row_id: result.last_insert_rowid(),
        })
    }

    /// All statements commit together or not at all.
    async fn batch(&self, stmts: &[Statement]) -> Result<Vec<RunResult>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let result = bind_params(sqlx::query(&stmt.sql), &stmt.params)
                .execute(&mut *tx)
                .await?;
            results.push(RunResult {
                changes: result.rows_affected(),
                last_row_id: result.last_insert_rowid(),
            });
        }
        tx.commit().await?;
        Ok(results)
    }
}
