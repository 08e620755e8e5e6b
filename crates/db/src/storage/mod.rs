//! Storage capability shared by every model.
//!
//! Models never talk to a driver directly: they build [`Statement`]s and hand
//! them to a [`Db`], which forwards to whichever [`Storage`] backend the
//! process was started with. Two backends exist:
//!
//! - [`sqlite::SqliteStorage`] - local file through an sqlx pool
//! - [`d1::D1Storage`] - Cloudflare D1 over its HTTP query API
//!
//! Both speak the same contract: positional `?` parameters, rows returned as
//! JSON objects keyed by column name, and `run` reporting `changes` and
//! `last_row_id`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod d1;
pub mod sqlite;

/// A result row: column name to JSON scalar, in select-list order.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("remote database error: {0}")]
    Remote(String),
    #[error("failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A prepared SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append the next positional parameter.
    ///
    /// Booleans are stored as 0/1 since neither backend has a boolean type.
    pub fn bind<T: Serialize>(mut self, value: T) -> Self {
        let value = match serde_json::to_value(value) {
            Ok(Value::Bool(flag)) => Value::from(i64::from(flag)),
            // Composite values are stored as their JSON text.
            Ok(composite @ (Value::Array(_) | Value::Object(_))) => {
                Value::String(composite.to_string())
            }
            Ok(other) => other,
            Err(error) => {
                tracing::warn!(?error, "failed to serialize bound parameter, binding NULL");
                Value::Null
            }
        };
        self.params.push(value);
        self
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub changes: u64,
    pub last_row_id: i64,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn all(&self, stmt: &Statement) -> Result<Vec<Row>, StorageError>;

    async fn first(&self, stmt: &Statement) -> Result<Option<Row>, StorageError> {
        Ok(self.all(stmt).await?.into_iter().next())
    }

    async fn run(&self, stmt: &Statement) -> Result<RunResult, StorageError>;

    /// Execute several writes in order.
    async fn batch(&self, stmts: &[Statement]) -> Result<Vec<RunResult>, StorageError>;
}

/// Handle passed around the application; cheap to clone.
#[derive(Clone)]
pub struct Db {
    inner: Arc<dyn Storage>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("backend", &self.inner.backend())
            .finish()
    }
}

impl Db {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            inner: Arc::new(storage),
        }
    }

    pub fn from_arc(storage: Arc<dyn Storage>) -> Self {
        Self { inner: storage }
    }

    pub fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    pub async fn all<T: DeserializeOwned>(&self, stmt: Statement) -> Result<Vec<T>, StorageError> {
        self.inner
            .all(&stmt)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(StorageError::from))
            .collect()
    }

    pub async fn first<T: DeserializeOwned>(
        &self,
        stmt: Statement,
    ) -> Result<Option<T>, StorageError> {
        match self.inner.first(&stmt).await? {
            Some(row) => Ok(Some(serde_json::from_value(Value::Object(row))?)),
            None => Ok(None),
        }
    }

    /// First column of the first row, `None` when no row or the value is NULL.
    pub async fn scalar<T: DeserializeOwned>(
        &self,
        stmt: Statement,
    ) -> Result<Option<T>, StorageError> {
        let Some(row) = self.inner.first(&stmt).await? else {
            return Ok(None);
        };
        match row.into_iter().next() {
            Some((_, Value::Null)) | None => Ok(None),
            Some((_, value)) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// True when the statement yields at least one row.
    pub async fn exists(&self, stmt: Statement) -> Result<bool, StorageError> {
        Ok(self.inner.first(&stmt).await?.is_some())
    }

    pub async fn run(&self, stmt: Statement) -> Result<RunResult, StorageError> {
        self.inner.run(&stmt).await
    }

    pub async fn batch(&self, stmts: Vec<Statement>) -> Result<Vec<RunResult>, StorageError> {
        if stmts.is_empty() {
            return Ok(Vec::new());
        }
        self.inner.batch(&stmts).await
    }
}

/// Deserialize SQLite 0/1 (or a JSON bool) into `bool`.
pub fn int_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Ok(flag),
        Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        Value::String(s) => Ok(s == "1" || s.eq_ignore_ascii_case("true")),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[test]
    fn bind_converts_booleans_to_integers() {
        let stmt = Statement::new("UPDATE notes SET pinned = ? WHERE id = ?")
            .bind(true)
            .bind(42_i64);
        assert_eq!(stmt.params, vec![json!(1), json!(42)]);
    }

    #[test]
    fn bind_stores_arrays_as_json_text() {
        let stmt = Statement::new("UPDATE notes SET tags = ?").bind(vec!["a", "b"]);
        assert_eq!(stmt.params, vec![json!("[\"a\",\"b\"]")]);
    }

    #[test]
    fn bind_keeps_null_for_missing_values() {
        let stmt = Statement::new("SELECT ?").bind(Option::<String>::None);
        assert_eq!(stmt.params, vec![Value::Null]);
    }

    #[derive(Deserialize)]
    struct Flagged {
        #[serde(deserialize_with = "int_bool")]
        enabled: bool,
    }

    #[test]
    fn int_bool_accepts_sqlite_integers() {
        let on: Flagged = serde_json::from_value(json!({ "enabled": 1 })).unwrap();
        let off: Flagged = serde_json::from_value(json!({ "enabled": 0 })).unwrap();
        assert!(on.enabled);
        assert!(!off.enabled);
    }
}
