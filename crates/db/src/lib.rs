//! Persistence for the dashboard: the [`Storage`] capability with its SQLite
//! and D1 backends, the SQL migrations, and the model repositories.

pub mod models;
pub mod storage;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use storage::{
    Db, Row, RunResult, Statement, Storage, StorageError,
    d1::{D1Config, D1Storage},
    int_bool,
    sqlite::{DEFAULT_MAX_CONNECTIONS, SqliteStorage},
};
