use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

/// Public view of an account; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCredentials {
    pub id: i64,
    pub password_hash: String,
}

impl User {
    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new("SELECT id, username, email, created_at FROM users WHERE id = ?")
                .bind(id),
        )
        .await
    }

    pub async fn username_taken(db: &Db, username: &str) -> Result<bool, StorageError> {
        db.exists(Statement::new("SELECT id FROM users WHERE username = ?").bind(username))
            .await
    }

    pub async fn credentials(
        db: &Db,
        username: &str,
    ) -> Result<Option<UserCredentials>, StorageError> {
        db.first(
            Statement::new("SELECT id, password_hash FROM users WHERE username = ?")
                .bind(username),
        )
        .await
    }

    /// Insert a user with an already-hashed password and return its id.
    pub async fn create(
        db: &Db,
        username: &str,
        password_hash: &str,
    ) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new("INSERT INTO users (username, password_hash) VALUES (?, ?)")
                    .bind(username)
                    .bind(password_hash),
            )
            .await?;
        Ok(result.last_row_id)
    }
}
