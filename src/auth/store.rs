//! Credential record storage.
//!
//! The verification path only ever calls [`RecordStore::find_by_username`];
//! writes happen through the out-of-band `passwd` action. Every query is
//! parameter-bound, and connections are scoped to the single statement by the
//! pool.

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info_span, Instrument};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    // Display stays generic: no query text, no connection parameters.
    #[error("credential store unavailable")]
    Unavailable(#[from] sqlx::Error),
}

#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Exact, case-sensitive lookup. `None` means no such username.
    async fn find_by_username(&self, username: &str)
        -> Result<Option<CredentialRecord>, StoreError>;
}

#[derive(Clone, Debug)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Connect to the database behind `dsn`, creating the file and applying
    /// the schema when missing.
    ///
    /// # Errors
    /// Returns an error if the DSN does not parse, the database is
    /// unreachable, or the schema cannot be applied.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(dsn)
            .context("invalid SQLite DSN")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("Failed to apply database schema")?;

        Ok(Self { pool })
    }

    /// Create or replace the credential record for `username`. Used by the
    /// provisioning action only.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the write fails.
    pub async fn upsert_credential(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO users (username, password_hash)
            VALUES (?1, ?2)
            ON CONFLICT(username) DO UPDATE SET password_hash = excluded.password_hash
        ";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(())
    }
}

impl RecordStore for SqliteRecordStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let query = "SELECT username, password_hash FROM users WHERE username = ?1";
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(|row| CredentialRecord {
            username: row.get("username"),
            password_hash: row.get("password_hash"),
        }))
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryRecordStore;


#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hasher::PasswordHasher;

    async fn temp_store() -> Result<(SqliteRecordStore, tempfile::TempDir)> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let dsn = format!("sqlite://{}/ensaluti.db", dir.path().display());
        let store = SqliteRecordStore::connect(&dsn).await?;
        Ok((store, dir))
    }

    #[tokio::test]
    async fn upsert_then_find_round_trip() -> Result<()> {
        let (store, _dir) = temp_store().await?;
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("correct-horse")?;

        store.upsert_credential("alice", &hash).await?;

        let record = store
            .find_by_username("alice")
            .await?
            .context("record should exist")?;
        assert_eq!(record.username, "alice");
        assert!(hasher.verify("correct-horse", &record.password_hash));

        Ok(())
    }

    #[tokio::test]
    async fn find_unknown_username_returns_none() -> Result<()> {
        let (store, _dir) = temp_store().await?;

        assert!(store.find_by_username("nobody").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn lookup_is_case_sensitive() -> Result<()> {
        let (store, _dir) = temp_store().await?;
        store.upsert_credential("alice", "$argon2id$stub").await?;

        assert!(store.find_by_username("Alice").await?.is_none());
        assert!(store.find_by_username("alice").await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn upsert_replaces_existing_hash() -> Result<()> {
        let (store, _dir) = temp_store().await?;
        let hasher = PasswordHasher::new();

        store
            .upsert_credential("alice", &hasher.hash("old password")?)
            .await?;
        store
            .upsert_credential("alice", &hasher.hash("new password")?)
            .await?;

        let record = store
            .find_by_username("alice")
            .await?
            .context("record should exist")?;
        assert!(hasher.verify("new password", &record.password_hash));
        assert!(!hasher.verify("old password", &record.password_hash));

        Ok(())
    }
}
