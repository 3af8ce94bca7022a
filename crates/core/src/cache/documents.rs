//! Keyed document storage operations.
//!
//! Each row maps a resource name to the raw bytes of a fetched document plus
//! TTL metadata. `get_document` deliberately returns expired rows: a stale
//! copy is the fallback when a refresh fails, so expiry is a signal for the
//! caller, not a deletion trigger.

use super::connection::CacheDb;
use crate::Error;
use chrono::{DateTime, Duration, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached document with its TTL metadata.
#[derive(Debug, Clone)]
pub struct CachedDocument {
    pub key: String,
    pub body: Vec<u8>,
    pub fetched_at: String,
    pub expires_at: String,
}

impl CachedDocument {
    /// Whether the TTL has elapsed. Unparsable timestamps count as expired.
    pub fn is_expired(&self) -> bool {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|t| t <= Utc::now())
            .unwrap_or(true)
    }
}

impl CacheDb {
    /// Get a document by key, expired or not.
    ///
    /// Returns None if the key doesn't exist in the cache.
    pub async fn get_document(&self, key: &str) -> Result<Option<CachedDocument>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedDocument>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key, body, fetched_at, expires_at FROM documents WHERE key = ?1")?;

                let result = stmt.query_row(params![key], |row| {
                    Ok(CachedDocument {
                        key: row.get(0)?,
                        body: row.get(1)?,
                        fetched_at: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                });

                match result {
                    Ok(doc) => Ok(Some(doc)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a document wholesale.
    ///
    /// Uses UPSERT semantics; a concurrent reader sees either the old row or
    /// the fully-written new one, never a partial value.
    pub async fn put_document(&self, key: &str, body: &[u8], ttl_seconds: i64) -> Result<(), Error> {
        let key = key.to_string();
        let body = body.to_vec();
        let fetched_at = Utc::now().to_rfc3339();
        let expires_at = (Utc::now() + Duration::seconds(ttl_seconds)).to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO documents (key, body, fetched_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        body = excluded.body,
                        fetched_at = excluded.fetched_at,
                        expires_at = excluded.expires_at",
                    params![key, body, fetched_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired documents.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_documents(&self) -> Result<u64, Error> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM documents WHERE expires_at < ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
