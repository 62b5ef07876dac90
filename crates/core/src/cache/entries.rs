//! Raw cache entry operations.
//!
//! Entries are `key -> serialized value` rows with an absolute expiry in
//! Unix milliseconds. Only the [`Memoizer`](super::Memoizer) is expected to
//! call these; everything else goes through `get_or_compute`.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored cache row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    /// JSON bytes of the cached value.
    pub value: Vec<u8>,
    /// Unix milliseconds when the row was written.
    pub stored_at: i64,
    /// Unix milliseconds after which the row is stale.
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl CacheDb {
    /// Get an entry by key, whether or not it has expired.
    ///
    /// Returns None if the key doesn't exist in the cache.
    pub async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key, value, stored_at, expires_at FROM cache_entries WHERE key = ?1")?;

                let result = stmt.query_row(params![key], |row| {
                    Ok(CacheEntry { key: row.get(0)?, value: row.get(1)?, stored_at: row.get(2)?, expires_at: row.get(3)? })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry only if it exists and has not expired yet.
    pub async fn get_fresh_entry(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let now = now_ms();
        Ok(self.get_entry(key).await?.filter(|entry| !entry.is_expired_at(now)))
    }

    /// Insert or replace an entry expiring `ttl_ms` milliseconds from now.
    ///
    /// Uses UPSERT semantics in a single statement, so concurrent writers to
    /// the same key leave exactly one complete row behind.
    pub async fn put_entry(&self, key: &str, value: &[u8], ttl_ms: i64) -> Result<(), Error> {
        if ttl_ms <= 0 {
            return Err(Error::InvalidTtl);
        }

        let key = key.to_string();
        let value = value.to_vec();
        let stored_at = now_ms();
        let expires_at = stored_at.saturating_add(ttl_ms);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, stored_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        stored_at = excluded.stored_at,
                        expires_at = excluded.expires_at",
                    params![key, value, stored_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose expiry has passed.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = now_ms();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Count live entries whose key starts with `prefix`.
    pub async fn count_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let pattern = format!("{}%", prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        let now = now_ms();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE key LIKE ?1 ESCAPE '\\' AND expires_at > ?2",
                    params![pattern, now],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
