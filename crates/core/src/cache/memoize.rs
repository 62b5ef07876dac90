//! Get-or-compute memoization over the cache store.
//!
//! A hit is a present, unexpired entry that deserializes cleanly. Anything
//! else runs `compute` once, stores its JSON with `now + ttl` and returns it.
//!
//! Concurrent callers for the same key are coalesced: they queue on a per-key
//! in-flight lock, the first one computes and stores, and the rest re-read the
//! store and get a hit. Callers for different keys never wait on each other.

use super::connection::CacheDb;
use super::keys;
use crate::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;
use tokio::sync::Mutex;

type InFlightTable = StdMutex<HashMap<String, Weak<Mutex<()>>>>;

/// Whether a lookup was served from the store or computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
        }
    }
}

/// A memoized value together with how it was obtained.
#[derive(Debug, Clone)]
pub struct Memoized<V> {
    pub value: V,
    pub outcome: CacheOutcome,
}

/// TTL memoization cache.
///
/// Owns the store handle for the process lifetime; cloning shares both the
/// handle and the in-flight table.
#[derive(Clone, Debug)]
pub struct Memoizer {
    db: CacheDb,
    in_flight: Arc<InFlightTable>,
}

/// Holds a key's in-flight lock and removes the table entry once the last
/// holder goes away, including when the caller's future is dropped.
struct FlightSlot<'a> {
    key: &'a str,
    lock: Arc<Mutex<()>>,
    table: &'a InFlightTable,
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Our own handle is released only after this returns, so a holder
        // dropping concurrently can leave a dead entry; acquire_slot prunes it.
        if Arc::strong_count(&self.lock) == 1 {
            table.remove(self.key);
        }
    }
}

impl Memoizer {
    pub fn new(db: CacheDb) -> Self {
        Self { db, in_flight: Arc::new(StdMutex::new(HashMap::new())) }
    }

    /// The underlying store handle.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Close the store. Pending lookups on other clones fail afterwards.
    pub async fn close(self) -> Result<(), Error> {
        self.db.close().await
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// # Errors
    ///
    /// - `InvalidTtl` if `ttl` is zero
    /// - the error returned by `compute`, in which case nothing is stored
    /// - `Serialization` if a present entry cannot be decoded as `V`; the
    ///   value is not recomputed
    /// - `Database` on store failures
    pub async fn get_or_compute<V, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<V, Error>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, Error>>,
    {
        self.memoize(key, ttl, compute).await.map(|memoized| memoized.value)
    }

    /// Same as [`get_or_compute`](Self::get_or_compute), also reporting hit or miss.
    pub async fn memoize<V, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<Memoized<V>, Error>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, Error>>,
    {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        if ttl_ms <= 0 {
            return Err(Error::InvalidTtl);
        }

        let memoized = match self.lookup::<V>(key).await? {
            Some(value) => Memoized { value, outcome: CacheOutcome::Hit },
            None => {
                let slot = self.acquire_slot(key);
                let _guard = slot.lock.lock().await;

                // A caller that held the lock before us may have stored it already.
                match self.lookup::<V>(key).await? {
                    Some(value) => Memoized { value, outcome: CacheOutcome::Hit },
                    None => {
                        let value = compute().await?;
                        let bytes = serde_json::to_vec(&value)?;
                        self.db.put_entry(key, &bytes, ttl_ms).await?;
                        Memoized { value, outcome: CacheOutcome::Miss }
                    }
                }
            }
        };

        tracing::debug!(key, prefix = keys::prefix_of(key), result = memoized.outcome.as_str(), "cache lookup");

        Ok(memoized)
    }

    async fn lookup<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, Error> {
        match self.db.get_fresh_entry(key).await? {
            Some(entry) => serde_json::from_slice(&entry.value)
                .map(Some)
                .map_err(|e| Error::Serialization(format!("cached value for '{key}' is unreadable: {e}"))),
            None => Ok(None),
        }
    }

    fn acquire_slot<'a>(&'a self, key: &'a str) -> FlightSlot<'a> {
        let mut table = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let lock = match table.get(key).and_then(Weak::upgrade) {
            Some(lock) => lock,
            None => {
                table.retain(|_, weak| weak.strong_count() > 0);
                let lock = Arc::new(Mutex::new(()));
                table.insert(key.to_string(), Arc::downgrade(&lock));
                lock
            }
        };
        FlightSlot { key, lock, table: &self.in_flight }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Title {
        name: String,
        year: i32,
    }

    fn title() -> Title {
        Title { name: "Dark".into(), year: 2017 }
    }

    async fn memoizer() -> Memoizer {
        Memoizer::new(CacheDb::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let memo = memoizer().await;
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        let first = memo
            .memoize("imdb.title : tt5753856", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(title())
            })
            .await
            .unwrap();
        assert_eq!(first.outcome, CacheOutcome::Miss);
        assert_eq!(first.value, title());

        let second: Memoized<Title> = memo
            .memoize("imdb.title : tt5753856", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(title())
            })
            .await
            .unwrap();
        assert_eq!(second.outcome, CacheOutcome::Hit);
        assert_eq!(second.value, title());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let memo = memoizer().await;
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_millis(50);

        for _ in 0..2 {
            let _: Title = memo
                .get_or_compute("k", ttl, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(title())
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;

        let again = memo
            .memoize("k", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(title())
            })
            .await
            .unwrap();
        assert_eq!(again.outcome, CacheOutcome::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_compute_stores_nothing() {
        let memo = memoizer().await;
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        let result: Result<Title, Error> = memo
            .get_or_compute("failing", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::UpstreamUnavailable("connection refused".into()))
            })
            .await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
        assert!(memo.db().get_entry("failing").await.unwrap().is_none());

        let retry = memo
            .memoize("failing", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(title())
            })
            .await
            .unwrap();
        assert_eq!(retry.outcome, CacheOutcome::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error_not_a_recompute() {
        let memo = memoizer().await;
        memo.db().put_entry("corrupt", b"{not json", 60_000).await.unwrap();
        let calls = AtomicUsize::new(0);

        let result: Result<Title, Error> = memo
            .get_or_compute("corrupt", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(title())
            })
            .await;

        assert!(matches!(result, Err(Error::Serialization(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let memo = memoizer().await;
        let calls = AtomicUsize::new(0);

        let result: Result<Title, Error> = memo
            .get_or_compute("k", Duration::ZERO, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(title())
            })
            .await;

        assert!(matches!(result, Err(Error::InvalidTtl)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_compute_once() {
        let memo = memoizer().await;
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let memo = memo.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                memo.get_or_compute("subdivx.subtitles.v1 : Dark S01E01", Duration::from_secs(60), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(title())
                })
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), title());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.in_flight_len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_keys_do_not_block() {
        let memo = memoizer().await;
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow_memo = memo.clone();
        let slow = tokio::spawn(async move {
            slow_memo
                .get_or_compute("slow", Duration::from_secs(60), || async move {
                    let _ = release_rx.await;
                    Ok(title())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;

        let fast = tokio::time::timeout(
            Duration::from_secs(2),
            memo.get_or_compute("fast", Duration::from_secs(60), || async { Ok(title()) }),
        )
        .await
        .expect("fast key blocked behind slow key");
        assert_eq!(fast.unwrap(), title());

        release_tx.send(()).unwrap();
        assert_eq!(slow.await.unwrap().unwrap(), title());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dead_in_flight_entries_are_pruned() {
        let memo = memoizer().await;
        let released = Arc::new(Mutex::new(()));
        memo.in_flight.lock().unwrap().insert("imdb.title : tt1".into(), Arc::downgrade(&released));
        drop(released);
        assert_eq!(memo.in_flight_len(), 1);

        let value: i32 = memo
            .get_or_compute("imdb.title : tt2", Duration::from_secs(60), || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(memo.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_waiter_computes_after_leader_fails() {
        let memo = memoizer().await;
        let calls = Arc::new(AtomicUsize::new(0));

        let leader_memo = memo.clone();
        let leader_calls = Arc::clone(&calls);
        let leader = tokio::spawn(async move {
            leader_memo
                .get_or_compute::<Title, _, _>("flaky", Duration::from_secs(60), || async move {
                    leader_calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err(Error::UpstreamProtocol("status 503".into()))
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        let follower_calls = Arc::clone(&calls);
        let follower = memo
            .memoize("flaky", Duration::from_secs(60), || async move {
                follower_calls.fetch_add(1, Ordering::SeqCst);
                Ok(title())
            })
            .await
            .unwrap();

        assert!(leader.await.unwrap().is_err());
        assert_eq!(follower.outcome, CacheOutcome::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
