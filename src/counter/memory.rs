use super::{CounterStore, StoreError};
use async_trait::async_trait;
use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;
use moka::Expiry;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Value {
    Counter(i64),
    Members(Arc<Mutex<HashSet<String>>>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    ttl: Duration,
}

/// Every write restarts the slot's own TTL; reads leave it alone.
struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(&self, _key: &String, slot: &Slot, _created_at: Instant) -> Option<Duration> {
        Some(slot.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        slot: &Slot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(slot.ttl)
    }
}

/// In-process counter store backed by a moka cache.
///
/// Per-key updates go through moka's entry compute API, which serializes
/// writers on the same key. Contents are lost when the process exits.
pub struct MemoryCounterStore {
    cache: Cache<String, Slot>,
    ttl: Duration,
}

impl MemoryCounterStore {
    pub fn new(max_keys: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_keys)
            .expire_after(SlotExpiry)
            .build();

        Self { cache, ttl }
    }
}

fn lock(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let ttl = self.ttl;
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| match existing.map(|e| e.into_value()) {
                None => Op::Put(Slot {
                    value: Value::Counter(1),
                    ttl,
                }),
                Some(Slot {
                    value: Value::Counter(n),
                    ..
                }) => Op::Put(Slot {
                    value: Value::Counter(n + 1),
                    ttl,
                }),
                Some(_) => Op::Nop,
            });

        match result {
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => {
                match entry.into_value().value {
                    Value::Counter(n) => Ok(n),
                    Value::Members(_) => Err(StoreError::WrongType(key.to_string())),
                }
            }
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let ttl = self.ttl;
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| match existing.map(|e| e.into_value()) {
                None => {
                    let mut set = HashSet::new();
                    set.insert(member.to_string());
                    Op::Put(Slot {
                        value: Value::Members(Arc::new(Mutex::new(set))),
                        ttl,
                    })
                }
                Some(Slot {
                    value: Value::Members(set),
                    ..
                }) => {
                    lock(&set).insert(member.to_string());
                    Op::Put(Slot {
                        value: Value::Members(set),
                        ttl,
                    })
                }
                Some(_) => Op::Nop,
            });

        match result {
            CompResult::Inserted(_) | CompResult::ReplacedWith(_) => Ok(()),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.cache
            .entry(key.to_string())
            .and_compute_with(|existing| match existing {
                Some(entry) => Op::Put(Slot {
                    ttl,
                    ..entry.into_value()
                }),
                None => Op::Nop,
            });
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<i64, StoreError> {
        match self.cache.get(key) {
            None => Ok(0),
            Some(Slot {
                value: Value::Counter(n),
                ..
            }) => Ok(n),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn get_set_size(&self, key: &str) -> Result<i64, StoreError> {
        match self.cache.get(key) {
            None => Ok(0),
            Some(Slot {
                value: Value::Members(set),
                ..
            }) => Ok(lock(&set).len() as i64),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn list_keys_matching(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.cache.invalidate(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryCounterStore {
        MemoryCounterStore::new(10_000, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_increment_returns_new_count() {
        let s = store();
        assert_eq!(s.increment("k").await.unwrap(), 1);
        assert_eq!(s.increment("k").await.unwrap(), 2);
        assert_eq!(s.get_value("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_keys_read_as_zero() {
        let s = store();
        assert_eq!(s.get_value("nope").await.unwrap(), 0);
        assert_eq!(s.get_set_size("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_deduplicates_members() {
        let s = store();
        s.add_to_set("v", "a").await.unwrap();
        s.add_to_set("v", "b").await.unwrap();
        s.add_to_set("v", "a").await.unwrap();
        assert_eq!(s.get_set_size("v").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_wrong_type_is_rejected() {
        let s = store();
        s.add_to_set("v", "a").await.unwrap();
        assert!(matches!(
            s.increment("v").await,
            Err(StoreError::WrongType(_))
        ));
        s.increment("c").await.unwrap();
        assert!(s.add_to_set("c", "a").await.is_err());
        assert!(s.get_set_size("c").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let s = Arc::new(store());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..250 {
                    s.increment("hot").await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(s.get_value("hot").await.unwrap(), 2000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_set_adds_are_not_lost() {
        let s = Arc::new(store());
        let mut handles = Vec::new();
        for worker in 0..8 {
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    s.add_to_set("uv", &format!("{worker}-{i}")).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(s.get_set_size("uv").await.unwrap(), 800);
    }

    #[tokio::test]
    async fn test_list_keys_by_prefix_and_delete() {
        let s = store();
        s.increment("analytics:pv:1:2024-01-01").await.unwrap();
        s.increment("analytics:pv:2:2024-01-01").await.unwrap();
        s.add_to_set("analytics:uv:1:2024-01-01", "x").await.unwrap();

        let mut keys = s.list_keys_matching("analytics:pv:").await.unwrap();
        keys.sort();
        assert_eq!(
            keys,
            vec!["analytics:pv:1:2024-01-01", "analytics:pv:2:2024-01-01"]
        );

        s.delete("analytics:pv:1:2024-01-01").await.unwrap();
        assert_eq!(s.get_value("analytics:pv:1:2024-01-01").await.unwrap(), 0);
        let keys = s.list_keys_matching("analytics:pv:").await.unwrap();
        assert_eq!(keys, vec!["analytics:pv:2:2024-01-01"]);
    }

    #[tokio::test]
    async fn test_keys_expire_after_ttl() {
        let s = MemoryCounterStore::new(100, Duration::from_millis(100));
        s.increment("short").await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(s.get_value("short").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writes_refresh_ttl() {
        let s = MemoryCounterStore::new(100, Duration::from_millis(400));
        s.increment("busy").await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        s.increment("busy").await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        // 500ms since creation, but only 250ms since the last write
        assert_eq!(s.get_value("busy").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_set_expiry_overrides_ttl() {
        let s = store();
        s.increment("k").await.unwrap();
        s.set_expiry("k", Duration::from_millis(50)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(s.get_value("k").await.unwrap(), 0);

        // no-op on missing keys
        s.set_expiry("missing", Duration::from_secs(1)).await.unwrap();
        assert_eq!(s.get_value("missing").await.unwrap(), 0);
    }
}
