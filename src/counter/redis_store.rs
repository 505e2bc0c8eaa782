use super::{CounterStore, StoreError};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use std::time::Duration;

const SCAN_BATCH: usize = 500;

/// Counter store on a shared Redis instance; survives restarts of the server.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    ttl_secs: i64,
}

impl RedisCounterStore {
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Some(Duration::from_secs(5)));

        let client = Client::open(url)?;
        let conn = client.get_connection_manager_with_config(config).await?;

        Ok(Self {
            conn,
            ttl_secs: ttl.as_secs() as i64,
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, self.ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .sadd(key, member)
            .ignore()
            .expire(key, self.ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.expire(key, ttl.as_secs() as i64).await?;
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(key).await?;
        Ok(value.unwrap_or(0))
    }

    async fn get_set_size(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let size: i64 = conn.scard(key).await?;
        Ok(size)
    }

    async fn list_keys_matching(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        // SCAN rather than KEYS: never blocks the server on a large keyspace
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
