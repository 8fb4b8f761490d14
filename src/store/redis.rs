//! Redis Streams implementation of [`LogStore`].
//!
//! Maps the trait onto `XRANGE`/`XREVRANGE`/`XREAD BLOCK`/`TIME` over a
//! multiplexed async connection. The multiplexed handle is cheap to clone, so
//! the history producer task and the caller-facing operations share one
//! underlying connection without a pool.

use redis::AsyncCommands;
use redis::streams::{StreamId, StreamRangeReply, StreamReadOptions, StreamReadReply};
use tracing::debug;

use super::{LogEntry, LogStore, ServerTime};
use crate::error::{Result, StreamError};

/// [`LogStore`] backed by a Redis Streams instance.
pub struct RedisLogStore {
    connection: redis::aio::MultiplexedConnection,
}

impl RedisLogStore {
    /// Connect to a Redis instance by URL (`redis://` or `rediss://` for TLS).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            StreamError::connection_failed_with_source("invalid redis url", Box::new(e))
        })?;
        let connection = client.get_multiplexed_async_connection().await.map_err(|e| {
            StreamError::connection_failed_with_source("redis connection failed", Box::new(e))
        })?;
        debug!(url, "connected to redis log store");
        Ok(Self { connection })
    }

    fn convert_entries(ids: Vec<StreamId>) -> Vec<LogEntry> {
        ids.into_iter()
            .map(|entry| LogEntry {
                id: entry.id,
                fields: entry
                    .map
                    .into_iter()
                    .filter_map(|(name, value)| {
                        redis::from_redis_value::<Vec<u8>>(&value).ok().map(|bytes| (name, bytes))
                    })
                    .collect(),
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl LogStore for RedisLogStore {
    async fn server_time(&self) -> Result<ServerTime> {
        let mut conn = self.connection.clone();
        let (seconds, micros) = redis::cmd("TIME")
            .query_async::<_, (i64, i64)>(&mut conn)
            .await
            .map_err(|e| StreamError::store_error("server_time", e))?;
        Ok(ServerTime { seconds, micros })
    }

    async fn read_range(
        &self,
        stream: &str,
        min: &str,
        max: &str,
        count: usize,
    ) -> Result<Vec<LogEntry>> {
        let mut conn = self.connection.clone();
        let reply: StreamRangeReply = redis::cmd("XRANGE")
            .arg(stream)
            .arg(min)
            .arg(max)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| StreamError::store_error("read_range", e))?;
        Ok(Self::convert_entries(reply.ids))
    }

    async fn read_reverse_range(
        &self,
        stream: &str,
        min: &str,
        max: &str,
        count: usize,
    ) -> Result<Vec<LogEntry>> {
        let mut conn = self.connection.clone();
        // XREVRANGE takes the bounds high-to-low.
        let reply: StreamRangeReply = redis::cmd("XREVRANGE")
            .arg(stream)
            .arg(max)
            .arg(min)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| StreamError::store_error("read_reverse_range", e))?;
        Ok(Self::convert_entries(reply.ids))
    }

    async fn read_from(
        &self,
        stream: &str,
        from: &str,
        block_ms: u64,
        count: Option<usize>,
    ) -> Result<Vec<LogEntry>> {
        let mut conn = self.connection.clone();
        let mut options = StreamReadOptions::default().block(block_ms as usize);
        if let Some(count) = count {
            options = options.count(count);
        }
        let reply: StreamReadReply = conn
            .xread_options(&[stream], &[from], &options)
            .await
            .map_err(|e| StreamError::store_error("read_from", e))?;
        let entries =
            reply.keys.into_iter().next().map(|key| Self::convert_entries(key.ids)).unwrap_or_default();
        Ok(entries)
    }
}
