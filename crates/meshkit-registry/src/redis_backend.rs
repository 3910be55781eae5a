//! Redis-backed reference implementation of [`Registry`]/[`Discovery`].
//!
//! Layout on the wire:
//!
//! - primary key `gomind:services:{id}` -> JSON-serialized [`ServiceInfo`],
//!   `EXPIRE` set to the configured TTL (floor-enforced at
//!   `heartbeat_interval * 2`, never below it).
//! - secondary indexes, each a Redis set of ids: `gomind:types:{type}`,
//!   `gomind:names:{name}`, `gomind:caps:{capName}`.
//!
//! Registration writes the primary key and all three index entries in a
//! single pipelined transaction; unregister deletes all four. Discovery
//! picks the narrowest index available from the filter (name, then type,
//! then the intersection of per-capability index sets), fetches the
//! corresponding primary keys, and applies any remaining filter clauses in
//! memory — records whose primary key has already expired are dropped
//! rather than treated as an error (index lag tolerance).

use crate::traits::{Discovery, Registry, ServiceFilter};
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use meshkit_core::{ComponentType, ErrorKind, MeshError, ServiceId, ServiceInfo};
use redis::AsyncCommands;
use std::collections::HashSet;
use std::time::Duration;

fn primary_key(id: ServiceId) -> String {
    format!("gomind:services:{id}")
}

fn type_index_key(kind: ComponentType) -> String {
    let tag = match kind {
        ComponentType::Tool => "tool",
        ComponentType::Agent => "agent",
    };
    format!("gomind:types:{tag}")
}

fn name_index_key(name: &str) -> String {
    format!("gomind:names:{name}")
}

fn capability_index_key(capability: &str) -> String {
    format!("gomind:caps:{capability}")
}

/// Reference registry/discovery backend over a pooled Redis connection.
pub struct RedisRegistry {
    pool: Pool,
    ttl: Duration,
}

impl RedisRegistry {
    /// Connect to `redis_url`, enforcing the TTL floor of `heartbeat_interval * 2`
    /// — implementations must not reduce it below the heartbeat interval
    /// times 2.
    pub fn connect(
        redis_url: &str,
        ttl: Duration,
        heartbeat_interval: Duration,
    ) -> Result<Self, MeshError> {
        let floor = heartbeat_interval * 2;
        let ttl = if ttl < floor { floor } else { ttl };

        let pool = PoolConfig::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| {
                MeshError::new(
                    "RedisRegistry::connect",
                    ErrorKind::ConnectionFailed,
                    format!("failed to build redis pool for {redis_url}: {e}"),
                )
            })?;

        Ok(Self { pool, ttl })
    }

    async fn conn(&self, op: &str) -> Result<deadpool_redis::Connection, MeshError> {
        self.pool.get().await.map_err(|e| {
            MeshError::new(
                op,
                ErrorKind::ConnectionFailed,
                format!("failed to acquire redis connection: {e}"),
            )
        })
    }

    /// Fetch and deserialize the primary record for `id`, if present.
    async fn fetch(
        &self,
        conn: &mut deadpool_redis::Connection,
        id: ServiceId,
    ) -> Result<Option<ServiceInfo>, MeshError> {
        let raw: Option<String> = conn.get(primary_key(id)).await.map_err(|e| {
            MeshError::new(
                "RedisRegistry::fetch",
                ErrorKind::ConnectionFailed,
                format!("GET {}: {e}", primary_key(id)),
            )
        })?;
        match raw {
            None => Ok(None),
            Some(s) => serde_json::from_str(&s).map(Some).map_err(|e| {
                MeshError::new(
                    "RedisRegistry::fetch",
                    ErrorKind::InvalidConfiguration,
                    format!("corrupt service record for {id}: {e}"),
                )
            }),
        }
    }

    /// Read the id set behind `index_key`, tolerating its absence.
    async fn read_index(
        &self,
        conn: &mut deadpool_redis::Connection,
        index_key: &str,
    ) -> Result<HashSet<String>, MeshError> {
        let members: Vec<String> = conn.smembers(index_key).await.map_err(|e| {
            MeshError::new(
                "RedisRegistry::read_index",
                ErrorKind::ConnectionFailed,
                format!("SMEMBERS {index_key}: {e}"),
            )
        })?;
        Ok(members.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl Registry for RedisRegistry {
    fn supports_liveness(&self) -> bool {
        true
    }

    async fn register(&self, info: ServiceInfo) -> Result<(), MeshError> {
        let mut conn = self.conn("RedisRegistry::register").await?;
        let key = primary_key(info.id);
        let payload = serde_json::to_string(&info).map_err(|e| {
            MeshError::new(
                "RedisRegistry::register",
                ErrorKind::InvalidConfiguration,
                format!("failed to serialize service record: {e}"),
            )
        })?;
        let ttl_secs = self.ttl.as_secs().max(1);

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.set_ex(&key, &payload, ttl_secs);
        pipe.sadd(type_index_key(info.kind), info.id.to_string());
        pipe.sadd(name_index_key(&info.name), info.id.to_string());
        for cap in &info.capabilities {
            pipe.sadd(capability_index_key(&cap.name), info.id.to_string());
        }

        pipe.query_async::<_, ()>(&mut conn).await.map_err(|e| {
            MeshError::new(
                "RedisRegistry::register",
                ErrorKind::ConnectionFailed,
                format!("transactional write for {key} failed: {e}"),
            )
        })
    }

    async fn update_health(&self, id: ServiceId, status: meshkit_core::HealthStatus) -> Result<(), MeshError> {
        let mut conn = self.conn("RedisRegistry::update_health").await?;
        let mut info = self.fetch(&mut conn, id).await?.ok_or_else(|| {
            MeshError::new(
                "RedisRegistry::update_health",
                ErrorKind::ServiceNotFound,
                format!("no service registered with id {id}"),
            )
        })?;
        info.health = status;
        info.touch();
        drop(conn);
        self.register(info).await
    }

    async fn unregister(&self, id: ServiceId) -> Result<(), MeshError> {
        let mut conn = self.conn("RedisRegistry::unregister").await?;
        let Some(info) = self.fetch(&mut conn, id).await? else {
            return Ok(());
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(primary_key(id));
        pipe.srem(type_index_key(info.kind), id.to_string());
        pipe.srem(name_index_key(&info.name), id.to_string());
        for cap in &info.capabilities {
            pipe.srem(capability_index_key(&cap.name), id.to_string());
        }

        pipe.query_async::<_, ()>(&mut conn).await.map_err(|e| {
            MeshError::new(
                "RedisRegistry::unregister",
                ErrorKind::ConnectionFailed,
                format!("transactional delete for {id} failed: {e}"),
            )
        })
    }
}

#[async_trait::async_trait]
impl Discovery for RedisRegistry {
    async fn discover(&self, filter: ServiceFilter) -> Result<Vec<ServiceInfo>, MeshError> {
        let mut conn = self.conn("RedisRegistry::discover").await?;

        // Narrow the candidate id set as much as the filter allows before
        // fetching any records, preferring name, then type, then the
        // intersection of per-capability index sets.
        let mut candidates: Option<HashSet<String>> = None;

        if let Some(name) = &filter.name {
            candidates = Some(self.read_index(&mut conn, &name_index_key(name)).await?);
        } else if let Some(kind) = filter.kind {
            candidates = Some(self.read_index(&mut conn, &type_index_key(kind)).await?);
        }

        for cap in &filter.capabilities {
            let set = self.read_index(&mut conn, &capability_index_key(cap)).await?;
            candidates = Some(match candidates {
                Some(existing) => existing.intersection(&set).cloned().collect(),
                None => set,
            });
        }

        let ids: Vec<ServiceId> = match candidates {
            Some(ids) => ids
                .into_iter()
                .filter_map(|s| s.parse::<ServiceId>().ok())
                .collect(),
            None => {
                // No narrowing clause present at all: fall back to the union
                // of every type index, since there is no global id set.
                let mut all = HashSet::new();
                for kind in [ComponentType::Tool, ComponentType::Agent] {
                    all.extend(self.read_index(&mut conn, &type_index_key(kind)).await?);
                }
                all.into_iter().filter_map(|s| s.parse::<ServiceId>().ok()).collect()
            }
        };

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            // Index lag: the index may still name an id whose primary key
            // has already expired. Drop it rather than erroring.
            if let Some(info) = self.fetch(&mut conn, id).await? {
                if filter.matches(&info) {
                    out.push(info);
                }
            }
        }
        Ok(out)
    }
}
