//! Proof cache
//!
//! Stores verified proofs under a caller-chosen key so a counterparty can
//! fetch them later. The handle is opened once at start-up, cloned into the
//! request handlers and closed on shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use talent_zk_prover::{Circuit, DisclosureFlags, ProofJson};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{CacheBackend, CacheConfig, DEFAULT_MAX_ENTRIES};

const MAX_KEY_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A proof as kept in the cache
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProof {
    pub kind: Circuit,
    pub proof: ProofJson,
    pub public_signals: Vec<String>,
    /// Disclosure flags, for selective disclosure proofs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosure: Option<DisclosureFlags>,
}

/// Cache keys are short identifiers: ASCII alphanumerics plus `-_.:`
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

/// In-process store with optional expiry and a hard entry cap
pub struct MemoryStore {
    entries: HashMap<String, (Instant, StoredProof)>,
    ttl: Option<Duration>,
    max_entries: usize,
}

impl MemoryStore {
    fn new(ttl: Option<Duration>, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn is_expired(&self, stored_at: Instant, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(stored_at) >= ttl)
    }

    fn insert(&mut self, key: &str, record: StoredProof) {
        let now = Instant::now();
        if self.ttl.is_some() {
            let before = self.entries.len();
            let ttl = self.ttl;
            self.entries.retain(|_, (stored_at, _)| {
                ttl.map_or(true, |ttl| now.saturating_duration_since(*stored_at) < ttl)
            });
            let swept = before - self.entries.len();
            if swept > 0 {
                debug!(swept, "expired proofs removed");
            }
        }

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            // Evict the oldest entry
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (stored_at, _))| *stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
                debug!(key = %oldest, "evicted proof at capacity");
            }
        }

        self.entries.insert(key.to_string(), (now, record));
    }

    fn get(&mut self, key: &str) -> Option<StoredProof> {
        let now = Instant::now();
        let (stored_at, record) = self.entries.get(key)?;
        if self.is_expired(*stored_at, now) {
            self.entries.remove(key);
            return None;
        }
        Some(record.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub enum ProofCache {
    Memory(Arc<RwLock<MemoryStore>>),
    Redis {
        conn: MultiplexedConnection,
        prefix: String,
        ttl_secs: Option<u64>,
    },
}

impl ProofCache {
    /// In-memory cache without expiry, capped at the default entry count
    pub fn memory() -> Self {
        Self::memory_with(None, DEFAULT_MAX_ENTRIES)
    }

    pub fn memory_with(ttl: Option<Duration>, max_entries: usize) -> Self {
        Self::Memory(Arc::new(RwLock::new(MemoryStore::new(ttl, max_entries))))
    }

    pub async fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        match config.backend {
            CacheBackend::Memory => {
                info!(
                    max_entries = config.max_entries,
                    ttl = ?config.ttl,
                    "using in-memory proof cache"
                );
                Ok(Self::memory_with(config.ttl, config.max_entries))
            }
            CacheBackend::Redis => {
                let client = redis::Client::open(config.redis_url.as_str())?;
                let conn = client.get_multiplexed_tokio_connection().await?;
                info!(prefix = %config.key_prefix, "connected to redis proof cache");
                Ok(Self::Redis {
                    conn,
                    prefix: config.key_prefix.clone(),
                    ttl_secs: config.ttl.map(|ttl| ttl.as_secs()),
                })
            }
        }
    }

    pub fn backend(&self) -> CacheBackend {
        match self {
            Self::Memory(_) => CacheBackend::Memory,
            Self::Redis { .. } => CacheBackend::Redis,
        }
    }

    pub async fn put(&self, key: &str, record: &StoredProof) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => {
                store.write().insert(key, record.clone());
            }
            Self::Redis {
                conn,
                prefix,
                ttl_secs,
            } => {
                let mut conn = conn.clone();
                let redis_key = format!("{prefix}{key}");
                let value = serde_json::to_string(record)?;
                match ttl_secs {
                    Some(ttl) => {
                        let _: () = redis::cmd("SET")
                            .arg(&redis_key)
                            .arg(value)
                            .arg("EX")
                            .arg(*ttl)
                            .query_async(&mut conn)
                            .await?;
                    }
                    None => {
                        let _: () = conn.set(&redis_key, value).await?;
                    }
                }
            }
        }
        debug!(key, kind = %record.kind, "stored proof");
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<StoredProof>, CacheError> {
        match self {
            Self::Memory(store) => Ok(store.write().get(key)),
            Self::Redis { conn, prefix, .. } => {
                let mut conn = conn.clone();
                let raw: Option<String> = conn.get(format!("{prefix}{key}")).await?;
                Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
            }
        }
    }

    /// Release the backend. Remaining clones stay usable until dropped.
    pub async fn close(self) {
        match self {
            Self::Memory(store) => {
                let entries = store.read().len();
                info!(entries, "in-memory proof cache closed");
            }
            Self::Redis { conn, .. } => {
                drop(conn);
                info!("redis proof cache closed");
            }
        }
    }
}
