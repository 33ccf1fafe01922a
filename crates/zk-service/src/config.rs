//! Service configuration
//!
//! Built-in defaults, overridden by an optional TOML file and then by
//! environment variables. CLI flags are applied on top by the binary.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use talent_zk_prover::Circuit;
use tracing::info;

/// Where stored proofs live
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

impl std::str::FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => bail!("unknown cache backend `{other}` (expected memory or redis)"),
        }
    }
}

/// Entry cap of the in-memory cache when none is configured
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: String,
    pub key_prefix: String,
    /// Expiry of stored proofs; `None` keeps them until evicted
    pub ttl: Option<Duration>,
    /// Most proofs the in-memory backend holds before evicting the oldest
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: "redis://127.0.0.1/".to_string(),
            key_prefix: "zkp:proof:".to_string(),
            ttl: None,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Runtime configuration of the proof service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub listen: SocketAddr,
    pub artifacts_dir: PathBuf,
    pub circuits: Vec<Circuit>,
    /// Refuse to start when a circuit's artifacts cannot be loaded. When
    /// false the circuit is disabled and its endpoint answers 503.
    pub strict_artifacts: bool,
    pub max_body_bytes: usize,
    pub cache: CacheConfig,
}

impl ServiceConfig {
    /// Defaults, then the TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        let candidate = path.map(PathBuf::from).unwrap_or_else(default_config_path);

        if candidate.exists() {
            let contents = fs::read_to_string(&candidate)
                .with_context(|| format!("failed to read config at {}", candidate.display()))?;
            config
                .apply_toml(&contents)
                .with_context(|| format!("failed to parse config at {}", candidate.display()))?;
            info!(path = %candidate.display(), "loaded configuration overrides");
        } else if let Some(explicit) = path {
            bail!("configuration file {} not found", explicit.display());
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn apply_toml(&mut self, contents: &str) -> anyhow::Result<()> {
        let raw: RawServiceConfig = toml::from_str(contents)?;

        if let Some(listen) = raw.listen {
            self.listen = listen;
        }
        if let Some(dir) = raw.artifacts_dir {
            self.artifacts_dir = dir;
        }
        if let Some(circuits) = raw.circuits {
            self.circuits = circuits;
        }
        if let Some(strict) = raw.strict_artifacts {
            self.strict_artifacts = strict;
        }
        if let Some(max) = raw.max_body_bytes {
            self.max_body_bytes = max;
        }
        if let Some(cache) = raw.cache {
            if let Some(backend) = cache.backend {
                self.cache.backend = backend;
            }
            if let Some(url) = cache.redis_url {
                self.cache.redis_url = url;
            }
            if let Some(prefix) = cache.key_prefix {
                self.cache.key_prefix = prefix;
            }
            if let Some(ttl) = cache.ttl_secs {
                self.cache.ttl = (ttl > 0).then(|| Duration::from_secs(ttl));
            }
            if let Some(max) = cache.max_entries {
                if max == 0 {
                    bail!("cache.max_entries must be at least 1");
                }
                self.cache.max_entries = max;
            }
        }
        Ok(())
    }

    /// Environment overrides (highest priority after CLI flags)
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(listen) = var("TALENT_ZK_LISTEN") {
            self.listen = listen
                .parse()
                .with_context(|| format!("invalid TALENT_ZK_LISTEN `{listen}`"))?;
        }
        if let Some(dir) = var("TALENT_ZK_ARTIFACTS") {
            self.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(backend) = var("TALENT_ZK_CACHE") {
            self.cache.backend = backend.parse()?;
        }
        if let Some(url) = var("REDIS_URL") {
            self.cache.redis_url = url;
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            artifacts_dir: PathBuf::from("artifacts"),
            circuits: Circuit::ALL.to_vec(),
            strict_artifacts: true,
            max_body_bytes: 64 * 1024,
            cache: CacheConfig::default(),
        }
    }
}

fn default_config_path() -> PathBuf {
    PathBuf::from("talent-zk.toml")
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct RawServiceConfig {
    listen: Option<SocketAddr>,
    artifacts_dir: Option<PathBuf>,
    circuits: Option<Vec<Circuit>>,
    strict_artifacts: Option<bool>,
    max_body_bytes: Option<usize>,
    cache: Option<RawCacheConfig>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct RawCacheConfig {
    backend: Option<CacheBackend>,
    redis_url: Option<String>,
    key_prefix: Option<String>,
    ttl_secs: Option<u64>,
    max_entries: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.circuits, Circuit::ALL.to_vec());
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert!(config.strict_artifacts);
        assert_eq!(config.cache.max_entries, DEFAULT_MAX_ENTRIES);
    }

    #[test]
    fn toml_overrides() {
        let mut config = ServiceConfig::default();
        config
            .apply_toml(
                r#"
                listen = "0.0.0.0:9000"
                circuits = ["bid_validity"]
                strict_artifacts = false

                [cache]
                backend = "redis"
                ttl_secs = 3600
                max_entries = 500
                "#,
            )
            .unwrap();

        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.circuits, vec![Circuit::BidValidity]);
        assert!(!config.strict_artifacts);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.cache.key_prefix, "zkp:proof:");
        assert_eq!(config.cache.max_entries, 500);

        assert!(config.apply_toml("[cache]\nmax_entries = 0").is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        let mut config = ServiceConfig::default();
        assert!(config.apply_toml("listen_addr = \"0.0.0.0:1\"").is_err());
        assert!(config.apply_toml("circuits = [\"tier_membership\"]").is_err());
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALENT_ZK_LISTEN", "127.0.0.1:7000"),
            ("TALENT_ZK_ARTIFACTS", "/srv/keys"),
            ("TALENT_ZK_CACHE", "redis"),
            ("REDIS_URL", "redis://cache:6379/"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.listen.port(), 7000);
        assert_eq!(config.artifacts_dir, PathBuf::from("/srv/keys"));
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.redis_url, "redis://cache:6379/");

        let mut config = ServiceConfig::default();
        assert!(config
            .apply_env(|name| (name == "TALENT_ZK_LISTEN").then(|| "nope".to_string()))
            .is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(ServiceConfig::load(Some(&path)).is_err());

        let path = dir.path().join("service.toml");
        fs::write(&path, "max_body_bytes = 1024\n").unwrap();
        assert_eq!(ServiceConfig::load(Some(&path)).unwrap().max_body_bytes, 1024);
    }
}
