use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MinibrsError, Result};

/// Root application configuration, loaded from `~/.config/minibrs/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Json,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid backend: {s} (expected sqlite or json)")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    /// Overrides `<data_dir>/minibrs.db` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub size: usize,
    pub connection_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub max_lifetime_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub context_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("minibrs");

        Self {
            data_dir: data_dir.to_string_lossy().to_string(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 10,
            connection_timeout_ms: 30_000,
            idle_timeout_ms: 600_000,
            max_lifetime_ms: 1_800_000,
        }
    }
}

impl PoolConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_millis(self.max_lifetime_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            context_path: "/".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/minibrs/config.toml`,
    /// or `$MINIBRS_CONFIG` when set.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("MINIBRS_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("minibrs")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Apply `MINIBRS_DATA_DIR`, `MINIBRS_BACKEND` and `MINIBRS_PORT`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("MINIBRS_DATA_DIR") {
            self.core.data_dir = dir;
        }
        if let Some(backend) = lookup("MINIBRS_BACKEND") {
            self.database.backend = backend.parse().map_err(MinibrsError::Config)?;
        }
        if let Some(port) = lookup("MINIBRS_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| MinibrsError::Config(format!("Invalid MINIBRS_PORT: {port}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.pool.size == 0 {
            return Err(MinibrsError::Config(
                "database.pool.size must be at least 1".to_string(),
            ));
        }
        if !self.server.context_path.starts_with('/') {
            return Err(MinibrsError::Config(format!(
                "server.context_path must start with '/': {}",
                self.server.context_path
            )));
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.core.data_dir)
    }

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        match &self.database.path {
            Some(path) => PathBuf::from(path),
            None => self.data_dir().join("minibrs.db"),
        }
    }

    /// Directory holding the JSON backend's entity files.
    pub fn json_dir(&self) -> PathBuf {
        self.data_dir().join("json")
    }

    /// Flattened `key = value` view used by `minibrs config`.
    pub fn key_values(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        map.insert("core.data_dir", self.core.data_dir.clone());
        map.insert("database.backend", self.database.backend.to_string());
        map.insert(
            "database.path",
            self.database_path().to_string_lossy().to_string(),
        );
        map.insert("database.pool.size", self.database.pool.size.to_string());
        map.insert(
            "database.pool.connection_timeout_ms",
            self.database.pool.connection_timeout_ms.to_string(),
        );
        map.insert(
            "database.pool.idle_timeout_ms",
            self.database.pool.idle_timeout_ms.to_string(),
        );
        map.insert(
            "database.pool.max_lifetime_ms",
            self.database.pool.max_lifetime_ms.to_string(),
        );
        map.insert("json_dir", self.json_dir().to_string_lossy().to_string());
        map.insert("server.host", self.server.host.clone());
        map.insert("server.port", self.server.port.to_string());
        map.insert("server.context_path", self.server.context_path.clone());
        map.insert("logging.level", self.logging.level.clone());
        map
    }
}
