//! Layered configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. bundled defaults (`muster.toml` at the repository root)
//! 2. `~/.config/muster/muster.toml`
//! 3. `./muster.toml`
//! 4. an explicit file given on the command line
//! 5. `MUSTER__SECTION__KEY` environment variables

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use derive_getters::Getters;
use muster_database::database_url_from_env;
use muster_error::{ConfigError, ConfigErrorKind, MusterError, MusterResult};
use muster_persistence::PersistenceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../../../muster.toml");

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "MUSTER";

/// Which backing store to open.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL through a connection pool
    #[default]
    Postgres,
    /// In-process store; nothing survives a restart
    Memory,
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct DatabaseConfig {
    /// Connection URL; `DATABASE_URL` is used when unset
    #[serde(default)]
    url: Option<String>,

    /// Pooled connections
    #[serde(default = "default_pool_size")]
    pool_size: u32,

    /// Store implementation
    #[serde(default)]
    backend: StoreBackend,
}

fn default_pool_size() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            backend: StoreBackend::default(),
        }
    }
}

/// `[flush]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct FlushConfig {
    /// Seconds between background flushes of dirty tables
    #[serde(default = "default_interval_secs")]
    interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    30
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Complete Muster configuration.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct MusterConfig {
    /// Backing store connection
    #[serde(default)]
    database: DatabaseConfig,

    /// Flush controller tuning
    #[serde(default)]
    persistence: PersistenceConfig,

    /// Background flush schedule
    #[serde(default)]
    flush: FlushConfig,

    /// Log output
    #[serde(default)]
    logging: LoggingConfig,
}

impl MusterConfig {
    /// Load every layer, with `explicit` above the discovered files.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> MusterResult<Self> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_with_env(explicit, env)
    }

    /// Load bundled defaults overlaid with a single file.
    pub fn from_file(path: impl AsRef<Path>) -> MusterResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration from file");
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path));
        Self::finish(builder)
    }

    pub(crate) fn load_with_env(explicit: Option<&Path>, env: Environment) -> MusterResult<Self> {
        debug!("Loading configuration: env > explicit > current dir > home dir > bundled");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(config_dir) = dirs::config_dir() {
            let home_config = config_dir.join("muster").join("muster.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("muster").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        Self::finish(builder.add_source(env))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> MusterResult<Self> {
        let config: Self = builder
            .build()
            .and_then(Config::try_deserialize::<Self>)
            .map_err(|e| MusterError::from(ConfigError::new(ConfigErrorKind::Load(e.to_string()))))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> MusterResult<()> {
        if self.database.pool_size == 0 {
            return Err(ConfigError::invalid("database.pool_size", "must be at least 1").into());
        }
        if self.flush.interval_secs == 0 {
            return Err(ConfigError::invalid("flush.interval_secs", "must be at least 1").into());
        }
        if *self.persistence.chunk_size() == 0 {
            return Err(ConfigError::invalid("persistence.chunk_size", "must be at least 1").into());
        }
        if *self.persistence.max_attempts() == 0 {
            return Err(ConfigError::invalid("persistence.max_attempts", "must be at least 1").into());
        }
        if *self.persistence.full_scan_every() == 0 {
            return Err(ConfigError::invalid("persistence.full_scan_every", "must be at least 1").into());
        }
        Ok(())
    }

    /// Apply command-line overrides.
    pub fn with_overrides(
        mut self,
        database_url: Option<String>,
        backend: Option<StoreBackend>,
    ) -> Self {
        if let Some(url) = database_url {
            self.database.url = Some(url);
        }
        if let Some(backend) = backend {
            self.database.backend = backend;
        }
        self
    }

    /// Configured database URL, or `DATABASE_URL` when none is configured.
    pub fn database_url(&self) -> MusterResult<String> {
        match self.database.url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url.to_string()),
            _ => database_url_from_env()
                .map_err(|_| MusterError::from(ConfigError::new(ConfigErrorKind::MissingDatabaseUrl))),
        }
    }

    /// Time between background flushes.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush.interval_secs)
    }
}
