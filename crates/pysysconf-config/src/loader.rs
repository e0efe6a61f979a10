use pysysconf_core::{Environment, ProcessEnv, SysconfigError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::PysysconfConfig;

/// Loads the interpreter description.
pub struct ConfigLoader {
    config: PysysconfConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > PYSYSCONF_CONFIG env > ~/.pysysconf/pysysconf.toml
    pub fn resolve_path(explicit: Option<&Path>, env: &dyn Environment) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Some(p) = env.var("PYSYSCONF_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pysysconf")
            .join("pysysconf.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> pysysconf_core::Result<Self> {
        Self::load_with_env(path, &ProcessEnv)
    }

    /// Same as [`load`](Self::load), reading overrides from `env`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: &dyn Environment,
    ) -> pysysconf_core::Result<Self> {
        let config_path = Self::resolve_path(path, env);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            Self::parse(&raw).map_err(|e| {
                SysconfigError::Config(format!("failed to parse {}: {}", config_path.display(), e))
            })?
        } else {
            if path.is_some() {
                warn!(?config_path, "config file not found, using defaults");
            }
            PysysconfConfig::default()
        };

        // Apply environment variable overrides
        let config = Self::apply_env_overrides(config, env);

        // Validate config: log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(SysconfigError::Config(e));
            }
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Parse a `pysysconf.toml` document without touching the environment.
    pub fn parse(raw: &str) -> Result<PysysconfConfig, toml::de::Error> {
        toml::from_str::<PysysconfConfig>(raw)
    }

    /// The loaded configuration.
    pub fn get(&self) -> &PysysconfConfig {
        &self.config
    }

    pub fn into_config(self) -> PysysconfConfig {
        self.config
    }

    /// Path the configuration was (or would have been) read from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (PYSYSCONF_PREFIX, PYSYSCONF_VERSION, etc.)
    pub fn apply_env_overrides(
        mut config: PysysconfConfig,
        env: &dyn Environment,
    ) -> PysysconfConfig {
        if let Some(v) = env.var("PYSYSCONF_PREFIX") {
            config.interpreter.prefix = PathBuf::from(v);
        }
        if let Some(v) = env.var("PYSYSCONF_EXEC_PREFIX") {
            config.interpreter.exec_prefix = PathBuf::from(v);
        }
        if let Some(v) = env.var("PYSYSCONF_EXECUTABLE") {
            config.interpreter.executable = PathBuf::from(v);
        }
        if let Some(v) = env.var("PYSYSCONF_VERSION") {
            config.interpreter.version = v;
        }
        if let Some(v) = env.var("PYSYSCONF_ABIFLAGS") {
            config.interpreter.abiflags = v;
        }
        if let Some(v) = env.var("PYSYSCONF_PLATFORM") {
            config.interpreter.platform = v;
        }
        if let Some(v) = env.var("PYSYSCONF_LOG_LEVEL") {
            config.logging.level = v;
        }
        config
    }
}
