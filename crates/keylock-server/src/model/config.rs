//! Configuration management for the keylock binary
//!
//! Sources, lowest precedence first: built-in defaults, the YAML file, `KEYLOCK__*`
//! environment variables, command line overrides.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigBuilder, Environment, builder::DefaultState};
use keylock_common::{DEFAULT_LEASE_MS, ENV_PREFIX, KeylockError};

use crate::startup::LoggingConfig;

use super::constants::{
    DATA_DIR_PROPERTY, DEFAULT_CONFIG_FILE, DEFAULT_DATA_DIR, DEFAULT_LEASE_MS_PROPERTY,
    DEFAULT_LOGS_LEVEL, DEFAULT_LOGS_PATH, DEFAULT_LOGS_ROTATION, ENV_SEPARATOR,
    LOGS_CONSOLE_PROPERTY, LOGS_FILE_PROPERTY, LOGS_LEVEL_PROPERTY, LOGS_PATH_PROPERTY,
    LOGS_ROTATION_PROPERTY,
};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "keylock", version, about = "Lease-based read/write lock store")]
pub struct Cli {
    /// Configuration file, defaults to conf/application.yml when present
    #[arg(short = 'c', long = "config", env = "KEYLOCK_CONFIG")]
    pub config: Option<String>,
    /// Overrides keylock.data.dir
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Acquire or renew a read or write lease
    Acquire(AcquireArgs),
    /// Release a lease held by a process
    Release(ReleaseArgs),
    /// Show the current state of a lock
    Get(LockArgs),
    /// Remove a lock regardless of its holders
    Delete(LockArgs),
    /// Write every lock record to a file
    Snapshot {
        #[arg(long)]
        output: PathBuf,
    },
    /// Replace every lock record with the content of a snapshot file
    Restore {
        #[arg(long)]
        input: PathBuf,
    },
}

/// Identifies one lock
#[derive(Debug, Clone, Args)]
pub struct LockArgs {
    #[arg(long)]
    pub account: u64,
    #[arg(long)]
    pub namespace: String,
    #[arg(long)]
    pub lock: String,
    /// Logical time in nanoseconds, defaults to the wall clock
    #[arg(long, allow_hyphen_values = true)]
    pub now: Option<i64>,
}

#[derive(Debug, Clone, Args)]
pub struct AcquireArgs {
    #[command(flatten)]
    pub lock: LockArgs,
    #[arg(long)]
    pub process: String,
    /// Take a write lease instead of a read lease
    #[arg(long)]
    pub write: bool,
    /// Lease length, defaults to keylock.lock.default_lease_ms
    #[arg(long)]
    pub lease_ms: Option<u64>,
    /// Absolute expiry in nanoseconds, takes precedence over --lease-ms
    #[arg(long, allow_hyphen_values = true)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Args)]
pub struct ReleaseArgs {
    #[command(flatten)]
    pub lock: LockArgs,
    #[arg(long)]
    pub process: String,
}

/// Application configuration loaded from defaults, config file and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

fn config_error(e: config::ConfigError) -> KeylockError {
    KeylockError::ConfigError(e.to_string())
}

impl Configuration {
    /// Load the configuration. An explicit `config_file` must exist; the default file is
    /// optional.
    pub fn new(config_file: Option<&str>, data_dir: Option<&str>) -> Result<Self, KeylockError> {
        let mut builder = Self::defaults().map_err(config_error)?;

        builder = match config_file {
            Some(path) => builder.add_source(config::File::with_name(path).required(true)),
            None => {
                builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
            }
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .keep_prefix(true)
                .try_parsing(true),
        );

        if let Some(v) = data_dir {
            builder = builder
                .set_override(DATA_DIR_PROPERTY, v)
                .map_err(config_error)?;
        }

        let config = builder.build().map_err(config_error)?;
        Ok(Configuration { config })
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default(DATA_DIR_PROPERTY, DEFAULT_DATA_DIR)?
            .set_default(DEFAULT_LEASE_MS_PROPERTY, DEFAULT_LEASE_MS as i64)?
            .set_default(LOGS_PATH_PROPERTY, DEFAULT_LOGS_PATH)?
            .set_default(LOGS_LEVEL_PROPERTY, DEFAULT_LOGS_LEVEL)?
            .set_default(LOGS_CONSOLE_PROPERTY, true)?
            .set_default(LOGS_FILE_PROPERTY, true)?
            .set_default(LOGS_ROTATION_PROPERTY, DEFAULT_LOGS_ROTATION)
    }

    pub fn data_dir(&self) -> String {
        self.config
            .get_string(DATA_DIR_PROPERTY)
            .unwrap_or(DEFAULT_DATA_DIR.to_string())
    }

    /// Lease applied when `acquire` gets neither `--lease-ms` nor `--expires-at`
    pub fn default_lease_ms(&self) -> Result<u64, KeylockError> {
        let value = self
            .config
            .get_int(DEFAULT_LEASE_MS_PROPERTY)
            .map_err(config_error)?;
        u64::try_from(value).map_err(|_| {
            KeylockError::ConfigError(format!(
                "{} must not be negative, got {}",
                DEFAULT_LEASE_MS_PROPERTY, value
            ))
        })
    }

    pub fn logs_path(&self) -> String {
        self.config
            .get_string(LOGS_PATH_PROPERTY)
            .unwrap_or(DEFAULT_LOGS_PATH.to_string())
    }

    pub fn logs_level(&self) -> String {
        self.config
            .get_string(LOGS_LEVEL_PROPERTY)
            .unwrap_or(DEFAULT_LOGS_LEVEL.to_string())
    }

    pub fn logs_console(&self) -> bool {
        self.config.get_bool(LOGS_CONSOLE_PROPERTY).unwrap_or(true)
    }

    pub fn logs_file(&self) -> bool {
        self.config.get_bool(LOGS_FILE_PROPERTY).unwrap_or(true)
    }

    /// `daily`, `hourly` or `never`
    pub fn logs_rotation(&self) -> String {
        self.config
            .get_string(LOGS_ROTATION_PROPERTY)
            .unwrap_or(DEFAULT_LOGS_ROTATION.to_string())
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            Some(self.logs_path()),
            self.logs_console(),
            self.logs_file(),
            self.logs_level(),
            self.logs_rotation(),
        )
    }
}
