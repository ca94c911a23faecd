// Configuration property names and defaults

pub const DATA_DIR_PROPERTY: &str = "keylock.data.dir";
pub const DEFAULT_DATA_DIR: &str = "./data";

pub const DEFAULT_LEASE_MS_PROPERTY: &str = "keylock.lock.default_lease_ms";

pub const LOGS_PATH_PROPERTY: &str = "keylock.logs.path";
pub const DEFAULT_LOGS_PATH: &str = "./logs";
pub const LOGS_LEVEL_PROPERTY: &str = "keylock.logs.level";
pub const DEFAULT_LOGS_LEVEL: &str = "info";
pub const LOGS_CONSOLE_PROPERTY: &str = "keylock.logs.console";
pub const LOGS_FILE_PROPERTY: &str = "keylock.logs.file";
pub const LOGS_ROTATION_PROPERTY: &str = "keylock.logs.rotation";
pub const DEFAULT_LOGS_ROTATION: &str = "daily";

/// Configuration file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";

/// Separator between the environment prefix and each key segment
pub const ENV_SEPARATOR: &str = "__";
