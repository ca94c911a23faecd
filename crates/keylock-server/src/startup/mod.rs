pub mod logging;

pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
