// Library module for the keylock binary
// Configuration, logging setup and command execution on top of keylock-consistency

// Module declarations
pub mod command; // Command execution
pub mod metrics; // Metric descriptions
pub mod model; // Configuration and command line
pub mod startup; // Logging setup

pub use model::{Cli, Command, Configuration};
