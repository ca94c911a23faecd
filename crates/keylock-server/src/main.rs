//! Main entry point for the keylock binary.
//!
//! Loads configuration, sets up logging, opens the lock store under the data directory and
//! runs one command. Results go to stdout as JSON; errors go to stderr with a non-zero exit.

use clap::Parser;
use keylock_common::AppError;
use keylock_server::{Cli, Configuration, command, metrics, startup};
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorOutput<'a> {
    code: i32,
    message: &'a str,
    detail: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let configuration = Configuration::new(cli.config.as_deref(), cli.data_dir.as_deref())?;

    let logging_guard = startup::init_logging(&configuration.logging_config())?;
    metrics::init_metrics();

    match command::run(&cli.command, &configuration) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            let err = AppError::from(e);
            let code = err.error_code();
            error!("Command failed: {}", err);

            let output = ErrorOutput {
                code: code.code,
                message: code.message,
                detail: err.to_string(),
            };
            eprintln!("{}", serde_json::to_string_pretty(&output)?);

            drop(logging_guard);
            std::process::exit(1);
        }
    }
}
