//! drift: scheduled blob-to-Log-Analytics log shipper.
//!
//! Triggered by an external timer; one process execution is one run. All
//! configuration comes from the environment, so startup is construct
//! clients, run the coordinator, exit.

use std::process::ExitCode;
use std::sync::Arc;

use drift::{init_tracing, Config, ContainerProvider, LogAnalyticsSink, RunCoordinator};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let source = match ContainerProvider::for_azure(&config.storage_account, &config.container) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            eprintln!("Failed to create source container client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let archive =
        match ContainerProvider::for_azure(&config.storage_account, &config.archive_container) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                eprintln!("Failed to create archive container client: {e}");
                return ExitCode::FAILURE;
            }
        };
    let sink = match LogAnalyticsSink::new(&config) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            eprintln!("Failed to create sink client: {e}");
            return ExitCode::FAILURE;
        }
    };

    // The run itself never fails the process: every failure is logged and
    // the affected blobs wait for the next scheduled run.
    RunCoordinator::new(config, source, archive, sink)
        .run()
        .await;

    ExitCode::SUCCESS
}
