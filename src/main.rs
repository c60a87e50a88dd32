//! This file defines the vizz binary entry point.

use std::error::Error;

use vizz::app;
use vizz::cli;
use vizz::metrics;
use vizz::server;
use vizz::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    ::tracing::debug!("{:?}", args);
    metrics::register_metrics();
    let service = match app::service(&args) {
        Ok(service) => service,
        Err(err) => {
            ::tracing::error!("Failed to open document store: {}", err);
            std::process::exit(1)
        }
    };
    let result = server::serve(&args, service).await;
    if let Err(err) = &result {
        ::tracing::error!("{}", err);
        let mut current = err.source();
        while let Some(source) = current {
            ::tracing::error!("Caused by: {}", source);
            current = source.source();
        }
    }
    tracing::shutdown_tracing();
    if result.is_err() {
        std::process::exit(1)
    }
}
