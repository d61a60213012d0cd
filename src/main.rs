//! This file defines the taxi-analysis binary entry point.

use taxi_analysis::app;
use taxi_analysis::app_state::AppState;
use taxi_analysis::cli;
use taxi_analysis::loader;
use taxi_analysis::metrics;
use taxi_analysis::server;
use taxi_analysis::tracing;

use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing();
    ::tracing::debug!(?args, "parsed command line arguments");
    metrics::register_metrics();

    let data_dir = args.data_dir.clone();
    let table = match tokio::task::spawn_blocking(move || loader::load(Path::new(&data_dir))).await
    {
        Ok(Ok(table)) => table,
        Ok(Err(err)) => {
            ::tracing::error!("{}", err);
            let mut current = err.source();
            while let Some(source) = current {
                ::tracing::error!("Caused by: {}", source);
                current = source.source();
            }
            exit(1)
        }
        Err(err) => {
            ::tracing::error!("loading task failed: {}", err);
            exit(1)
        }
    };

    let state = Arc::new(AppState::new(&args, Arc::new(table)));
    let service = app::service(state);
    server::serve(&args, service).await;
}
