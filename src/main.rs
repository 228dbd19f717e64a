mod app;
mod bridge;
mod classifier;
mod config;
mod controller;
mod domain;
mod infrastructure;
mod navigation;
mod policy;
mod report;
mod state;

use std::time::Duration;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let logs_dir = directories::ensure_logs_dir(&config.directories)?;
    logging::init_tracing(&config, &logs_dir)?;

    // one thread is enough: every handler is short and the classifier calls are awaited
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        let (shutdown, _) = shutdown::Shutdown::new();
        shutdown::install_signal_handlers(shutdown.clone());

        let app = app::PhishGateApp::initialize(config, shutdown).await?;
        app.run().await
    });

    // a stdin read may still be parked on the blocking pool
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}
