pub mod api; // HTTP API
pub mod config;
pub mod ledger; // ComplaintRegistry contract client
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::server::ServerError;
use crate::api::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::ledger::{Ledger, LedgerError, RegistryClient};
use crate::pipeline::processor::{build_processor, ProcessingError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger client setup failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Pipeline setup failed: {0}")]
    Processor(#[from] ProcessingError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load configuration from the environment, wire the pipeline and serve
/// the API until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        environment = ?config.environment,
        bind = %config.bind_addr,
        "{} starting v{}",
        config::APP_NAME,
        config::APP_VERSION
    );

    // Blocking HTTP clients are built and dropped outside the async runtime.
    let ledger: Arc<dyn Ledger> = Arc::new(RegistryClient::from_config(&config.ledger)?);
    match ledger.network_id() {
        Ok(network_id) => tracing::info!(
            network_id,
            contract = ledger.contract_address(),
            "Ledger node reachable"
        ),
        Err(e) => tracing::warn!(error = %e, "Ledger node not reachable at startup"),
    }

    let processor = Arc::new(build_processor(&config, ledger.clone())?);
    let ctx = ApiContext::from_config(&config, processor, ledger);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;
    let result = runtime.block_on(api::serve(ctx.clone(), config.bind_addr));
    drop(runtime);
    drop(ctx);

    tracing::info!("{} stopped", config::APP_NAME);
    result.map_err(StartupError::from)
}
