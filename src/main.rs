//! Mock adapter server.
//!
//! Serves fixture-backed mock responses through the adapter pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────────┐
//!                        │                   MOCK ADAPTER                     │
//!                        │                                                    │
//!     Client Request     │  ┌──────┐   ┌───────────┐   ┌─────────────────┐   │
//!     ───────────────────┼─▶│ CORS │──▶│ normalize │──▶│ preferences +   │   │
//!                        │  └──────┘   └───────────┘   │ config merge    │   │
//!                        │                             └────────┬────────┘   │
//!                        │                                      ▼            │
//!                        │                             ┌─────────────────┐   │
//!                        │                             │     engine      │   │
//!                        │                             └────────┬────────┘   │
//!                        │                                      ▼            │
//!     Client Response    │  ┌──────────────────┐       ┌─────────────────┐   │
//!     ◀──────────────────┼──│ response / error │◀──────│   diagnostics   │   │
//!                        │  │     emitter      │       │ (sl-violations) │   │
//!                        │  └──────────────────┘       └─────────────────┘   │
//!                        └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use mock_adapter::config::{read_config, validate_config, AdapterConfig, ConfigError};
use mock_adapter::engine::fixture::{load_operations, FixtureEngine};
use mock_adapter::lifecycle::signals::wait_for_signal;
use mock_adapter::mocking::{MockConfig, MockOptions};
use mock_adapter::observability::{logging, metrics};
use mock_adapter::MockServer;

#[derive(Parser)]
#[command(name = "mock-adapter")]
#[command(about = "Serve mocked HTTP responses from fixtures", long_about = None)]
struct Cli {
    /// TOML fixture file with the operations to serve.
    #[arg(short, long)]
    fixtures: PathBuf,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,

    /// Fail requests whose mocked response violates the contract.
    #[arg(long)]
    errors: bool,

    /// Enable or disable CORS handling.
    #[arg(long)]
    cors: Option<bool>,

    /// Prefer dynamically generated payloads by default.
    #[arg(short, long)]
    dynamic: bool,
}

impl Cli {
    fn apply(&self, config: &mut AdapterConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if self.errors {
            config.engine.errors = true;
        }
        if let Some(cors) = self.cors {
            config.cors = cors;
        }
        if self.dynamic {
            let options = match &config.engine.mock {
                MockConfig::Enabled(options) => options.clone(),
                MockConfig::Disabled => MockOptions::default(),
            };
            config.engine.mock = MockConfig::Enabled(MockOptions {
                dynamic: Some(true),
                ..options
            });
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => AdapterConfig::default(),
    };
    cli.apply(&mut config);
    // Validated once, after overrides.
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;

    tracing::info!("mock-adapter v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        cors = config.cors,
        errors = config.engine.errors,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Address was checked by validate_config.
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let operations = load_operations(&cli.fixtures)?;
    let port = config.listener.port;
    let mut server = MockServer::new(FixtureEngine::new(), operations, config);

    let address = server.listen(port).await?;
    tracing::info!(address = %address, "Listening for connections");

    wait_for_signal().await?;
    server.close().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
