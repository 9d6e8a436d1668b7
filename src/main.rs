//! docledger service.
//!
//! ```text
//!   chat front end / docledger-cli
//!          │  HTTP
//!          ▼
//!   ┌──────────────┐     ┌──────────────────────┐     ┌──────────────┐
//!   │ http adapter │────▶│ DocumentOrchestrator │────▶│ BlobStore    │──▶ Pinata
//!   └──────────────┘     └──────────┬───────────┘     └──────────────┘
//!                                   │
//!                        Submitter + ConfirmationWaiter
//!                                   │
//!                                   ▼
//!                            LedgerClient ──▶ JSON-RPC node
//! ```

use alloy::primitives::Address;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use docledger::blobstore::PinataClient;
use docledger::config::{load_config_or_default, load_secrets};
use docledger::http::{AppState, HttpServer};
use docledger::ledger::{ContractInterface, FeePolicy, LedgerClient, PollPolicy, Wallet};
use docledger::lifecycle::{spawn_signal_handler, Shutdown};
use docledger::observability::{logging, metrics};
use docledger::orchestrator::{DocumentOrchestrator, SessionRegistry};

#[derive(Parser)]
#[command(name = "docledger")]
#[command(about = "Registers documents on a ledger with their bytes pinned to IPFS", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "DOCLEDGER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config_or_default(cli.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "docledger starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        rpc_url = %config.ledger.rpc_url,
        chain_id = config.ledger.chain_id,
        contract = %config.ledger.contract_address,
        "Configuration loaded"
    );

    let secrets = load_secrets()?;
    let wallet = Wallet::from_private_key(&secrets.private_key, config.ledger.chain_id)?;

    let contract_address: Address = config.ledger.contract_address.parse()?;
    let contract = ContractInterface::load(
        contract_address,
        Path::new(&config.ledger.abi_path),
        config.contract.clone(),
    )?;

    let ledger = LedgerClient::new(config.ledger.clone()).await?;
    let blobs = PinataClient::new(
        config.blob_store.clone(),
        &secrets.pinata_api_key,
        &secrets.pinata_secret,
    )?;
    drop(secrets);

    let orchestrator = DocumentOrchestrator::new(
        Arc::new(ledger),
        Arc::new(blobs),
        Arc::new(contract),
        FeePolicy::from(&config.ledger),
        PollPolicy::from(&config.confirmation),
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let sessions = SessionRegistry::new();
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    spawn_session_pruner(
        sessions.clone(),
        Duration::from_secs(config.server.armed_session_ttl_secs),
        shutdown.clone(),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        sessions,
        wallet: Arc::new(wallet),
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(&config.server, state)
        .run(listener, &shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Periodically forget sessions that were armed but never sent a file.
fn spawn_session_pruner(sessions: SessionRegistry, ttl: Duration, shutdown: Shutdown) {
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ttl.min(Duration::from_secs(60)));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pruned = sessions.prune_armed(ttl);
                    if pruned > 0 {
                        tracing::debug!(pruned = pruned, "Pruned stale armed sessions");
                    }
                }
                _ = stop.recv() => break,
            }
        }
    });
}
