//! transfer_saga - Money Transfer Orchestration Service
//!
//! HTTP service over the transfer saga, wired to in-memory collaborators.

use std::net::SocketAddr;
use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transfer_saga::api::{self, AppState};
use transfer_saga::audit::InMemoryAuditLog;
use transfer_saga::config::LogFormat;
use transfer_saga::fraud::RuleBasedFraudService;
use transfer_saga::jobs::{RunnerConfig, ScheduledTransferRunner};
use transfer_saga::notification::LogNotifier;
use transfer_saga::store::{InMemoryAccountStore, InMemoryTransactionStore};
use transfer_saga::{Account, AccountType, Config, TransferOrchestrator};

/// Initialize tracing/logging
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "transfer_saga=debug,tower_http=debug".into());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

/// Accounts available out of the box in development
fn demo_accounts() -> Vec<Account> {
    vec![
        Account::new("1234567899", "Ana Gomez", "CC12345678", dec!(2000000), AccountType::Savings),
        Account::new("1234567897", "Luis Perez", "CC87654321", dec!(2000000), AccountType::Checking),
        Account::new("9876543210", "Acme Ltda", "NT90012345", dec!(50000000), AccountType::Business),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(environment = %config.environment, "Starting transfer_saga server");

    let accounts = Arc::new(InMemoryAccountStore::new());
    if config.seed_demo_accounts {
        for account in demo_accounts() {
            accounts.insert(account);
        }
        tracing::info!(count = accounts.len(), "Seeded demo accounts");
    }

    let orchestrator = TransferOrchestrator::new(
        accounts,
        Arc::new(InMemoryTransactionStore::new()),
        Arc::new(RuleBasedFraudService::new()),
        Arc::new(LogNotifier::new()),
        Arc::new(InMemoryAuditLog::new()),
        config.orchestrator_settings(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = ScheduledTransferRunner::new(
        orchestrator.clone(),
        RunnerConfig {
            poll_interval: config.scheduler_interval,
        },
        shutdown_rx,
    )
    .start();

    let app = api::build_router(AppState::new(orchestrator));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = runner.await {
        tracing::error!(error = %e, "Scheduled transfer runner panicked");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
