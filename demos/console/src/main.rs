//! Console driver for the Ledgerflow pipeline.
//!
//! Seeds five accounts and a batch of tickets into the in-memory store,
//! then floods the gateway through all five lanes and reports what every
//! operation settled as. Worker-pool sizing comes from the configuration,
//! which is why the runtime is built explicitly instead of via the macro.

use ledgerflow_core::{Clock, Money, SystemClock};
use ledgerflow_gateway::{FaultLog, StoreGateway};
use ledgerflow_pipeline::{Pipeline, PipelineConfig};
use ledgerflow_testing::{seed_accounts, seed_tickets, InMemoryStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SEED_ACCOUNTS: usize = 5;
const SEED_BALANCE_DOLLARS: i64 = 1000;
const SEED_TICKETS: usize = 20;
const TICKET_PRICE_DOLLARS: i64 = 25;
const TICKET_DAYS_AHEAD: i64 = 30;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerflow=info,ledgerflow_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env();
    info!(
        worker_threads = config.worker_threads,
        max_blocking_threads = config.max_blocking_threads,
        lane_parallelism = config.lane_parallelism,
        total_operations = config.total_operations,
        "configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .max_blocking_threads(config.max_blocking_threads)
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let clock = Arc::new(SystemClock);
        let store = Arc::new(InMemoryStore::new());

        let roster = seed_accounts(
            &store,
            SEED_ACCOUNTS,
            Money::from_dollars(SEED_BALANCE_DOLLARS),
        )
        .await;
        let tickets = seed_tickets(
            &store,
            SEED_TICKETS,
            Money::from_dollars(TICKET_PRICE_DOLLARS),
            clock.now(),
            TICKET_DAYS_AHEAD,
        )
        .await;
        info!(
            accounts = roster.len(),
            tickets = tickets.len(),
            "store seeded"
        );

        let gateway = Arc::new(StoreGateway::new(
            store,
            clock,
            roster,
            FaultLog::spawn(),
        ));

        let report = Pipeline::new(gateway, config).run().await;
        report.log_summary();
    });

    Ok(())
}
