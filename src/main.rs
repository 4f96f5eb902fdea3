//! Trade Store - diagnostic entry point.
//!
//! Connects to the trade store and prints what a trading loop would see at startup:
//! the flagged session, the adoptable thread, global profit or one thread's state.

use clap::Parser;
use serde_json::{Value, json};
use std::sync::Arc;
use trade_store::config::{Command, Config};
use trade_store::db::{ConnectionPoolManager, LockFileProbe};
use trade_store::models::{ExchangeConfig, Session};
use trade_store::report::{LogContext, LogEntry};
use trade_store::{StoreResult, TradeStore};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!("Starting trade-store v{}", env!("CARGO_PKG_VERSION"));

    let exchange = config.exchange_config();
    let ctx = LogContext::none().with_config(&exchange);

    let settings = match config.database_settings() {
        Ok(settings) => settings,
        Err(e) => {
            LogEntry::failure(ctx, "configuration", &e).emit();
            std::process::exit(1);
        }
    };

    let pool = match ConnectionPoolManager::new().connect(&settings).await {
        Ok(pool) => pool,
        Err(e) => {
            LogEntry::failure(ctx, "connect", &e).emit();
            std::process::exit(1);
        }
    };

    let store = TradeStore::new(pool.clone(), settings.procedure_schema.clone())
        .with_probe(Arc::new(LockFileProbe::new(config.lock_dir.clone())));

    let command = config.command.clone().unwrap_or(Command::Status);
    let result = run(&store, &exchange, command).await;
    pool.close().await;

    match result {
        Ok(output) => println!("{output:#}"),
        Err(e) => {
            error!(error = %e, "Command failed");
            std::process::exit(1);
        }
    }
}

async fn run(store: &TradeStore, exchange: &ExchangeConfig, command: Command) -> StoreResult<Value> {
    match command {
        Command::Status => {
            let session = Session::default();
            let flagged = store.get_session_status(&session).await?;
            let threads = store.get_thread_count(&session).await?;
            let amount = store.get_thread_transaction_amount(&session).await?;
            Ok(json!({
                "exchange": exchange.exchange_name,
                "flagged_thread_id": flagged,
                "thread_count": threads,
                "committed_amount": amount,
            }))
        }
        Command::Adopt => {
            let identity = store
                .get_thread_transaction_distinct(&Session::default())
                .await?;
            if identity.is_empty() {
                info!("No abandoned thread to adopt");
            }
            Ok(json!(identity))
        }
        Command::Profit => {
            let session = Session::default();
            let summary = store.get_profit(&session).await?;
            let global = store.get_global(&session).await?;
            Ok(json!({
                "profit": summary,
                "global": global,
            }))
        }
        Command::Thread { thread_id } => {
            let session = Session::new(thread_id, "");
            let transactions = store.get_thread_transaction_by_thread_id(&session).await?;
            let count = store.get_thread_transaction_count(&session).await?;
            let profit = store.get_profit_by_thread_id(&session).await?;
            let symbol = store.get_order_symbol(&session).await?;
            let last_sides = store.get_order_transaction_side_last_two(&session).await?;
            Ok(json!({
                "thread_id": session.thread_id,
                "symbol": symbol,
                "open_transactions": count,
                "transactions": transactions.value,
                "decode_error": transactions.error.map(|e| e.to_string()),
                "last_sides": last_sides,
                "profit": profit,
            }))
        }
    }
}
