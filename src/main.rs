//! NimbusKV server binary: configuration, logging, accept loop, shutdown.

use anyhow::Context;
use nimbuskv::commands::CommandHandler;
use nimbuskv::config::{usage, Config, Invocation};
use nimbuskv::connection::{handle_connection, ConnectionStats};
use nimbuskv::storage::StorageEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::load().context("invalid configuration")? {
        Invocation::Serve(config) => config,
        Invocation::Help => {
            println!("{}", usage());
            return Ok(());
        }
        Invocation::Version => {
            println!("nimbuskv {}", nimbuskv::VERSION);
            return Ok(());
        }
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log filter {:?}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let storage = Arc::new(StorageEngine::with_shards(config.shards));
    info!(shards = storage.shard_count(), "Storage engine initialized");

    let commands = CommandHandler::new(Arc::clone(&storage));
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(
        version = nimbuskv::VERSION,
        addr = %config.bind_address(),
        "Ready to accept connections"
    );

    tokio::select! {
        _ = accept_loop(listener, commands, Arc::clone(&stats)) => {}
        result = signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
    }

    let storage_stats = storage.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        get_ops = storage_stats.get_ops,
        put_ops = storage_stats.put_ops,
        del_ops = storage_stats.del_ops,
        expired = storage_stats.expired,
        "Server shutdown complete"
    );
    Ok(())
}

async fn accept_loop(listener: TcpListener, commands: CommandHandler, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(
                    stream,
                    addr,
                    commands.clone(),
                    Arc::clone(&stats),
                ));
            }
            Err(e) => error!(error = %e, "Failed to accept connection"),
        }
    }
}
