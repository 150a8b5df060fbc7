//! shardcache - A Sharded In-Memory Cache
//!
//! This is the main entry point for the shardcache server.
//! It sets up the TCP listener, cache engine, and handles incoming connections.

use shardcache::commands::CommandHandler;
use shardcache::config::{CliAction, Config, HELP};
use shardcache::connection::{handle_connection, ConnectionStats, FrameLimits};
use shardcache::storage::CacheEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn print_banner(config: &Config) {
    println!(
        r#"
shardcache v{} - Sharded In-Memory Cache
──────────────────────────────────────────────────────────────
Server started on {}
{} shards x {} entries, values up to {} bytes
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        shardcache::VERSION,
        config.bind_address(),
        config.shards,
        config.shard_capacity,
        config.max_value_size,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = match Config::from_env() {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            println!("{}", HELP);
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("shardcache version {}", shardcache::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", HELP);
            std::process::exit(1);
        }
    };

    // Set up logging; RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print the banner
    print_banner(&config);

    // Create the cache engine (shared across all connections)
    let storage = Arc::new(CacheEngine::new(config.engine_config()));
    info!(
        shards = storage.shard_count(),
        shard_capacity = storage.shard_capacity(),
        "Cache engine initialized"
    );

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Main accept loop, until Ctrl+C
    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), Arc::clone(&stats), config.frame_limits()) => {}
        result = signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received, stopping server...");
        }
    }

    let engine_stats = storage.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        entries = engine_stats.entries,
        hits = engine_stats.get_hits,
        misses = engine_stats.get_misses,
        evictions = engine_stats.evictions,
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<CacheEngine>,
    stats: Arc<ConnectionStats>,
    limits: FrameLimits,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                // Create a command handler for this connection
                let handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats, limits).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
