pub mod api;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod services;

pub use config::Config;

use anyhow::Context;
use db::Store;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve(config).await,

        Some("init") => {
            Config::create_default_if_missing()?;
            let store = open_store(&config).await?;
            store.ping().await?;
            println!("Database initialized at {}", config.general.database_path);
            Ok(())
        }

        Some("verify") => {
            let Some(username) = args.get(2) else {
                println!("Usage: tsudoi verify <username> [--revoke]");
                return Ok(());
            };
            let verified = !args.iter().any(|a| a == "--revoke");
            cmd_verify(&config, username, verified).await
        }

        Some("sweep-sessions") => {
            let store = open_store(&config).await?;
            let removed = store.delete_expired_sessions().await?;
            println!("Removed {removed} expired sessions");
            Ok(())
        }

        Some("help" | "-h" | "--help") => {
            print_help();
            Ok(())
        }

        Some(other) => {
            println!("Unknown command: {other}");
            print_help();
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Tsudoi v{} starting...", env!("CARGO_PKG_VERSION"));

    let state = api::create_app_state(&config).await?;
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server running at http://{addr}");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }

    server.abort();
    info!("Server stopped");

    Ok(())
}

/// Admin action: flip the `verified` flag that gates login.
async fn cmd_verify(config: &Config, username: &str, verified: bool) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    if store.set_user_verified(username, verified).await? {
        let state = if verified { "verified" } else { "unverified" };
        println!("User '{username}' is now {state}");
    } else {
        println!("No such user: {username}");
    }

    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}

fn print_help() {
    println!("Tsudoi v{} - committee event board", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("  tsudoi [serve]              Start the web server (default)");
    println!("  tsudoi init                 Create the database and run migrations");
    println!("  tsudoi verify <username>    Approve an account so it can log in");
    println!("  tsudoi verify <u> --revoke  Withdraw approval");
    println!("  tsudoi sweep-sessions       Delete expired sessions");
    println!("  tsudoi help                 Show this help");
}
