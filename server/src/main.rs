use anyhow::{Context, Result};
use clap::Parser;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use server::database;
use server::security::TokenService;
use server::{AppState, build_service};
use shared::config::load_config;

#[derive(Debug, Parser)]
#[command(name = "server", about = "Stateless JWT authentication server")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let tokens = TokenService::from_config(&config.auth).context("Invalid auth configuration")?;
    info!(
        "Token service ready ({:?}, ttl {}s)",
        tokens.algorithm(),
        tokens.ttl_secs()
    );

    let pool = database::connect(&config.database)
        .await
        .context("Failed to open database")?;

    let state = AppState::new(pool, tokens);
    let service = build_service::<Incoming>(state);

    let listener = TcpListener::bind(config.server.addr())
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr()))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let io = TokioIo::new(stream);
                let service = TowerToHyperService::new(service.clone());
                tokio::task::spawn(async move {
                    if let Err(err) = http1::Builder::new()
                        .timer(TokioTimer::new())
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", peer, err);
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    info!("Server closed!");
    Ok(())
}
