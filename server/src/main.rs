use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use server::AppState;
use server::auth::Argon2PasswordHasher;
use server::database::{self, SqliteCredentialStore};
use server::handlers::build_api_router;
use server::handlers::http::utils::deliver_error_json;

/// sqlite allows one writer; a handful of readers is plenty.
const DB_POOL_SIZE: u32 = 5;

#[derive(Debug, Parser)]
#[command(name = "server", about = "Task tracker server")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = shared::config::load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    let pool = database::connect(&config.database.url, DB_POOL_SIZE).await?;
    database::create_tables(&pool).await?;
    let store = Arc::new(SqliteCredentialStore::new(pool));

    let state = AppState::new(config, store, Arc::new(Argon2PasswordHasher))
        .context("Failed to build application state")?;
    info!(environment = ?state.environment, "Auth core ready");

    let addr = state.config.server.addr();
    let max_connections = state.config.server.max_connections;

    let router = Arc::new(build_api_router());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let permits = Arc::new(Semaphore::new(max_connections));
    info!("Listening on http://{}", addr);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
            warn!("Connection limit reached, dropping {}", peer);
            continue;
        };

        let router = Arc::clone(&router);
        let state = state.clone();
        tokio::task::spawn(async move {
            let _permit = permit;
            let service = service_fn(move |req| {
                let router = Arc::clone(&router);
                let state = state.clone();
                async move {
                    match router.route(req, state).await {
                        Ok(response) => Ok::<_, std::convert::Infallible>(response),
                        Err(e) => {
                            error!("Handler error: {:#}", e);
                            Ok(internal_error())
                        }
                    }
                }
            });

            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }

    info!("Server stopped");
    Ok(())
}

fn internal_error() -> server::handlers::http::utils::HttpResponse {
    deliver_error_json(
        "INTERNAL_ERROR",
        "An internal error occurred",
        hyper::StatusCode::INTERNAL_SERVER_ERROR,
    )
    .unwrap_or_else(|_| {
        let mut response = hyper::Response::new(server::handlers::http::utils::full(""));
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
