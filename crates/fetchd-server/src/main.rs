use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fetchd_core::app::FetchService;
use fetchd_core::impls::{HttpFetchClient, InMemoryRequestStore, MockFetchClient, SqliteRequestStore};
use fetchd_core::ports::{FetchClient, RequestStore};
use fetchd_server::config::{ClientKind, CliArgs, ServerConfig, StorageKind};
use fetchd_server::telemetry::init_logging;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_logging(&config.log)?;

    let store = build_store(&config)?;
    let client = build_client(&config);
    let service = Arc::new(FetchService::new(
        config.dispatch,
        store,
        client,
        tracing::info_span!("fetch_service"),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        %addr,
        storage = ?config.storage,
        dispatch = ?config.dispatch,
        client = ?config.client,
        "fetchd listening"
    );

    axum::serve(listener, fetchd_server::app(Arc::clone(&service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // in-flight HTTP requests are done; now drain queued fetches
    service.shutdown().await?;
    tracing::info!("fetchd shut down");
    Ok(())
}

fn build_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn RequestStore>> {
    Ok(match config.storage {
        StorageKind::Memory => Arc::new(InMemoryRequestStore::new()),
        StorageKind::Sqlite => Arc::new(
            SqliteRequestStore::open(
                &config.database,
                config.timeout,
                tracing::info_span!("sqlite_store"),
            )
            .with_context(|| format!("opening {}", config.database.display()))?,
        ),
    })
}

fn build_client(config: &ServerConfig) -> Arc<dyn FetchClient> {
    match config.client {
        ClientKind::Http => Arc::new(HttpFetchClient::new(
            config.timeout,
            tracing::info_span!("http_client"),
        )),
        ClientKind::Mock => Arc::new(MockFetchClient::new()),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
