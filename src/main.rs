// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use coffee_menu_server::{
    api::router,
    auth::{Authorizer, AuthorizerSettings, JwksManager, KeySetRefresher},
    config::{Config, LogFormat, TlsPaths, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::DrinkStore,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_address()?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let drinks = DrinkStore::open(&config.database_path)?;
    if config.reset_database {
        let seeded = drinks.reset()?;
        tracing::info!(drinks = seeded.len(), "Database reset to default menu");
    }

    let jwks = Arc::new(
        JwksManager::new(config.jwks_url.as_str(), config.jwks_fetch_timeout)?
            .with_cache_ttl(config.jwks_cache_ttl),
    );
    let settings = AuthorizerSettings::new(config.audience.clone(), config.issuer.as_str())
        .with_algorithms(config.algorithms.clone())
        .with_leeway(config.leeway);
    let authorizer = Authorizer::new(jwks.clone(), settings);

    let shutdown = CancellationToken::new();
    let refresher = config.jwks_refresh_interval.map(|interval| {
        let task = KeySetRefresher::new(jwks.clone()).with_interval(interval);
        tokio::spawn(task.run(shutdown.clone()))
    });

    let app = router(AppState::new(drinks, authorizer));

    let handle = Handle::new();
    tokio::spawn(watch_for_shutdown(handle.clone(), shutdown.clone()));

    tracing::info!(
        %addr,
        issuer = %config.issuer,
        audience = %config.audience,
        tls = config.tls.is_some(),
        "Coffee menu server listening (docs at /docs)"
    );

    let served = match &config.tls {
        Some(TlsPaths { cert, key }) => {
            // Must happen before any rustls config is built.
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls_config = RustlsConfig::from_pem_file(cert, key).await?;
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    shutdown.cancel();
    if let Some(refresher) = refresher {
        if let Err(e) = refresher.await {
            tracing::warn!(error = %e, "Key refresher task ended abnormally");
        }
    }
    served?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn watch_for_shutdown(handle: Handle<std::net::SocketAddr>, shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown_signal() => {}
        _ = shutdown.cancelled() => {}
    }
    tracing::info!("Shutting down");
    shutdown.cancel();
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to register SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
    }
}
