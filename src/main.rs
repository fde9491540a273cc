// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use course_marketplace_server::{
    api::{cors_layer, router},
    auth::{ClerkDirectory, JwksManager},
    checkout::{CheckoutService, PaymentSignatureVerifier},
    config::{AppConfig, LogFormat},
    providers::RazorpayClient,
    quote_sweeper::QuoteSweeper,
    state::{AppState, AuthConfig},
    storage::Database,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn run() -> Result<(), BoxError> {
    // Must happen before any TLS use (server or outbound HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    let config = AppConfig::from_env()?;
    info!(bind_addr = %config.bind_addr, data_dir = %config.data_dir.display(), "Configuration loaded");

    let db = Arc::new(Database::open_in_dir(&config.data_dir)?);

    let gateway = RazorpayClient::from_config(&config.gateway)?;
    let checkout = CheckoutService::new(
        db.clone(),
        Arc::new(gateway),
        PaymentSignatureVerifier::new(config.gateway.key_secret.clone()),
        config.gateway.currency.clone(),
        config.quote_ttl,
    );

    let auth_config = match &config.clerk.jwks_url {
        Some(url) => {
            let jwks = JwksManager::new(url.clone(), reqwest::Client::new());
            if let Err(e) = jwks.refresh().await {
                // Keys are fetched again on the first authenticated request
                warn!(error = %e, jwks_url = %url, "Initial JWKS fetch failed");
            }
            AuthConfig::new(Arc::new(jwks))
                .with_issuer(config.clerk.issuer.clone())
                .with_audience(config.clerk.audience.clone())
        }
        None => {
            warn!("CLERK_JWKS_URL not set: tokens are only accepted by dev builds, unverified");
            AuthConfig::default()
        }
    };

    let directory = ClerkDirectory::from_config(&config.clerk)?;
    if directory.is_none() {
        info!("CLERK_SECRET_KEY not set: account sync relies on token claims only");
    }

    let state = AppState::new(db.clone(), Arc::new(checkout))
        .with_auth_config(auth_config)
        .with_directory(directory);

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(
        QuoteSweeper::new(db.clone(), config.quote_sweep_interval).run(shutdown.clone()),
    );

    let app = router(state, cors_layer(config.cors_allowed_origin.as_deref())?);

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
            info!(addr = %config.bind_addr, "Course marketplace listening on https (docs at /docs)");
            tokio::select! {
                result = axum_server::bind_rustls(config.bind_addr, tls_config).serve(app.into_make_service()) => result?,
                _ = shutdown_signal() => {},
            }
        }
        None => {
            let listener = TcpListener::bind(config.bind_addr).await?;
            info!(addr = %config.bind_addr, "Course marketplace listening on http (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Quote sweeper task ended abnormally");
    }
    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing(LogFormat::from_env());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
