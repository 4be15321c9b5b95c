//! `loomi-api`: JSON API of the Loomi box shop.
//!
//! Reads its configuration from the environment (see [`loomi_api::config`]),
//! connects to `PostgreSQL`, optionally starts the delivery scheduler and
//! serves until SIGINT/SIGTERM. Migrations are applied by `loomi-cli migrate`,
//! never at startup.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::error::Error;
use std::net::SocketAddr;

use loomi_api::config::ApiConfig;
use loomi_api::state::AppState;
use loomi_api::{db, scheduler};
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ApiConfig::from_env()?;
    // Dropping the guard flushes pending Sentry events
    let _sentry = init_telemetry(&config);

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    if config.scheduler {
        scheduler::spawn(pool.clone());
    }

    let addr = config.socket_addr();
    let app = loomi_api::app(AppState::new(config, pool))
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "loomi-api listening");

    // Connect info keys the rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("loomi-api stopped");
    Ok(())
}

/// Start Sentry (when a DSN is set), then the tracing subscriber feeding it.
fn init_telemetry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: config.sentry_environment.clone().map(Into::into),
                sample_rate: config.sentry_sample_rate,
                traces_sample_rate: config.sentry_traces_sample_rate,
                attach_stacktrace: true,
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("loomi_api=info,tower_http=debug"));

    // Warnings and errors become Sentry events, info/debug become breadcrumbs
    let sentry_layer =
        sentry_tracing::layer().event_filter(|metadata: &tracing::Metadata<'_>| {
            match *metadata.level() {
                Level::ERROR | Level::WARN => EventFilter::Event,
                Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
                _ => EventFilter::Ignore,
            }
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    if guard.is_some() {
        tracing::info!("Sentry initialized");
    }
    guard
}

/// Resolve on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received, draining connections");
}
