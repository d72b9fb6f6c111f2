mod app;
mod error;
mod routes;

use app::AppState;
use budget_core::config::Settings;
use budget_core::market::yahoo::YahooChartClient;
use budget_core::market::MarketDataClient;
use budget_core::prices::scheduler::{PriceRefreshScheduler, SchedulerHandle};
use budget_core::prices::{PriceRefreshService, RefreshError};
use budget_core::storage::investments::PgHoldingStore;
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool = connect_database(&settings).await;
    let market: Arc<dyn MarketDataClient> = Arc::new(YahooChartClient::from_settings(&settings)?);

    let refresher = pool.as_ref().map(|pool| {
        Arc::new(PriceRefreshService::new(
            Arc::new(PgHoldingStore::new(pool.clone())),
            market.clone(),
            settings.fetch_timeout(),
        ))
    });

    let scheduler: Option<SchedulerHandle> = match &refresher {
        Some(service) => {
            run_startup_pass(service).await;
            Some(PriceRefreshScheduler::start(
                service.clone(),
                settings.refresh_interval(),
            ))
        }
        None => {
            tracing::warn!("no database; price refresh scheduler not started");
            None
        }
    };

    let app = app::router(AppState {
        pool,
        refresher,
        market,
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port()));
    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }

    Ok(())
}

async fn connect_database(settings: &Settings) -> Option<PgPool> {
    let db_url = match settings.require_database_url() {
        Ok(url) => url,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            return None;
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
            return None;
        }
    };

    match budget_core::storage::migrate(&pool).await {
        Ok(()) => Some(pool),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
            None
        }
    }
}

async fn run_startup_pass(service: &PriceRefreshService) {
    match service.refresh_all().await {
        Ok(summary) => tracing::info!(
            attempted = summary.attempted,
            updated_count = summary.updated_count,
            "startup price refresh done"
        ),
        Err(RefreshError::Busy) => tracing::info!("startup price refresh skipped; pass in flight"),
        Err(err) => {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %format!("{err:#}"), "startup price refresh failed");
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
