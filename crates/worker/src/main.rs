use anyhow::Context;
use budget_core::config::Settings;
use budget_core::market::yahoo::YahooChartClient;
use budget_core::prices::scheduler::PriceRefreshScheduler;
use budget_core::prices::{PriceOutcome, PriceRefreshService};
use budget_core::storage::investments::PgHoldingStore;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "budget_worker", about = "Refresh stored investment prices")]
struct Args {
    /// Fetch prices and log the outcome without writing to the database.
    #[arg(long, conflicts_with = "watch")]
    dry_run: bool,

    /// Keep running, refreshing on a fixed interval until Ctrl-C.
    #[arg(long)]
    watch: bool,

    /// Interval between passes in watch mode. Defaults to PRICE_REFRESH_INTERVAL_SECS.
    #[arg(long, requires = "watch", value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: Option<u64>,
}

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

    let args = Args::parse();

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    budget_core::storage::migrate(&pool).await?;

    let service = Arc::new(PriceRefreshService::new(
        Arc::new(PgHoldingStore::new(pool)),
        Arc::new(YahooChartClient::from_settings(&settings)?),
        settings.fetch_timeout(),
    ));

    if args.dry_run {
        let outcomes = service.plan_pass().await?;
        for o in &outcomes {
            match &o.outcome {
                PriceOutcome::Updated { price } => {
                    tracing::info!(symbol = %o.symbol, %price, dry_run = true, "would update price")
                }
                other => {
                    tracing::warn!(symbol = %o.symbol, outcome = ?other, dry_run = true, "would skip holding")
                }
            }
        }
        tracing::info!(holdings = outcomes.len(), dry_run = true, "dry run finished");
        return Ok(());
    }

    if let Err(err) = service.refresh_all().await {
        let err = anyhow::Error::new(err);
        sentry_anyhow::capture_anyhow(&err);
        if !args.watch {
            return Err(err.context("price refresh failed"));
        }
        tracing::error!(error = %format!("{err:#}"), "initial price refresh failed; continuing in watch mode");
    }

    if !args.watch {
        return Ok(());
    }

    let period = args
        .interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| settings.refresh_interval());
    let scheduler = PriceRefreshScheduler::start(service, period);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown signal received; waiting for in-flight pass");
    scheduler.shutdown().await;

    Ok(())
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
