use anyhow::Context;
use clap::Parser;
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockpick_core::config::Settings;
use stockpick_core::domain::portfolio::{self, PortfolioReturn};
use stockpick_core::domain::{pricing, snapshot};
use stockpick_core::ingest::provider::ChartHttpProvider;
use stockpick_core::ingest::refresh::{self, RefreshOptions};
use stockpick_core::ingest::types::FetchRange;
use stockpick_core::storage;
use stockpick_core::storage::kv::KvStoreClient;

mod universe;

#[derive(Debug, Parser)]
#[command(name = "stockpick_worker")]
struct Args {
    /// Do everything except writing to the store.
    #[arg(long)]
    dry_run: bool,
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

    let result = run(&settings, &args).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "competition refresh run failed");
    }
    result
}

async fn run(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    let window = settings.require_competition_window()?;
    let store = KvStoreClient::new(
        settings.require_store_base_url()?,
        settings.store_auth_token.clone(),
    )?;
    let provider = ChartHttpProvider::from_settings(settings)?;

    let universe = universe::competition_universe();
    tracing::info!(
        window_start = %window.start,
        window_end = %window.end,
        universe_len = universe.len(),
        dry_run = args.dry_run,
        "starting competition refresh"
    );

    // Load before fetching: merging against an unknown baseline could
    // clobber stored anchors, so a store read failure aborts the run.
    let existing = storage::prices::load(&store)
        .await
        .context("read existing price store failed")?;

    let now = chrono::Utc::now();
    let opts = RefreshOptions::from_env();
    let range = FetchRange::with_lookback(window.start, opts.lookback_days, now);
    let outcome = refresh::refresh_universe(&provider, &universe, window.start, range, &opts).await;

    tracing::info!(
        refreshed = outcome.anchors.len(),
        failures = outcome.failures,
        "universe refresh complete"
    );

    let prices = pricing::merge_price_store(existing, outcome.anchors);

    let portfolios = storage::portfolios::load(&store)
        .await
        .context("read portfolios failed")?;
    if portfolios.is_empty() {
        tracing::warn!("no portfolios found in store");
    }

    let mut returns = BTreeMap::new();
    let mut pending = 0usize;
    for (portfolio_id, p) in &portfolios {
        match portfolio::compute_return(p, &prices) {
            PortfolioReturn::Priced {
                value,
                holdings_priced,
            } => {
                tracing::info!(
                    portfolio_id = %portfolio_id,
                    advisor = %p.advisor_name,
                    return_pct = value * 100.0,
                    holdings_priced,
                    "portfolio return"
                );
                returns.insert(portfolio_id.clone(), value);
            }
            PortfolioReturn::Pending => {
                pending += 1;
                tracing::warn!(
                    portfolio_id = %portfolio_id,
                    advisor = %p.advisor_name,
                    "portfolio pending: no holdings priced"
                );
            }
        }
    }

    let snap = snapshot::build_snapshot(now, returns);

    if args.dry_run {
        tracing::info!(
            dry_run = true,
            priced = snap.as_ref().map_or(0, |s| s.returns.len()),
            pending,
            "dry-run: skipping store writes"
        );
        return Ok(());
    }

    storage::prices::save(&store, &prices)
        .await
        .context("write price store failed")?;
    tracing::info!(tickers = prices.len(), "persisted price store");

    match snap {
        Some(snap) => {
            let history_key = storage::history::append(&store, &snap)
                .await
                .context("append history snapshot failed")?;
            tracing::info!(
                %history_key,
                priced = snap.returns.len(),
                pending,
                "appended return snapshot"
            );
        }
        None => {
            tracing::warn!(pending, "no portfolio produced a return; skipping history snapshot");
        }
    }

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
