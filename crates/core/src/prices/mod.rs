//! Price refresh pass: fetch a current price for every holding and commit them together.

pub mod scheduler;

use crate::domain::investment::{Holding, PriceUpdate};
use crate::market::MarketDataClient;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Stored prices are kept at cent precision.
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Largest value the `NUMERIC(10, 2)` price column holds.
pub const MAX_STORED_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Persistence seen by a refresh pass: read every holding up front, write all new prices at the
/// end as one unit.
#[async_trait::async_trait]
pub trait HoldingStore: Send + Sync {
    async fn load_holdings(&self) -> anyhow::Result<Vec<Holding>>;

    /// Apply every update or none of them.
    async fn commit_prices(&self, updates: &[PriceUpdate]) -> anyhow::Result<u64>;
}

#[derive(Debug)]
pub enum RefreshError {
    /// Another pass is in flight; this request was dropped.
    Busy,
    Load(anyhow::Error),
    Commit(anyhow::Error),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshError::Busy => write!(f, "a price refresh pass is already running"),
            RefreshError::Load(err) => write!(f, "failed to load holdings: {err:#}"),
            RefreshError::Commit(err) => write!(f, "failed to commit refreshed prices: {err:#}"),
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefreshError::Busy => None,
            RefreshError::Load(err) | RefreshError::Commit(err) => Some(&**err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PriceOutcome {
    Updated { price: Decimal },
    Unavailable,
    TimedOut,
    /// The provider answered with a price the store cannot hold (non-positive or too large).
    Rejected { price: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolOutcome {
    pub investment_id: Uuid,
    pub symbol: String,
    pub outcome: PriceOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub attempted: usize,
    pub updated_count: usize,
    pub failed_symbols: Vec<String>,
}

impl RefreshSummary {
    fn from_outcomes(outcomes: &[SymbolOutcome]) -> Self {
        let failed_symbols: Vec<String> = outcomes
            .iter()
            .filter(|o| !matches!(o.outcome, PriceOutcome::Updated { .. }))
            .map(|o| o.symbol.clone())
            .collect();
        Self {
            attempted: outcomes.len(),
            updated_count: outcomes.len() - failed_symbols.len(),
            failed_symbols,
        }
    }
}

pub struct PriceRefreshService {
    store: Arc<dyn HoldingStore>,
    market: Arc<dyn MarketDataClient>,
    fetch_timeout: Duration,
    pass_guard: tokio::sync::Mutex<()>,
}

impl PriceRefreshService {
    pub fn new(
        store: Arc<dyn HoldingStore>,
        market: Arc<dyn MarketDataClient>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            market,
            fetch_timeout,
            pass_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one refresh pass.
    ///
    /// At most one pass runs at a time; a call made while another is in flight returns
    /// [`RefreshError::Busy`] immediately instead of queueing.
    pub async fn refresh_all(&self) -> Result<RefreshSummary, RefreshError> {
        let _pass = self.pass_guard.try_lock().map_err(|_| RefreshError::Busy)?;
        let t0 = Instant::now();

        let outcomes = self.collect_outcomes().await?;
        let summary = RefreshSummary::from_outcomes(&outcomes);

        let updates: Vec<PriceUpdate> = outcomes
            .into_iter()
            .filter_map(|o| match o.outcome {
                PriceOutcome::Updated { price } => Some(PriceUpdate {
                    investment_id: o.investment_id,
                    symbol: o.symbol,
                    price,
                }),
                PriceOutcome::Unavailable
                | PriceOutcome::TimedOut
                | PriceOutcome::Rejected { .. } => None,
            })
            .collect();

        if !updates.is_empty() {
            let rows = self
                .store
                .commit_prices(&updates)
                .await
                .map_err(RefreshError::Commit)?;
            tracing::debug!(rows, "refreshed prices committed");
        }

        tracing::info!(
            attempted = summary.attempted,
            updated_count = summary.updated_count,
            failed = summary.failed_symbols.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "price refresh pass finished"
        );
        Ok(summary)
    }

    /// Fetch prices for every holding without writing anything back.
    pub async fn plan_pass(&self) -> Result<Vec<SymbolOutcome>, RefreshError> {
        let _pass = self.pass_guard.try_lock().map_err(|_| RefreshError::Busy)?;
        self.collect_outcomes().await
    }

    async fn collect_outcomes(&self) -> Result<Vec<SymbolOutcome>, RefreshError> {
        let holdings = self
            .store
            .load_holdings()
            .await
            .map_err(RefreshError::Load)?;

        if holdings.is_empty() {
            tracing::info!("no holdings to refresh");
            return Ok(Vec::new());
        }
        tracing::info!(holdings = holdings.len(), provider = self.market.provider_name(), "refreshing prices");

        let mut outcomes = Vec::with_capacity(holdings.len());
        for holding in holdings {
            let outcome = self.fetch_outcome(&holding.symbol).await;
            outcomes.push(SymbolOutcome {
                investment_id: holding.id,
                symbol: holding.symbol,
                outcome,
            });
        }
        Ok(outcomes)
    }

    async fn fetch_outcome(&self, symbol: &str) -> PriceOutcome {
        match tokio::time::timeout(self.fetch_timeout, self.market.fetch_price(symbol)).await {
            Ok(Some(price)) => {
                let price = price.round_dp(PRICE_DECIMAL_PLACES);
                if price <= Decimal::ZERO || price > MAX_STORED_PRICE {
                    tracing::warn!(%symbol, %price, "price out of storable range; holding left unchanged");
                    return PriceOutcome::Rejected { price };
                }
                tracing::info!(%symbol, %price, "price fetched");
                PriceOutcome::Updated { price }
            }
            Ok(None) => {
                tracing::warn!(%symbol, "no price available; holding left unchanged");
                PriceOutcome::Unavailable
            }
            Err(_) => {
                tracing::warn!(%symbol, timeout = ?self.fetch_timeout, "price fetch timed out; holding left unchanged");
                PriceOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::market::{HistoryPeriod, PriceBar};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryStore {
        pub holdings: Mutex<Vec<Holding>>,
        pub fail_commit: bool,
        pub commits: AtomicUsize,
    }

    impl MemoryStore {
        pub fn with(holdings: Vec<Holding>) -> Self {
            Self {
                holdings: Mutex::new(holdings),
                ..Default::default()
            }
        }

        pub fn price_of(&self, symbol: &str) -> Option<Decimal> {
            self.holdings
                .lock()
                .unwrap()
                .iter()
                .find(|h| h.symbol == symbol)
                .and_then(|h| h.current_price)
        }

        pub fn commit_count(&self) -> usize {
            self.commits.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl HoldingStore for MemoryStore {
        async fn load_holdings(&self) -> anyhow::Result<Vec<Holding>> {
            Ok(self.holdings.lock().unwrap().clone())
        }

        async fn commit_prices(&self, updates: &[PriceUpdate]) -> anyhow::Result<u64> {
            anyhow::ensure!(!self.fail_commit, "connection reset during commit");
            let mut holdings = self.holdings.lock().unwrap();
            let mut rows = 0;
            for update in updates {
                if let Some(h) = holdings.iter_mut().find(|h| h.id == update.investment_id) {
                    h.current_price = Some(update.price);
                    rows += 1;
                }
            }
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(rows)
        }
    }

    /// Fixed price table; symbols missing from it are unavailable.
    #[derive(Default)]
    pub struct StubMarket {
        pub prices: HashMap<String, Decimal>,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
    }

    impl StubMarket {
        pub fn with(prices: &[(&str, Decimal)]) -> Self {
            Self {
                prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataClient for StubMarket {
        fn provider_name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_price(&self, symbol: &str) -> Option<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.prices.get(symbol).copied()
        }

        async fn fetch_history(&self, _symbol: &str, _period: HistoryPeriod) -> Vec<PriceBar> {
            Vec::new()
        }
    }

    pub fn holding(symbol: &str, purchase: Decimal, current: Option<Decimal>) -> Holding {
        Holding {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            quantity: Decimal::ONE,
            purchase_price: purchase,
            current_price: current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::market::{HistoryPeriod, PriceBar};
    use rust_decimal_macros::dec;
    use tokio::sync::Notify;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn service(store: Arc<MemoryStore>, market: Arc<dyn MarketDataClient>) -> PriceRefreshService {
        PriceRefreshService::new(store, market, TIMEOUT)
    }

    #[tokio::test]
    async fn rounds_prices_to_cents() {
        let store = Arc::new(MemoryStore::with(vec![holding("AAPL", dec!(100), None)]));
        let market = Arc::new(StubMarket::with(&[("AAPL", dec!(187.456))]));

        let summary = service(store.clone(), market).refresh_all().await.unwrap();

        assert_eq!(summary.updated_count, 1);
        assert_eq!(store.price_of("AAPL"), Some(dec!(187.46)));
    }

    #[tokio::test]
    async fn failing_symbol_is_skipped_and_not_counted() {
        let store = Arc::new(MemoryStore::with(vec![
            holding("AAPL", dec!(100), Some(dec!(90))),
            holding("DELISTED", dec!(50), Some(dec!(40))),
            holding("MSFT", dec!(200), None),
        ]));
        let market = Arc::new(StubMarket::with(&[("AAPL", dec!(101)), ("MSFT", dec!(210))]));

        let summary = service(store.clone(), market).refresh_all().await.unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.updated_count, 2);
        assert_eq!(summary.failed_symbols, vec!["DELISTED".to_string()]);
        assert_eq!(store.price_of("AAPL"), Some(dec!(101)));
        assert_eq!(store.price_of("MSFT"), Some(dec!(210)));
        assert_eq!(store.price_of("DELISTED"), Some(dec!(40)));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn second_pass_with_unchanged_market_is_a_no_op() {
        let store = Arc::new(MemoryStore::with(vec![holding("NVDA", dec!(400), None)]));
        let market = Arc::new(StubMarket::with(&[("NVDA", dec!(455.10))]));
        let svc = service(store.clone(), market);

        svc.refresh_all().await.unwrap();
        let after_first = store.holdings.lock().unwrap().clone();
        let second = svc.refresh_all().await.unwrap();

        assert_eq!(second.updated_count, 1);
        assert_eq!(*store.holdings.lock().unwrap(), after_first);
        assert_eq!(store.price_of("NVDA"), Some(dec!(455.10)));
    }

    #[tokio::test]
    async fn commit_failure_is_a_job_failure_and_leaves_prices_untouched() {
        let store = Arc::new(MemoryStore {
            holdings: std::sync::Mutex::new(vec![holding("AAPL", dec!(100), Some(dec!(95)))]),
            fail_commit: true,
            ..Default::default()
        });
        let market = Arc::new(StubMarket::with(&[("AAPL", dec!(120))]));

        let err = service(store.clone(), market).refresh_all().await.unwrap_err();

        assert!(matches!(err, RefreshError::Commit(_)));
        assert_eq!(store.price_of("AAPL"), Some(dec!(95)));
    }

    #[tokio::test]
    async fn unstorable_price_is_a_per_symbol_failure() {
        assert_eq!(MAX_STORED_PRICE, dec!(99999999.99));
        let store = Arc::new(MemoryStore::with(vec![
            holding("AAPL", dec!(100), Some(dec!(90))),
            holding("BTC-IDR", dec!(900000000), Some(dec!(5))),
            holding("ZERO", dec!(1), Some(dec!(2))),
            holding("MSFT", dec!(200), None),
        ]));
        let market = Arc::new(StubMarket::with(&[
            ("AAPL", dec!(101)),
            ("BTC-IDR", dec!(100000000)),
            ("ZERO", dec!(0)),
            ("MSFT", dec!(99999999.99)),
        ]));

        let svc = service(store.clone(), market);
        let outcomes = svc.plan_pass().await.unwrap();
        assert_eq!(
            outcomes[1].outcome,
            PriceOutcome::Rejected { price: dec!(100000000) }
        );

        let summary = svc.refresh_all().await.unwrap();

        assert_eq!(summary.updated_count, 2);
        assert_eq!(
            summary.failed_symbols,
            vec!["BTC-IDR".to_string(), "ZERO".to_string()]
        );
        assert_eq!(store.price_of("AAPL"), Some(dec!(101)));
        assert_eq!(store.price_of("MSFT"), Some(MAX_STORED_PRICE));
        assert_eq!(store.price_of("BTC-IDR"), Some(dec!(5)));
        assert_eq!(store.price_of("ZERO"), Some(dec!(2)));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn no_holdings_means_no_commit() {
        let store = Arc::new(MemoryStore::default());
        let market = Arc::new(StubMarket::default());

        let summary = service(store.clone(), market).refresh_all().await.unwrap();

        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.updated_count, 0);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_symbol_times_out_without_stalling_the_pass() {
        let store = Arc::new(MemoryStore::with(vec![holding("SLOW", dec!(10), None)]));
        let market = Arc::new(StubMarket {
            delay: Some(Duration::from_secs(60)),
            ..StubMarket::with(&[("SLOW", dec!(11))])
        });

        let summary = service(store.clone(), market).refresh_all().await.unwrap();

        assert_eq!(summary.updated_count, 0);
        assert_eq!(summary.failed_symbols, vec!["SLOW".to_string()]);
        assert_eq!(store.price_of("SLOW"), None);
    }

    #[tokio::test]
    async fn dry_run_plans_without_committing() {
        let store = Arc::new(MemoryStore::with(vec![
            holding("AAPL", dec!(100), None),
            holding("GONE", dec!(100), None),
        ]));
        let market = Arc::new(StubMarket::with(&[("AAPL", dec!(99.999))]));

        let outcomes = service(store.clone(), market).plan_pass().await.unwrap();

        assert_eq!(
            outcomes[0].outcome,
            PriceOutcome::Updated { price: dec!(100.00) }
        );
        assert_eq!(outcomes[1].outcome, PriceOutcome::Unavailable);
        assert_eq!(store.commit_count(), 0);
        assert_eq!(store.price_of("AAPL"), None);
    }

    /// Blocks inside `fetch_price` until released, so a pass can be held open.
    struct GatedMarket {
        entered: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl MarketDataClient for GatedMarket {
        fn provider_name(&self) -> &'static str {
            "gated"
        }

        async fn fetch_price(&self, _symbol: &str) -> Option<Decimal> {
            self.entered.notify_one();
            self.release.notified().await;
            Some(dec!(1))
        }

        async fn fetch_history(&self, _symbol: &str, _period: HistoryPeriod) -> Vec<PriceBar> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn concurrent_call_is_rejected_as_busy() {
        let store = Arc::new(MemoryStore::with(vec![holding("AAPL", dec!(1), None)]));
        let market = Arc::new(GatedMarket {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let svc = Arc::new(service(store.clone(), market.clone()));

        let first = tokio::spawn({
            let svc = svc.clone();
            async move { svc.refresh_all().await }
        });
        market.entered.notified().await;

        let second = svc.refresh_all().await;
        assert!(matches!(second, Err(RefreshError::Busy)));

        market.release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.updated_count, 1);

        // The guard is released once the pass finishes.
        market.release.notify_one();
        assert!(svc.refresh_all().await.is_ok());
    }
}
