use crate::error::{ApiError, ApiResult};
use crate::routes;
use axum::{routing::get, Json, Router};
use budget_core::market::MarketDataClient;
use budget_core::prices::PriceRefreshService;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    /// `None` in degraded mode.
    pub pool: Option<PgPool>,
    /// Only present alongside a database.
    pub refresher: Option<Arc<PriceRefreshService>>,
    pub market: Arc<dyn MarketDataClient>,
}

impl AppState {
    pub fn pool(&self) -> ApiResult<&PgPool> {
        self.pool.as_ref().ok_or_else(ApiError::unavailable)
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::budget::router())
        .merge(routes::investments::router())
        .merge(routes::savings::router())
        .nest("/ai", routes::analysis::router())
        .nest("/prices", routes::prices::router());

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .nest("/api", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Budget API is running" }))
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use budget_core::domain::investment::{Holding, PriceUpdate};
    use budget_core::market::{HistoryPeriod, PriceBar};
    use budget_core::prices::HoldingStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tower::ServiceExt;
    use uuid::Uuid;

    /// Market stub that knows a single symbol, `AAPL`.
    pub struct FixedMarket;

    #[async_trait::async_trait]
    impl MarketDataClient for FixedMarket {
        fn provider_name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_price(&self, symbol: &str) -> Option<Decimal> {
            (symbol == "AAPL").then(|| Decimal::new(18512, 2))
        }

        async fn fetch_history(&self, symbol: &str, _period: HistoryPeriod) -> Vec<PriceBar> {
            if symbol != "AAPL" {
                return Vec::new();
            }
            vec![
                PriceBar {
                    timestamp: Utc.with_ymd_and_hms(2025, 3, 3, 14, 30, 0).unwrap(),
                    open: 180.0,
                    high: 186.0,
                    low: 179.5,
                    close: 184.0,
                },
                PriceBar {
                    timestamp: Utc.with_ymd_and_hms(2025, 3, 4, 14, 30, 0).unwrap(),
                    open: 184.0,
                    high: 187.25,
                    low: 183.0,
                    close: 185.12,
                },
            ]
        }
    }

    /// Holdings kept in memory in place of the `investments` table.
    #[derive(Default)]
    pub struct MemoryHoldings {
        pub holdings: Mutex<Vec<Holding>>,
        pub fail_commit: bool,
    }

    impl MemoryHoldings {
        pub fn with(symbols: &[&str]) -> Self {
            let holdings = symbols
                .iter()
                .map(|symbol| Holding {
                    id: Uuid::new_v4(),
                    symbol: symbol.to_string(),
                    quantity: Decimal::ONE,
                    purchase_price: Decimal::ONE_HUNDRED,
                    current_price: None,
                })
                .collect();
            Self {
                holdings: Mutex::new(holdings),
                fail_commit: false,
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
    }

    #[async_trait::async_trait]
    impl HoldingStore for MemoryHoldings {
        async fn load_holdings(&self) -> anyhow::Result<Vec<Holding>> {
            Ok(self.holdings.lock().unwrap().clone())
        }

        async fn commit_prices(&self, updates: &[PriceUpdate]) -> anyhow::Result<u64> {
            anyhow::ensure!(!self.fail_commit, "connection reset during commit");
            let mut holdings = self.holdings.lock().unwrap();
            for update in updates {
                if let Some(h) = holdings.iter_mut().find(|h| h.id == update.investment_id) {
                    h.current_price = Some(update.price);
                }
            }
            Ok(updates.len() as u64)
        }
    }

    /// Holds every `fetch_price` call open until released.
    #[derive(Default)]
    pub struct GatedMarket {
        pub entered: Notify,
        pub release: Notify,
    }

    #[async_trait::async_trait]
    impl MarketDataClient for GatedMarket {
        fn provider_name(&self) -> &'static str {
            "gated"
        }

        async fn fetch_price(&self, _symbol: &str) -> Option<Decimal> {
            self.entered.notify_one();
            self.release.notified().await;
            Some(Decimal::TEN)
        }

        async fn fetch_history(&self, _symbol: &str, _period: HistoryPeriod) -> Vec<PriceBar> {
            Vec::new()
        }
    }

    /// Router with a refresh service over `store` and `market` but still no database pool.
    pub fn refreshing_app(
        store: Arc<MemoryHoldings>,
        market: Arc<dyn MarketDataClient>,
    ) -> Router {
        let refresher = PriceRefreshService::new(store, market.clone(), Duration::from_secs(10));
        router(AppState {
            pool: None,
            refresher: Some(Arc::new(refresher)),
            market,
        })
    }

    /// Router without a database, as started in degraded mode.
    pub fn degraded_app() -> Router {
        router(AppState {
            pool: None,
            refresher: None,
            market: Arc::new(FixedMarket),
        })
    }

    pub async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(req.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }
}
