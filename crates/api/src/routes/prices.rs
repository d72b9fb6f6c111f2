use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use budget_core::domain::contract::ticker;
use budget_core::market::{search_symbols, HistoryPeriod, PriceBar, StockQuote, SymbolMatch};
use budget_core::prices::{RefreshError, RefreshSummary};
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update", post(update_prices))
        .route("/search", get(search))
        .route("/stock/:symbol", get(stock_quote))
        .route("/history/:symbol", get(history))
}

/// Manual refresh pass, run synchronously in the request.
async fn update_prices(State(state): State<AppState>) -> ApiResult<Json<RefreshSummary>> {
    let Some(refresher) = &state.refresher else {
        return Err(ApiError::unavailable());
    };

    match refresher.refresh_all().await {
        Ok(summary) => Ok(Json(summary)),
        Err(RefreshError::Busy) => Err(ApiError::conflict(RefreshError::Busy)),
        Err(err) => Err(ApiError::internal(anyhow::Error::new(err))),
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchResults {
    results: Vec<SymbolMatch>,
}

async fn search(query: Result<Query<SearchQuery>, QueryRejection>) -> ApiResult<Json<SearchResults>> {
    let Query(query) = query?;
    Ok(Json(SearchResults {
        results: search_symbols(query.q.as_deref().unwrap_or_default()),
    }))
}

async fn stock_quote(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<StockQuote>> {
    let Path(symbol) = path?;
    let symbol = normalize_symbol(&symbol)?;

    state
        .market
        .fetch_quote(&symbol)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(&format!("price for {symbol}")))
}

#[derive(Debug, Default, Deserialize)]
struct HistoryQuery {
    period: Option<String>,
}

#[derive(Debug, Serialize)]
struct History {
    symbol: String,
    period: HistoryPeriod,
    data: Vec<PriceBar>,
}

async fn history(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<History>> {
    let Path(symbol) = path?;
    let Query(query) = query?;
    let symbol = normalize_symbol(&symbol)?;
    let period = match query.period.as_deref() {
        Some(p) => p.parse::<HistoryPeriod>().map_err(ApiError::bad_request)?,
        None => HistoryPeriod::default(),
    };

    let data = state.market.fetch_history(&symbol, period).await;
    Ok(Json(History {
        symbol,
        period,
        data,
    }))
}

fn normalize_symbol(raw: &str) -> ApiResult<String> {
    ticker(raw.to_string()).map_err(ApiError::bad_request)
}
