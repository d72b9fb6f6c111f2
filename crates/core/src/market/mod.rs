pub mod yahoo;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Source of prices for ticker symbols.
///
/// Implementations never fail outward: provider errors, unknown symbols and empty responses are
/// logged and surface as `None` / an empty history. Retrying is the caller's business.
#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Most recent closing price, or `None` when unavailable.
    async fn fetch_price(&self, symbol: &str) -> Option<Decimal>;

    /// Daily bars for `period`, oldest first. Empty when unavailable.
    async fn fetch_history(&self, symbol: &str, period: HistoryPeriod) -> Vec<PriceBar>;

    /// Latest bar plus descriptive fields. Providers without metadata report the defaults.
    async fn fetch_quote(&self, symbol: &str) -> Option<StockQuote> {
        let last_bar = self
            .fetch_history(symbol, HistoryPeriod::OneDay)
            .await
            .pop()?;
        Some(StockQuote::new(symbol, None, None, last_bar))
    }
}

pub const UNKNOWN_NAME: &str = "Unknown";
pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub current_price: f64,
    #[serde(flatten)]
    pub last_bar: PriceBar,
}

impl StockQuote {
    pub fn new(
        symbol: &str,
        name: Option<String>,
        currency: Option<String>,
        last_bar: PriceBar,
    ) -> Self {
        Self {
            symbol: symbol.trim().to_ascii_uppercase(),
            name: name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            currency: currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            current_price: last_bar.close,
            last_bar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "max")]
    Max,
}

impl HistoryPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::OneDay => "1d",
            HistoryPeriod::FiveDays => "5d",
            HistoryPeriod::OneMonth => "1mo",
            HistoryPeriod::ThreeMonths => "3mo",
            HistoryPeriod::SixMonths => "6mo",
            HistoryPeriod::OneYear => "1y",
            HistoryPeriod::TwoYears => "2y",
            HistoryPeriod::FiveYears => "5y",
            HistoryPeriod::Max => "max",
        }
    }
}

impl Default for HistoryPeriod {
    fn default() -> Self {
        HistoryPeriod::OneMonth
    }
}

impl FromStr for HistoryPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let period = match s.trim() {
            "1d" => HistoryPeriod::OneDay,
            "5d" => HistoryPeriod::FiveDays,
            "1mo" => HistoryPeriod::OneMonth,
            "3mo" => HistoryPeriod::ThreeMonths,
            "6mo" => HistoryPeriod::SixMonths,
            "1y" => HistoryPeriod::OneYear,
            "2y" => HistoryPeriod::TwoYears,
            "5y" => HistoryPeriod::FiveYears,
            "max" => HistoryPeriod::Max,
            other => anyhow::bail!("unknown history period: {other:?}"),
        };
        Ok(period)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

const COMMON_TICKERS: [(&str, &str); 8] = [
    ("AAPL", "Apple Inc."),
    ("GOOGL", "Alphabet Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("TSLA", "Tesla, Inc."),
    ("AMZN", "Amazon.com, Inc."),
    ("META", "Meta Platforms, Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("NFLX", "Netflix, Inc."),
];

const MAX_SEARCH_RESULTS: usize = 10;

/// Match `query` against a fixed table of well-known tickers, by symbol or company name.
pub fn search_symbols(query: &str) -> Vec<SymbolMatch> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let upper = query.to_ascii_uppercase();
    let lower = query.to_lowercase();

    COMMON_TICKERS
        .iter()
        .filter(|(symbol, name)| symbol.contains(&upper) || name.to_lowercase().contains(&lower))
        .take(MAX_SEARCH_RESULTS)
        .map(|(symbol, name)| SymbolMatch {
            symbol: symbol.to_string(),
            name: name.to_string(),
            kind: "stock".to_string(),
        })
        .collect()
}
