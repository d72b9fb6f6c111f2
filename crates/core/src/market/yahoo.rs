use crate::config::Settings;
use crate::market::{HistoryPeriod, MarketDataClient, PriceBar, StockQuote};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const CHART_PATH: [&str; 3] = ["v8", "finance", "chart"];
// The chart endpoint rejects requests without a browser-like user agent.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; budget-backend/0.1)";

/// Yahoo Finance chart API client.
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl YahooChartClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .market_data_base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("invalid MARKET_DATA_BASE_URL: {base_url}"))?;
        let timeout_secs = settings
            .market_data_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self { http, base_url })
    }

    /// The symbol is pushed as one percent-encoded path segment.
    fn url(&self, symbol: &str) -> Result<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("market data base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(CHART_PATH)
            .push(symbol.trim());
        Ok(url)
    }

    async fn try_fetch_chart(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<(ChartMeta, Vec<PriceBar>)> {
        let res = self
            .http
            .get(self.url(symbol)?)
            .query(&[("range", period.as_str()), ("interval", "1d")])
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        let parsed = serde_json::from_str::<ChartResponse>(&text)
            .with_context(|| format!("market data HTTP {status}: unexpected body: {text}"))?;

        // Yahoo reports unknown symbols as 404 with a structured error body.
        if let Some(err) = &parsed.chart.error {
            anyhow::bail!("market data provider error [{}]: {}", err.code, err.description);
        }
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status}");
        }

        Ok(parse_chart(parsed))
    }

    async fn fetch_chart(&self, symbol: &str, period: HistoryPeriod) -> (ChartMeta, Vec<PriceBar>) {
        match self.try_fetch_chart(symbol, period).await {
            Ok((meta, bars)) => {
                if bars.is_empty() {
                    tracing::warn!(%symbol, period = period.as_str(), "no market data returned");
                }
                (meta, bars)
            }
            Err(err) => {
                tracing::warn!(%symbol, period = period.as_str(), error = %err, "market data fetch failed");
                (ChartMeta::default(), Vec::new())
            }
        }
    }
}

#[async_trait::async_trait]
impl MarketDataClient for YahooChartClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_price(&self, symbol: &str) -> Option<Decimal> {
        let bars = self.fetch_history(symbol, HistoryPeriod::OneDay).await;
        let close = bars.last()?.close;
        let price = Decimal::from_f64(close);
        if price.is_none() {
            tracing::warn!(%symbol, close, "market data close is not representable as a decimal");
        }
        price
    }

    async fn fetch_history(&self, symbol: &str, period: HistoryPeriod) -> Vec<PriceBar> {
        self.fetch_chart(symbol, period).await.1
    }

    async fn fetch_quote(&self, symbol: &str) -> Option<StockQuote> {
        let (meta, mut bars) = self.fetch_chart(symbol, HistoryPeriod::OneDay).await;
        let last_bar = bars.pop()?;
        Some(StockQuote::new(
            symbol,
            meta.long_name.or(meta.short_name),
            meta.currency,
            last_bar,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    long_name: Option<String>,
    short_name: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn parse_chart(resp: ChartResponse) -> (ChartMeta, Vec<PriceBar>) {
    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return (ChartMeta::default(), Vec::new());
    };
    let meta = result.meta;
    let Some(series) = result.indicators.quote.into_iter().next() else {
        return (meta, Vec::new());
    };

    let mut out = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&series.open),
            field(&series.high),
            field(&series.low),
            field(&series.close),
        ) else {
            continue;
        };
        let Some(timestamp) = DateTime::<Utc>::from_timestamp(*ts, 0) else {
            continue;
        };
        out.push(PriceBar {
            timestamp,
            open,
            high,
            low,
            close,
        });
    }
    (meta, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> Vec<PriceBar> {
        parse_chart(serde_json::from_value::<ChartResponse>(v).unwrap()).1
    }

    #[test]
    fn parses_chart_and_skips_null_bars() {
        let bars = parse(json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "AAPL", "currency": "USD"},
                    "timestamp": [1767225600, 1767312000, 1767398400],
                    "indicators": {
                        "quote": [{
                            "open": [10.0, null, 12.0],
                            "high": [11.0, 12.0, 13.0],
                            "low": [9.5, 10.5, 11.5],
                            "close": [10.5, 11.5, 12.75],
                            "volume": [100, 200, 300]
                        }]
                    }
                }],
                "error": null
            }
        }));

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 10.5);
        assert_eq!(bars[1].close, 12.75);
        assert_eq!(bars[1].timestamp.timestamp(), 1767398400);
    }

    #[test]
    fn chart_meta_carries_name_and_currency() {
        let resp = serde_json::from_value::<ChartResponse>(json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "7203.T", "currency": "JPY", "shortName": "TOYOTA MOTOR CORP"},
                    "timestamp": [1767225600],
                    "indicators": {"quote": [{"open": [1.0], "high": [2.0], "low": [0.5], "close": [1.5]}]}
                }],
                "error": null
            }
        }))
        .unwrap();
        let (meta, bars) = parse_chart(resp);

        let quote = StockQuote::new(
            "7203.t",
            meta.long_name.or(meta.short_name),
            meta.currency,
            bars[0].clone(),
        );
        assert_eq!(quote.symbol, "7203.T");
        assert_eq!(quote.name, "TOYOTA MOTOR CORP");
        assert_eq!(quote.currency, "JPY");
        assert_eq!(quote.current_price, 1.5);
    }

    #[test]
    fn provider_error_body_deserializes_with_no_bars() {
        let resp = serde_json::from_value::<ChartResponse>(json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }))
        .unwrap();
        assert!(resp.chart.error.is_some());
        assert!(parse_chart(resp).1.is_empty());
    }

    #[test]
    fn empty_result_has_no_bars() {
        let bars = parse(json!({
            "chart": {
                "result": [{"timestamp": [], "indicators": {"quote": [{}]}}],
                "error": null
            }
        }));
        assert!(bars.is_empty());
    }

    fn client(base_url: &str) -> YahooChartClient {
        let settings = Settings {
            database_url: None,
            sentry_dsn: None,
            market_data_base_url: Some(base_url.to_string()),
            market_data_timeout_secs: Some(2),
            price_refresh_interval_secs: None,
            price_fetch_timeout_secs: None,
            port: None,
        };
        YahooChartClient::from_settings(&settings).unwrap()
    }

    #[test]
    fn symbol_is_a_single_encoded_path_segment() {
        let url = client("https://query1.finance.yahoo.com").url(" BRK-B ").unwrap();
        assert_eq!(url.as_str(), "https://query1.finance.yahoo.com/v8/finance/chart/BRK-B");

        let url = client("http://localhost:8080/proxy/").url("A/B?C#D").unwrap();
        assert_eq!(url.path(), "/proxy/v8/finance/chart/A%2FB%3FC%23D");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let settings = Settings {
            database_url: None,
            sentry_dsn: None,
            market_data_base_url: Some("not a url".to_string()),
            market_data_timeout_secs: None,
            price_refresh_interval_secs: None,
            price_fetch_timeout_secs: None,
            port: None,
        };
        assert!(YahooChartClient::from_settings(&settings).is_err());
    }

    #[tokio::test]
    async fn unreachable_provider_reports_absent_price() {
        // Reserved port on localhost: the connection is refused immediately.
        let client = client("http://127.0.0.1:9");
        assert_eq!(client.fetch_price("AAPL").await, None);
        assert!(client
            .fetch_history("AAPL", HistoryPeriod::FiveDays)
            .await
            .is_empty());
    }
}
