pub mod analysis;
pub mod domain;
pub mod market;
pub mod prices;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 15 * 60;
    const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub market_data_base_url: Option<String>,
        pub market_data_timeout_secs: Option<u64>,
        pub price_refresh_interval_secs: Option<u64>,
        pub price_fetch_timeout_secs: Option<u64>,
        pub port: Option<u16>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                market_data_base_url: std::env::var("MARKET_DATA_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                market_data_timeout_secs: parse_env("MARKET_DATA_TIMEOUT_SECS")?,
                price_refresh_interval_secs: parse_env("PRICE_REFRESH_INTERVAL_SECS")?,
                price_fetch_timeout_secs: parse_env("PRICE_FETCH_TIMEOUT_SECS")?,
                port: parse_env("PORT")?,
            }
            .validate()
        }

        /// Rejects zero intervals and timeouts.
        pub fn validate(self) -> anyhow::Result<Self> {
            for (key, value) in [
                ("MARKET_DATA_TIMEOUT_SECS", self.market_data_timeout_secs),
                ("PRICE_REFRESH_INTERVAL_SECS", self.price_refresh_interval_secs),
                ("PRICE_FETCH_TIMEOUT_SECS", self.price_fetch_timeout_secs),
            ] {
                anyhow::ensure!(value != Some(0), "{key} must be greater than zero");
            }
            Ok(self)
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn refresh_interval(&self) -> Duration {
            Duration::from_secs(
                self.price_refresh_interval_secs
                    .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
            )
        }

        pub fn fetch_timeout(&self) -> Duration {
            Duration::from_secs(
                self.price_fetch_timeout_secs
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            )
        }

        pub fn port(&self) -> u16 {
            self.port.unwrap_or(DEFAULT_PORT)
        }
    }

    // Unset is fine; set-but-garbage is a startup error rather than a silent default.
    fn parse_env<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>> {
        match std::env::var(key) {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| anyhow::anyhow!("{key} has an invalid value: {s}")),
            _ => Ok(None),
        }
    }

}
