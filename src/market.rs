//! Yahoo Finance client for quotes, fundamentals and intraday charts.
//!
//! Every request can go out directly or through a public CORS relay that
//! takes the original URL as its `url` query parameter. The poller uses the
//! direct route as primary and the relay as fallback.

use crate::error::FetchError;
use crate::models::{Candle, Chart, Fundamentals, MarketState, Quote};
use crate::poll::{FetchFn, fetch_fn};
use crate::symbol::SymbolRules;
use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Yahoo rejects requests without a browser-looking user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Quote summary modules requested for the fundamentals panel.
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData,summaryProfile";

/// Where the market data lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEndpoints {
    #[serde(default = "default_quote_url")]
    pub quote_url: String,
    #[serde(default = "default_summary_url")]
    pub summary_url: String,
    #[serde(default = "default_chart_url")]
    pub chart_url: String,
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
}

impl Default for MarketEndpoints {
    fn default() -> Self {
        Self {
            quote_url: default_quote_url(),
            summary_url: default_summary_url(),
            chart_url: default_chart_url(),
            proxy_url: default_proxy_url(),
        }
    }
}

fn default_quote_url() -> String {
    "https://query1.finance.yahoo.com/v7/finance/quote".to_string()
}
fn default_summary_url() -> String {
    "https://query2.finance.yahoo.com/v10/finance/quoteSummary".to_string()
}
fn default_chart_url() -> String {
    "https://query1.finance.yahoo.com/v8/finance/chart".to_string()
}
fn default_proxy_url() -> String {
    "https://api.allorigins.win/raw".to_string()
}

/// How a request reaches Yahoo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Direct,
    Relay,
}

impl Route {
    fn origin(self) -> &'static str {
        match self {
            Route::Direct => "Network",
            Route::Relay => "Proxy",
        }
    }
}

/// Market data client.
#[derive(Clone)]
pub struct MarketClient {
    client: Client,
    endpoints: MarketEndpoints,
    rules: SymbolRules,
}

impl MarketClient {
    /// Create a new market data client.
    pub fn new(timeout_secs: u64, endpoints: MarketEndpoints, rules: SymbolRules) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoints,
            rules,
        })
    }

    pub fn quote_url(&self, symbol: &str) -> String {
        format!("{}?symbols={}", self.endpoints.quote_url, self.rules.ensure_nse(symbol))
    }

    pub fn fundamentals_url(&self, symbol: &str) -> String {
        format!(
            "{}/{}?modules={}",
            self.endpoints.summary_url,
            self.rules.ensure_nse(symbol),
            SUMMARY_MODULES
        )
    }

    pub fn chart_url(&self, symbol: &str) -> String {
        format!(
            "{}/{}?interval=1m&range=1d",
            self.endpoints.chart_url,
            self.rules.ensure_nse(symbol)
        )
    }

    /// Wrap `url` for the CORS relay.
    pub fn relay_url(&self, url: &str) -> String {
        format!("{}?url={}", self.endpoints.proxy_url, urlencoding::encode(url))
    }

    async fn get_json<R: DeserializeOwned>(&self, url: &str, route: Route) -> Result<R, FetchError> {
        let target = match route {
            Route::Direct => url.to_string(),
            Route::Relay => self.relay_url(url),
        };
        debug!(url = %target, ?route, "market data request");

        let response = self.client.get(&target).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                origin: route.origin(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    /// Fetch the live quote for one symbol.
    pub async fn get_quote(&self, symbol: &str, route: Route) -> Result<Quote, FetchError> {
        let data: YahooQuoteResponse = self.get_json(&self.quote_url(symbol), route).await?;
        data.into_quote()
    }

    /// Fetch company fundamentals.
    pub async fn get_fundamentals(&self, symbol: &str, route: Route) -> Result<Fundamentals, FetchError> {
        let data: YahooSummaryResponse = self.get_json(&self.fundamentals_url(symbol), route).await?;
        data.into_fundamentals()
    }

    /// Fetch today's one-minute candles.
    pub async fn get_chart(&self, symbol: &str, route: Route) -> Result<Chart, FetchError> {
        let data: YahooChartResponse = self.get_json(&self.chart_url(symbol), route).await?;
        data.into_chart()
    }

    pub fn quote_source(&self) -> (FetchFn<Quote>, FetchFn<Quote>) {
        self.sources(|client, symbol, route| async move { client.get_quote(&symbol, route).await })
    }

    pub fn fundamentals_source(&self) -> (FetchFn<Fundamentals>, FetchFn<Fundamentals>) {
        self.sources(|client, symbol, route| async move { client.get_fundamentals(&symbol, route).await })
    }

    pub fn chart_source(&self) -> (FetchFn<Chart>, FetchFn<Chart>) {
        self.sources(|client, symbol, route| async move { client.get_chart(&symbol, route).await })
    }

    /// Direct and relay fetch functions for one endpoint.
    fn sources<T, F, Fut>(&self, fetch: F) -> (FetchFn<T>, FetchFn<T>)
    where
        F: Fn(MarketClient, String, Route) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let via = |route: Route| {
            let client = self.clone();
            let fetch = fetch.clone();
            fetch_fn(move |symbol| fetch(client.clone(), symbol, route))
        };
        (via(Route::Direct), via(Route::Relay))
    }
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteResponse {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<YahooQuote>,
}

impl YahooQuoteResponse {
    fn into_quote(self) -> Result<Quote, FetchError> {
        self.quote_response
            .result
            .into_iter()
            .next()
            .map(YahooQuote::into_quote)
            .ok_or(FetchError::Empty("Stock not found or API error"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuote {
    symbol: String,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_change: Option<f64>,
    #[serde(default)]
    regular_market_change_percent: Option<f64>,
    #[serde(default)]
    regular_market_previous_close: Option<f64>,
    #[serde(default)]
    regular_market_open: Option<f64>,
    #[serde(default)]
    regular_market_day_high: Option<f64>,
    #[serde(default)]
    regular_market_day_low: Option<f64>,
    #[serde(default)]
    fifty_two_week_high: Option<f64>,
    #[serde(default)]
    fifty_two_week_low: Option<f64>,
    #[serde(default)]
    regular_market_volume: Option<u64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    full_exchange_name: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    market_state: Option<String>,
    #[serde(default)]
    regular_market_time: Option<i64>,
}

impl YahooQuote {
    fn into_quote(self) -> Quote {
        Quote {
            name: self
                .long_name
                .or(self.short_name)
                .unwrap_or_else(|| self.symbol.clone()),
            symbol: self.symbol,
            price: self.regular_market_price.unwrap_or(0.0),
            change: self.regular_market_change.unwrap_or(0.0),
            change_percent: self.regular_market_change_percent.unwrap_or(0.0),
            previous_close: self.regular_market_previous_close.unwrap_or(0.0),
            open: self.regular_market_open.unwrap_or(0.0),
            day_high: self.regular_market_day_high.unwrap_or(0.0),
            day_low: self.regular_market_day_low.unwrap_or(0.0),
            year_high: self.fifty_two_week_high.unwrap_or(0.0),
            year_low: self.fifty_two_week_low.unwrap_or(0.0),
            volume: self.regular_market_volume.unwrap_or(0),
            market_cap: self.market_cap,
            currency: self.currency.unwrap_or_else(|| "INR".to_string()),
            exchange: self.full_exchange_name.or(self.exchange).unwrap_or_default(),
            market_state: MarketState::parse(self.market_state.as_deref()),
            timestamp: self
                .regular_market_time
                .and_then(|t| Utc.timestamp_opt(t, 0).single())
                .unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooSummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    #[serde(default)]
    result: Option<Vec<SummaryModules>>,
}

/// Yahoo wraps numbers as `{ "raw": 1.5, "fmt": "1.50" }`.
#[derive(Debug, Default, Deserialize)]
struct Raw {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<Raw>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryModules {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    financial_data: Option<FinancialData>,
    summary_profile: Option<SummaryProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    market_cap: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<Raw>,
    dividend_yield: Option<Raw>,
    fifty_day_average: Option<Raw>,
    two_hundred_day_average: Option<Raw>,
    market_cap: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct KeyStatistics {
    price_to_book: Option<Raw>,
    trailing_eps: Option<Raw>,
    book_value: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FinancialData {
    return_on_equity: Option<Raw>,
    debt_to_equity: Option<Raw>,
    target_mean_price: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryProfile {
    sector: Option<String>,
    industry: Option<String>,
    country: Option<String>,
    long_business_summary: Option<String>,
}

impl YahooSummaryResponse {
    fn into_fundamentals(self) -> Result<Fundamentals, FetchError> {
        let modules = self
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or(FetchError::Empty("Fundamental data not available"))?;

        let price = modules.price.unwrap_or_default();
        let detail = modules.summary_detail.unwrap_or_default();
        let stats = modules.default_key_statistics.unwrap_or_default();
        let financial = modules.financial_data.unwrap_or_default();
        let profile = modules.summary_profile.unwrap_or_default();

        Ok(Fundamentals {
            name: price.long_name.or(price.short_name),
            sector: profile.sector,
            industry: profile.industry,
            country: profile.country,
            description: profile.long_business_summary,
            market_cap: raw(&price.market_cap).or(raw(&detail.market_cap)),
            trailing_pe: raw(&detail.trailing_pe),
            price_to_book: raw(&stats.price_to_book),
            trailing_eps: raw(&stats.trailing_eps),
            book_value: raw(&stats.book_value),
            dividend_yield: raw(&detail.dividend_yield),
            return_on_equity: raw(&financial.return_on_equity),
            debt_to_equity: raw(&financial.debt_to_equity),
            fifty_day_average: raw(&detail.fifty_day_average),
            two_hundred_day_average: raw(&detail.two_hundred_day_average),
            target_mean_price: raw(&financial.target_mean_price),
        })
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    result: Option<Vec<ChartSeries>>,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<OhlcArrays>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OhlcArrays {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
}

impl YahooChartResponse {
    fn into_chart(self) -> Result<Chart, FetchError> {
        let series = self
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or(FetchError::Empty("Chart data not available"))?;
        let ohlc = series.indicators.quote.into_iter().next().unwrap_or_default();

        let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();
        let candles = series
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &time)| {
                Some(Candle {
                    time,
                    open: at(&ohlc.open, i)?,
                    high: at(&ohlc.high, i)?,
                    low: at(&ohlc.low, i)?,
                    close: at(&ohlc.close, i)?,
                })
            })
            .collect();

        Ok(Chart {
            symbol: series.meta.symbol,
            candles,
        })
    }
}
