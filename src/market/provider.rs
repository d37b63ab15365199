//! Market data capability

use std::time::Duration;

use serde::Deserialize;

use crate::error::MarketDataError;

/// Raw daily history as delivered by a provider
///
/// Columns are parallel: `closes[i]` belongs to `timestamps[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderFrame {
    /// Bar timestamps, Unix seconds
    pub timestamps: Vec<i64>,

    /// Exchange offset from UTC in seconds, used to derive trading dates
    pub utc_offset_seconds: i64,

    /// Closing values; `None` where the provider has a gap
    pub closes: Vec<Option<f64>>,
}

/// A market data capability returning daily history for a symbol
pub trait MarketDataProvider {
    /// Download daily bars of `symbol` covering `period`
    fn download(&self, symbol: &str, period: &str) -> Result<ProviderFrame, MarketDataError>;
}

impl<T: MarketDataProvider + ?Sized> MarketDataProvider for &T {
    fn download(&self, symbol: &str, period: &str) -> Result<ProviderFrame, MarketDataError> {
        (**self).download(symbol, period)
    }
}

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = concat!("visual-fear-index/", env!("CARGO_PKG_VERSION"));

/// Yahoo Finance chart endpoint (`/v8/finance/chart/{symbol}`)
#[derive(Clone)]
pub struct YahooChartProvider {
    base_url: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for YahooChartProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooChartProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YahooChartProvider {
    /// Create a provider whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(YAHOO_BASE_URL, timeout)
    }

    /// Create a provider against another host serving the same API
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    /// URL of the chart resource for `symbol`
    pub fn chart_url(&self, symbol: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(symbol.as_bytes()).collect();
        format!("{}/v8/finance/chart/{}", self.base_url, encoded)
    }
}

impl MarketDataProvider for YahooChartProvider {
    fn download(&self, symbol: &str, period: &str) -> Result<ProviderFrame, MarketDataError> {
        let url = self.chart_url(symbol);
        log::debug!("GET {} range={}", url, period);

        let response = self
            .agent
            .get(&url)
            .query("range", period)
            .query("interval", "1d")
            .set("User-Agent", USER_AGENT)
            .call();

        let body = match response {
            Ok(response) => response
                .into_string()
                .map_err(|e| MarketDataError::Http(e.to_string()))?,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                // The chart API explains bad symbols and ranges in the body.
                return match parse_chart_response(&body) {
                    Err(err @ MarketDataError::Provider { .. }) => Err(err),
                    _ => Err(MarketDataError::Http(format!("HTTP {code}: {body}"))),
                };
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(MarketDataError::Http(err.to_string()));
            }
        };

        parse_chart_response(&body)
    }
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Deserialize, Default)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Default)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Default)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Parse a chart API body into a [`ProviderFrame`]
///
/// # Errors
///
/// - [`MarketDataError::Provider`] when the body carries a chart error
/// - [`MarketDataError::EmptySeries`] when there is no result
/// - [`MarketDataError::Malformed`] when the JSON does not match the API
pub fn parse_chart_response(body: &str) -> Result<ProviderFrame, MarketDataError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| MarketDataError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.chart.error {
        return Err(MarketDataError::Provider {
            code: error.code,
            description: error.description,
        });
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or(MarketDataError::EmptySeries)?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    Ok(ProviderFrame {
        timestamps: result.timestamp,
        utc_offset_seconds: result.meta.gmtoffset,
        closes,
    })
}
