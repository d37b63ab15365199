//! Market volatility retrieval
//!
//! [`MarketDataFetcher`] asks a [`provider::MarketDataProvider`] for the daily
//! history of one symbol and normalizes it to a [`series::VolatilitySeries`].
//! Callers that only care whether data is available use
//! [`MarketDataFetcher::fetch`]; `None` means "no data" for any reason.

pub mod provider;
pub mod series;

use provider::MarketDataProvider;
use series::VolatilitySeries;

use crate::error::MarketDataError;

/// Symbol of the CBOE volatility index on the default provider
pub const VIX_SYMBOL: &str = "^VIX";

/// Fetches and normalizes a volatility series for one symbol
#[derive(Debug, Clone)]
pub struct MarketDataFetcher<P> {
    provider: P,
    symbol: String,
}

impl<P: MarketDataProvider> MarketDataFetcher<P> {
    /// Create a fetcher for `symbol`
    pub fn new(provider: P, symbol: impl Into<String>) -> Self {
        Self {
            provider,
            symbol: symbol.into(),
        }
    }

    /// Symbol requested from the provider
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Fetch the series, keeping the reason for a failure
    ///
    /// `period` is passed to the provider untouched (e.g. `7d`, `1mo`).
    pub fn try_fetch(&self, period: &str) -> Result<VolatilitySeries, MarketDataError> {
        log::info!("Fetching {} data for period: {}...", self.symbol, period);
        let frame = self.provider.download(&self.symbol, period)?;
        let series = VolatilitySeries::from_frame(&frame)?;
        log::debug!(
            "Normalized {} of {} provider rows",
            series.len(),
            frame.timestamps.len()
        );
        Ok(series)
    }

    /// Fetch the series, or `None` when no data is available
    ///
    /// Empty results, timeouts, transport and provider errors are logged and
    /// all reported as `None`.
    pub fn fetch(&self, period: &str) -> Option<VolatilitySeries> {
        match self.try_fetch(period) {
            Ok(series) => Some(series),
            Err(MarketDataError::EmptySeries) => {
                log::warn!("No {} data retrieved for period {}", self.symbol, period);
                None
            }
            Err(e) => {
                log::warn!("Error fetching {} data: {}", self.symbol, e);
                None
            }
        }
    }
}
