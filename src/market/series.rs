//! Volatility time series

use std::path::Path;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

use super::provider::ProviderFrame;
use crate::error::MarketDataError;
use crate::io::table::{format_float, write_table};

/// Column names of the standalone volatility table
pub const VOLATILITY_COLUMNS: [&str; 2] = ["date", "vix_close"];

/// One daily closing value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolatilityPoint {
    /// Trading date, exchange-local
    pub date: NaiveDate,

    /// Closing index value
    #[serde(rename = "vix_close")]
    pub value: f64,
}

/// Daily volatility values sorted ascending by date
///
/// The last point is the latest value. Duplicate dates are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolatilitySeries {
    points: Vec<VolatilityPoint>,
}

impl VolatilitySeries {
    /// Build a series, sorting points by date (stable for equal dates)
    pub fn new(mut points: Vec<VolatilityPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    /// Normalize a provider frame to `(date, value)` points
    ///
    /// Timestamps are shifted by the frame's UTC offset before taking the
    /// calendar date. Rows whose close is missing, non-finite or negative are
    /// dropped.
    ///
    /// # Errors
    ///
    /// - [`MarketDataError::Malformed`] if the columns have different lengths
    ///   or a timestamp is out of range
    /// - [`MarketDataError::EmptySeries`] if no usable row remains
    pub fn from_frame(frame: &ProviderFrame) -> Result<Self, MarketDataError> {
        if frame.timestamps.len() != frame.closes.len() {
            return Err(MarketDataError::Malformed(format!(
                "{} timestamps but {} closes",
                frame.timestamps.len(),
                frame.closes.len()
            )));
        }

        let mut points = Vec::with_capacity(frame.timestamps.len());
        for (&ts, close) in frame.timestamps.iter().zip(&frame.closes) {
            let value = match close {
                Some(v) if v.is_finite() && *v >= 0.0 => *v,
                _ => {
                    log::debug!("Dropping bar at {} with unusable close {:?}", ts, close);
                    continue;
                }
            };
            let out_of_range = || MarketDataError::Malformed(format!("timestamp {} out of range", ts));
            let local = ts.checked_add(frame.utc_offset_seconds).ok_or_else(out_of_range)?;
            let date = DateTime::from_timestamp(local, 0)
                .ok_or_else(out_of_range)?
                .date_naive();
            points.push(VolatilityPoint { date, value });
        }

        if points.is_empty() {
            return Err(MarketDataError::EmptySeries);
        }
        Ok(Self::new(points))
    }

    /// Points in ascending date order
    pub fn points(&self) -> &[VolatilityPoint] {
        &self.points
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value of the last (most recent) point
    ///
    /// This is the last row, not the maximum.
    ///
    /// # Errors
    ///
    /// [`MarketDataError::EmptySeries`] if the series has no points
    pub fn latest_vix_value(&self) -> Result<f64, MarketDataError> {
        self.points
            .last()
            .map(|p| p.value)
            .ok_or(MarketDataError::EmptySeries)
    }
}

/// Write a series as a `date,vix_close` table
///
/// # Returns
///
/// `true` on success; I/O failures are logged and reported as `false`
pub fn save(series: &VolatilitySeries, path: &Path) -> bool {
    let rows = series
        .points()
        .iter()
        .map(|p| vec![p.date.to_string(), format_float(p.value)]);
    match write_table(path, VOLATILITY_COLUMNS.map(String::from), rows) {
        Ok(()) => {
            log::info!("VIX data saved to {} ({} rows)", path.display(), series.len());
            true
        }
        Err(e) => {
            log::error!("Error saving data to {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(d: NaiveDate, value: f64) -> VolatilityPoint {
        VolatilityPoint { date: d, value }
    }

    #[test]
    fn test_new_sorts_ascending() {
        let series = VolatilitySeries::new(vec![
            point(date(2024, 3, 3), 30.0),
            point(date(2024, 3, 1), 10.0),
            point(date(2024, 3, 2), 20.0),
        ]);
        let dates: Vec<NaiveDate> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)]);
    }

    #[test]
    fn test_latest_is_last_date_not_max_or_first() {
        let series = VolatilitySeries::new(vec![
            point(date(2024, 3, 2), 35.0),
            point(date(2024, 3, 3), 14.2),
            point(date(2024, 3, 1), 12.0),
        ]);
        assert_eq!(series.latest_vix_value().unwrap(), 14.2);
    }

    #[test]
    fn test_latest_on_empty_series() {
        let err = VolatilitySeries::default().latest_vix_value().unwrap_err();
        assert!(matches!(err, MarketDataError::EmptySeries));
    }

    #[test]
    fn test_from_frame_applies_offset_and_drops_gaps() {
        // 2024-03-01 14:30 UTC and 2024-03-04 14:30 UTC, exchange offset -5h
        let frame = ProviderFrame {
            timestamps: vec![1709303400, 1709476200, 1709562600],
            utc_offset_seconds: -18000,
            closes: vec![Some(13.5), None, Some(14.25)],
        };
        let series = VolatilitySeries::from_frame(&frame).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0], point(date(2024, 3, 1), 13.5));
        assert_eq!(series.points()[1], point(date(2024, 3, 4), 14.25));
    }

    #[test]
    fn test_from_frame_rejects_mismatched_columns() {
        let frame = ProviderFrame {
            timestamps: vec![1709303400],
            utc_offset_seconds: 0,
            closes: vec![],
        };
        assert!(matches!(
            VolatilitySeries::from_frame(&frame),
            Err(MarketDataError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_frame_rejects_offset_overflow() {
        let frame = ProviderFrame {
            timestamps: vec![i64::MAX],
            utc_offset_seconds: 3600,
            closes: vec![Some(15.0)],
        };
        match VolatilitySeries::from_frame(&frame) {
            Err(MarketDataError::Malformed(msg)) => assert!(msg.contains("out of range"), "{}", msg),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_frame_without_usable_rows_is_empty() {
        let frame = ProviderFrame {
            timestamps: vec![1709303400],
            utc_offset_seconds: 0,
            closes: vec![Some(f64::NAN)],
        };
        assert!(matches!(
            VolatilitySeries::from_frame(&frame),
            Err(MarketDataError::EmptySeries)
        ));
    }

    #[test]
    fn test_save_writes_two_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vix_data.csv");
        let series = VolatilitySeries::new(vec![
            point(date(2024, 3, 2), 14.0),
            point(date(2024, 3, 1), 13.55),
        ]);
        assert!(save(&series, &path));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "date,vix_close\n2024-03-01,13.55\n2024-03-02,14.0\n"
        );
    }

    #[test]
    fn test_save_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("vix_data.csv");
        assert!(!save(&VolatilitySeries::default(), &path));
    }
}
