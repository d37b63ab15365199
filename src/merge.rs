//! Merge of the emotion table with the latest market volatility
//!
//! The latest VIX close is broadcast onto every row: all rows of one run share
//! the same `vix_close` and `analysis_timestamp`. Rows are not aligned with the
//! series by date.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::analysis::result::round2;
use crate::error::{MergeError, TableError};
use crate::io::table::{format_float, write_table, EmotionTable};
use crate::market::provider::MarketDataProvider;
use crate::market::MarketDataFetcher;

/// Columns appended to the emotion table by a merge
pub const MARKET_COLUMNS: [&str; 3] = ["vix_close", "fear_vix_gap", "analysis_timestamp"];

/// `strftime` layout of `analysis_timestamp`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Market context captured once per merge run
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    /// Latest volatility close, rounded to two decimals
    pub vix_close: f64,

    /// Moment the run started
    pub analysis_time: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Capture a snapshot; the value is rounded to two decimals
    pub fn new(vix_close: f64, analysis_time: DateTime<Utc>) -> Self {
        Self {
            vix_close: round2(vix_close),
            analysis_time,
        }
    }

    /// Timestamp as written to the dataset, e.g. `2024-03-04 15:02:11 UTC`
    pub fn analysis_timestamp(&self) -> String {
        self.analysis_time.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// One emotion row widened with market context
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    /// Image file name
    pub image: String,

    /// Fear score from the emotion table
    pub fear_score: f64,

    /// Remaining emotion-table cells, aligned with [`MergedDataset::input_headers`]
    pub values: Vec<String>,

    /// Broadcast volatility close
    pub vix_close: f64,

    /// `fear_score - vix_close`, rounded to two decimals
    pub fear_vix_gap: f64,

    /// Run timestamp
    pub analysis_timestamp: String,
}

/// Final dataset of one merge run
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDataset {
    input_headers: Vec<String>,
    rows: Vec<MergedRow>,
    snapshot: MarketSnapshot,
}

impl MergedDataset {
    /// Join a snapshot onto every row of an emotion table
    ///
    /// Columns of the table that share a name with [`MARKET_COLUMNS`] are
    /// replaced rather than duplicated.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use visual_fear_index::io::table::{EmotionRow, EmotionTable};
    /// use visual_fear_index::merge::{MarketSnapshot, MergedDataset};
    ///
    /// let row = |image: &str, fear: f64| EmotionRow {
    ///     image: image.to_string(),
    ///     fear_score: fear,
    ///     values: vec![image.to_string(), fear.to_string()],
    /// };
    /// let table = EmotionTable::new(
    ///     vec!["image".into(), "fear_score".into()],
    ///     vec![row("a.jpg", 42.10), row("b.jpg", 10.00)],
    /// );
    /// let when = Utc.with_ymd_and_hms(2024, 3, 4, 15, 2, 11).unwrap();
    ///
    /// let merged = MergedDataset::broadcast(table, &MarketSnapshot::new(18.50, when));
    ///
    /// assert_eq!(merged.rows()[0].fear_vix_gap, 23.60);
    /// assert_eq!(merged.rows()[1].fear_vix_gap, -8.50);
    /// assert_eq!(merged.rows()[1].analysis_timestamp, "2024-03-04 15:02:11 UTC");
    /// ```
    pub fn broadcast(table: EmotionTable, snapshot: &MarketSnapshot) -> Self {
        let (headers, rows) = table.into_parts();
        let keep: Vec<bool> = headers
            .iter()
            .map(|h| !MARKET_COLUMNS.contains(&h.as_str()))
            .collect();
        let input_headers = headers
            .into_iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(h, _)| h)
            .collect();

        let analysis_timestamp = snapshot.analysis_timestamp();
        let rows = rows
            .into_iter()
            .map(|row| MergedRow {
                values: row
                    .values
                    .into_iter()
                    .zip(&keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v)
                    .collect(),
                vix_close: snapshot.vix_close,
                fear_vix_gap: round2(row.fear_score - snapshot.vix_close),
                analysis_timestamp: analysis_timestamp.clone(),
                image: row.image,
                fear_score: row.fear_score,
            })
            .collect();

        Self {
            input_headers,
            rows,
            snapshot: snapshot.clone(),
        }
    }

    /// Emotion-table columns carried into the dataset
    pub fn input_headers(&self) -> &[String] {
        &self.input_headers
    }

    /// All column names: emotion-table columns, then [`MARKET_COLUMNS`]
    pub fn headers(&self) -> Vec<String> {
        self.input_headers
            .iter()
            .cloned()
            .chain(MARKET_COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    /// Rows in emotion-table order
    pub fn rows(&self) -> &[MergedRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Market context shared by every row
    pub fn snapshot(&self) -> &MarketSnapshot {
        &self.snapshot
    }

    /// Mean fear score, `None` for an empty dataset
    pub fn mean_fear_score(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        Some(self.rows.iter().map(|r| r.fear_score).sum::<f64>() / self.rows.len() as f64)
    }

    /// Write the dataset to `path`, replacing any previous file
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        write_table(path, self.headers(), self.rows.iter().map(row_cells))
    }

    /// Write the header and the first `limit` rows as CSV to `out`
    ///
    /// Cells are quoted as in the saved file.
    pub fn write_head<W: Write>(&self, out: W, limit: usize) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(self.headers())?;
        for row in self.rows.iter().take(limit) {
            writer.write_record(row_cells(row))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn row_cells(row: &MergedRow) -> Vec<String> {
    let mut cells = row.values.clone();
    cells.push(format_float(row.vix_close));
    cells.push(format_float(row.fear_vix_gap));
    cells.push(row.analysis_timestamp.clone());
    cells
}

/// Joins the intermediate emotion table with fresh market data
#[derive(Debug, Clone)]
pub struct Merger<P> {
    fetcher: MarketDataFetcher<P>,
}

impl<P: MarketDataProvider> Merger<P> {
    /// Create a merger using `fetcher` for volatility data
    pub fn new(fetcher: MarketDataFetcher<P>) -> Self {
        Self { fetcher }
    }

    /// The market data fetcher
    pub fn fetcher(&self) -> &MarketDataFetcher<P> {
        &self.fetcher
    }

    /// Merge the emotion table with the latest volatility close
    ///
    /// The analysis time is captured once, when the merge starts.
    ///
    /// # Arguments
    ///
    /// * `emotion_table` - Intermediate table written by the batch runner
    /// * `period` - Provider period token for the volatility history
    /// * `output` - Destination of the final dataset
    ///
    /// # Errors
    ///
    /// Any [`MergeError`] aborts the merge before `output` is touched.
    pub fn merge(&self, emotion_table: &Path, period: &str, output: &Path) -> Result<MergedDataset, MergeError> {
        let analysis_time = Utc::now();
        self.merge_at(emotion_table, period, output, analysis_time)
    }

    /// [`Merger::merge`] with an explicit analysis time
    pub fn merge_at(
        &self,
        emotion_table: &Path,
        period: &str,
        output: &Path,
        analysis_time: DateTime<Utc>,
    ) -> Result<MergedDataset, MergeError> {
        log::info!("Reading emotion results from {}...", emotion_table.display());
        let table = EmotionTable::load(emotion_table)?;

        let unavailable = || MergeError::MarketDataUnavailable {
            period: period.to_string(),
        };
        let series = self.fetcher.fetch(period).ok_or_else(unavailable)?;
        let latest = series.latest_vix_value().map_err(|_| unavailable())?;
        let snapshot = MarketSnapshot::new(latest, analysis_time);
        log::info!("Latest {} value: {:.2}", self.fetcher.symbol(), snapshot.vix_close);

        let dataset = MergedDataset::broadcast(table, &snapshot);

        log::info!("Saving merged dataset to {}...", output.display());
        dataset.save(output).map_err(|source| MergeError::Write {
            path: output.to_path_buf(),
            source,
        })?;
        log::info!(
            "Successfully created {} with {} records",
            output.display(),
            dataset.len()
        );
        Ok(dataset)
    }
}
