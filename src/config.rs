//! Configuration parameters for the fear index pipeline

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration parameters
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Batch scoring
    /// Directory scanned for `.jpg`, `.jpeg` and `.png` files (default: `data/images`)
    pub image_dir: PathBuf,

    /// Intermediate emotion table written by the batch runner (default: `emotion_results.csv`)
    pub emotion_table: PathBuf,

    /// Worker threads for batch scoring (default: `None` = available cores minus one)
    pub jobs: Option<usize>,

    // Emotion classification
    /// Base URL of the DeepFace-compatible service (default: `http://127.0.0.1:5005`)
    pub classifier_url: String,

    /// Per-image classification timeout (default: 60 s)
    pub classifier_timeout: Duration,

    // Market data
    /// Ticker requested from the market data provider (default: `^VIX`)
    pub vix_symbol: String,

    /// Provider period token, e.g. `7d` or `1mo` (default: `7d`)
    ///
    /// Not validated locally; the provider owns the vocabulary.
    pub vix_period: String,

    /// Timeout for one market data request (default: 10 s)
    ///
    /// Expiry is reported as "no data available".
    pub fetch_timeout: Duration,

    /// Standalone volatility table (default: `vix_data.csv`)
    pub vix_table: PathBuf,

    // Merge
    /// Final merged dataset read by the dashboard (default: `final_dataset.csv`)
    pub final_dataset: PathBuf,
}

impl PipelineConfig {
    /// Number of batch workers to use, resolving the automatic default
    pub fn worker_count(&self) -> usize {
        match self.jobs {
            Some(jobs) => jobs.max(1),
            None => {
                let n = std::thread::available_parallelism()
                    .map(|v| v.get())
                    .unwrap_or(1);
                std::cmp::max(1, n.saturating_sub(1))
            }
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("data/images"),
            emotion_table: PathBuf::from("emotion_results.csv"),
            jobs: None,
            classifier_url: "http://127.0.0.1:5005".to_string(),
            classifier_timeout: Duration::from_secs(60),
            vix_symbol: "^VIX".to_string(),
            vix_period: "7d".to_string(),
            fetch_timeout: Duration::from_secs(10),
            vix_table: PathBuf::from("vix_data.csv"),
            final_dataset: PathBuf::from("final_dataset.csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_explicit() {
        let config = PipelineConfig {
            jobs: Some(4),
            ..PipelineConfig::default()
        };
        assert_eq!(config.worker_count(), 4);
    }

    #[test]
    fn test_worker_count_never_zero() {
        let config = PipelineConfig {
            jobs: Some(0),
            ..PipelineConfig::default()
        };
        assert_eq!(config.worker_count(), 1);
        assert!(PipelineConfig::default().worker_count() >= 1);
    }
}
