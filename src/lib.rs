//! # Visual Fear Index
//!
//! Scores the emotional content of a batch of images and sets it against the
//! market's own fear gauge, the VIX volatility index.
//!
//! ## Features
//!
//! - **Emotion scoring**: per-image emotion probabilities from an external
//!   classifier, reduced to a fear score (fear + angry + sad + surprise)
//! - **Batch runner**: scans a directory, isolates per-image failures, runs in
//!   parallel, writes `emotion_results.csv`
//! - **Market data**: daily VIX closes normalized to `(date, vix_close)`
//! - **Merge**: broadcasts the latest VIX close onto every image row with a
//!   fear/VIX gap and a UTC timestamp, written to `final_dataset.csv`
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use visual_fear_index::emotion::classifier::DeepFaceClassifier;
//! use visual_fear_index::market::provider::YahooChartProvider;
//! use visual_fear_index::{run_pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let classifier = DeepFaceClassifier::new(&config.classifier_url, config.classifier_timeout);
//! let provider = YahooChartProvider::new(config.fetch_timeout);
//!
//! let report = run_pipeline(&config, classifier, provider)?;
//! println!("Scored {} images, VIX={:.2}", report.batch.records.len(), report.merged.snapshot().vix_close);
//! # Ok::<(), visual_fear_index::PipelineError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Image directory → Batch Runner → emotion_results.csv → Merger (+ VIX fetch) → final_dataset.csv
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod emotion;
pub mod error;
pub mod io;
pub mod market;
pub mod merge;

// Re-export main types
pub use analysis::batch::{BatchOutcome, BatchRunner};
pub use analysis::result::{Emotion, EmotionProbabilities, EmotionRecord};
pub use analysis::summary::FearSummary;
pub use config::PipelineConfig;
pub use emotion::classifier::EmotionClassifier;
pub use emotion::scorer::EmotionScorer;
pub use error::{
    BatchError, DecodeFailure, ImageFailure, MarketDataError, MergeError, PipelineError,
    ScoreFailure, TableError,
};
pub use market::provider::MarketDataProvider;
pub use market::series::{VolatilityPoint, VolatilitySeries};
pub use market::MarketDataFetcher;
pub use merge::{MergedDataset, Merger};

/// Outcome of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Batch scoring outcome
    pub batch: BatchOutcome,

    /// Final merged dataset
    pub merged: MergedDataset,
}

/// Run batch scoring then the merge, as configured
///
/// Writes `config.emotion_table` and then `config.final_dataset`. If the merge
/// fails, the emotion table of this run is kept and the previous final dataset
/// is left untouched.
///
/// # Arguments
///
/// * `config` - Paths, period, symbol and worker count
/// * `classifier` - Emotion classification capability
/// * `provider` - Market data capability
///
/// # Errors
///
/// Returns `PipelineError` if the image directory cannot be read, an artifact
/// cannot be written, or the merge aborts.
pub fn run_pipeline<C, P>(
    config: &PipelineConfig,
    classifier: C,
    provider: P,
) -> Result<PipelineReport, PipelineError>
where
    C: EmotionClassifier + Sync,
    P: MarketDataProvider,
{
    let runner = BatchRunner::new(classifier).with_jobs(config.worker_count());
    let batch = runner.run_and_save(&config.image_dir, &config.emotion_table)?;

    if batch.records.is_empty() {
        log::warn!("No images were scored; merging an empty emotion table");
    }

    let merger = Merger::new(MarketDataFetcher::new(provider, config.vix_symbol.clone()));
    let merged = merger.merge(&config.emotion_table, &config.vix_period, &config.final_dataset)?;

    Ok(PipelineReport { batch, merged })
}
