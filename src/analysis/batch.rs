//! Batch scoring of an image directory
//!
//! Parallelism is across images; each image is decoded and scored by a single
//! worker. Per-image failures are recorded and never stop the batch.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::analysis::result::EmotionRecord;
use crate::emotion::classifier::EmotionClassifier;
use crate::emotion::scorer::EmotionScorer;
use crate::error::{BatchError, ImageFailure};
use crate::io::decoder::list_images;
use crate::io::table::write_emotion_table;

/// Result of one batch run, partitioned into successes and failures
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Scored images, in directory listing order
    pub records: Vec<EmotionRecord>,

    /// Images that could not be decoded or scored, in directory listing order
    pub failures: Vec<ImageFailure>,
}

impl BatchOutcome {
    /// Number of candidate images that were attempted
    pub fn attempted(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    fn from_results(results: Vec<Result<EmotionRecord, ImageFailure>>) -> Self {
        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                Ok(record) => outcome.records.push(record),
                Err(failure) => {
                    log::warn!("Skipping {}", failure);
                    outcome.failures.push(failure);
                }
            }
        }
        outcome
    }
}

/// Scores every candidate image of a directory
#[derive(Debug, Clone)]
pub struct BatchRunner<C> {
    scorer: EmotionScorer<C>,
    jobs: usize,
}

impl<C: EmotionClassifier + Sync> BatchRunner<C> {
    /// Create a single-worker runner
    pub fn new(classifier: C) -> Self {
        Self {
            scorer: EmotionScorer::new(classifier),
            jobs: 1,
        }
    }

    /// Set the number of parallel workers (at least one)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// The scorer applied to each image
    pub fn scorer(&self) -> &EmotionScorer<C> {
        &self.scorer
    }

    /// Score every `.jpg`, `.jpeg` and `.png` file of `image_dir`
    ///
    /// Records keep directory listing order regardless of the number of
    /// workers. An empty directory yields an empty outcome.
    ///
    /// # Errors
    ///
    /// Only stage-level problems are errors: an unreadable directory or a
    /// worker pool that cannot start.
    pub fn run(&self, image_dir: &Path) -> Result<BatchOutcome, BatchError> {
        let paths = list_images(image_dir).map_err(|source| BatchError::ReadDir {
            path: image_dir.to_path_buf(),
            source,
        })?;

        log::info!(
            "Processing {} images in {} (jobs={})",
            paths.len(),
            image_dir.display(),
            self.jobs
        );
        let t0 = Instant::now();

        let results: Vec<Result<EmotionRecord, ImageFailure>> = if self.jobs == 1 {
            paths.iter().map(|path| self.score_one(path)).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()
                .map_err(|e| BatchError::ThreadPool(e.to_string()))?;
            pool.install(|| paths.par_iter().map(|path| self.score_one(path)).collect())
        };

        let outcome = BatchOutcome::from_results(results);
        log::info!(
            "Processed {} images: ok={} failed={} wall={:.0}ms",
            outcome.attempted(),
            outcome.records.len(),
            outcome.failures.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(outcome)
    }

    /// Run the batch and persist the records as the intermediate emotion table
    ///
    /// The table replaces any previous run, and is written even when no image
    /// could be scored.
    pub fn run_and_save(&self, image_dir: &Path, output: &Path) -> Result<BatchOutcome, BatchError> {
        let outcome = self.run(image_dir)?;
        write_emotion_table(output, &outcome.records).map_err(|source| BatchError::Write {
            path: PathBuf::from(output),
            source,
        })?;
        log::info!(
            "Saved {} emotion records to {}",
            outcome.records.len(),
            output.display()
        );
        Ok(outcome)
    }

    fn score_one(&self, path: &Path) -> Result<EmotionRecord, ImageFailure> {
        log::debug!("Processing {}...", path.display());
        self.scorer.score_file(path)
    }
}
