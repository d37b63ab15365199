//! Example: Run the whole pipeline offline
//!
//! Usage:
//!   cargo run --example offline_pipeline -- [OUTPUT_DIR]
//!
//! Synthesizes a few images, scores them with a brightness-driven stand-in
//! classifier and merges them with a fixed VIX series, so no emotion service
//! or network access is needed.

use std::error::Error;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use image::{DynamicImage, Rgb, RgbImage};
use visual_fear_index::analysis::summary::ranked_by_fear;
use visual_fear_index::emotion::classifier::{AnalysisRequest, FaceAnalysis};
use visual_fear_index::error::ClassifierError;
use visual_fear_index::market::provider::ProviderFrame;
use visual_fear_index::{
    run_pipeline, Emotion, EmotionClassifier, FearSummary, MarketDataError, MarketDataProvider,
    PipelineConfig,
};

/// Darker images read as more fearful.
struct BrightnessClassifier;

impl EmotionClassifier for BrightnessClassifier {
    fn analyze(
        &self,
        image: &DynamicImage,
        _request: &AnalysisRequest,
    ) -> Result<Vec<FaceAnalysis>, ClassifierError> {
        let luma = image.to_luma8();
        let pixels = (luma.width() as f64 * luma.height() as f64).max(1.0);
        let mean = luma.pixels().map(|p| p.0[0] as f64).sum::<f64>() / pixels;
        let dark = (255.0 - mean) / 255.0;

        let emotion = Emotion::ALL
            .iter()
            .map(|e| {
                let value = match e {
                    Emotion::Fear => 60.0 * dark,
                    Emotion::Sad => 20.0 * dark,
                    Emotion::Happy => 60.0 * (1.0 - dark),
                    Emotion::Neutral => 20.0 * (1.0 - dark),
                    _ => 5.0,
                };
                (e.name().to_string(), value)
            })
            .collect();

        Ok(vec![FaceAnalysis {
            emotion,
            dominant_emotion: String::new(),
        }])
    }
}

/// Three trading days ending at 18.50.
struct FixedVix;

impl MarketDataProvider for FixedVix {
    fn download(&self, _symbol: &str, _period: &str) -> Result<ProviderFrame, MarketDataError> {
        let day = |d: u32| {
            Utc.with_ymd_and_hms(2024, 3, d, 14, 30, 0)
                .single()
                .map(|t| t.timestamp())
                .ok_or_else(|| MarketDataError::Malformed("bad fixture date".into()))
        };
        Ok(ProviderFrame {
            timestamps: vec![day(1)?, day(4)?, day(5)?],
            utc_offset_seconds: -18_000,
            closes: vec![Some(19.26), None, Some(18.5)],
        })
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let out_dir = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::temp_dir().join("visual-fear-index-demo"),
    };
    let image_dir = out_dir.join("images");
    std::fs::create_dir_all(&image_dir)?;

    for (name, shade) in [("calm.png", 230u8), ("uneasy.png", 128), ("grim.png", 20)] {
        RgbImage::from_pixel(32, 32, Rgb([shade, shade, shade])).save(image_dir.join(name))?;
    }
    std::fs::write(image_dir.join("broken.jpg"), b"not a jpeg")?;

    let config = PipelineConfig {
        image_dir,
        emotion_table: out_dir.join("emotion_results.csv"),
        vix_table: out_dir.join("vix_data.csv"),
        final_dataset: out_dir.join("final_dataset.csv"),
        ..PipelineConfig::default()
    };

    let report = run_pipeline(&config, BrightnessClassifier, FixedVix)?;

    println!(
        "Scored {} of {} images ({} skipped)",
        report.batch.records.len(),
        report.batch.attempted(),
        report.batch.failures.len()
    );
    let ranked = ranked_by_fear(
        report
            .merged
            .rows()
            .iter()
            .map(|r| (r.image.as_str(), r.fear_score)),
    );
    for (image, score) in ranked {
        println!("  {:<12} fear={:>6.2}", image, score);
    }

    let scores: Vec<f64> = report.merged.rows().iter().map(|r| r.fear_score).collect();
    if let Some(summary) = FearSummary::from_scores(&scores) {
        println!("\n{}", summary);
    }
    println!("\nCurrent VIX: {:.2}", report.merged.snapshot().vix_close);
    println!("Final dataset: {}", config.final_dataset.display());
    Ok(())
}
