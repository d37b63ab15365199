//! Integration tests for the batch, merge and full pipeline flows

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use image::{DynamicImage, RgbImage};
use visual_fear_index::emotion::classifier::{AnalysisRequest, FaceAnalysis};
use visual_fear_index::error::ClassifierError;
use visual_fear_index::io::table::{emotion_table_header, EmotionTable};
use visual_fear_index::market::provider::ProviderFrame;
use visual_fear_index::market::MarketDataFetcher;
use visual_fear_index::{
    run_pipeline, BatchRunner, Emotion, EmotionClassifier, MarketDataError, MarketDataProvider,
    MergeError, Merger, PipelineConfig, PipelineError, TableError,
};

/// Fear follows the image width; every other emotion gets a flat share.
struct WidthClassifier;

impl EmotionClassifier for WidthClassifier {
    fn analyze(
        &self,
        image: &DynamicImage,
        _request: &AnalysisRequest,
    ) -> Result<Vec<FaceAnalysis>, ClassifierError> {
        let fear = image.width() as f64 + 0.123;
        let emotion = Emotion::ALL
            .iter()
            .map(|e| {
                let v = if *e == Emotion::Fear { fear } else { 2.345 };
                (e.name().to_string(), v)
            })
            .collect();
        Ok(vec![FaceAnalysis {
            emotion,
            dominant_emotion: "fear".to_string(),
        }])
    }
}

/// Closes for two trading days, the last one being `latest`.
struct FixedVix {
    latest: f64,
}

impl MarketDataProvider for FixedVix {
    fn download(&self, _symbol: &str, _period: &str) -> Result<ProviderFrame, MarketDataError> {
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap().timestamp();
        let t2 = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap().timestamp();
        Ok(ProviderFrame {
            timestamps: vec![t1, t2],
            utc_offset_seconds: -18_000,
            closes: vec![Some(20.0), Some(self.latest)],
        })
    }
}

struct Offline;

impl MarketDataProvider for Offline {
    fn download(&self, _symbol: &str, _period: &str) -> Result<ProviderFrame, MarketDataError> {
        Err(MarketDataError::Http("connection refused".into()))
    }
}

fn merger<P: MarketDataProvider>(provider: P) -> Merger<P> {
    Merger::new(MarketDataFetcher::new(provider, "^VIX"))
}

fn png(dir: &Path, name: &str, width: u32) {
    RgbImage::new(width, 4).save(dir.join(name)).unwrap();
}

fn image_dir(root: &Path) -> PathBuf {
    let dir = root.join("images");
    fs::create_dir_all(&dir).unwrap();
    png(&dir, "a.png", 30);
    png(&dir, "b.png", 10);
    png(&dir, "c.png", 55);
    fs::write(dir.join("broken.jpg"), b"\xff\xd8 truncated").unwrap();
    fs::write(dir.join("readme.txt"), b"not an image").unwrap();
    dir
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(|c| c.to_string()).collect())
        .collect()
}

#[test]
fn test_batch_writes_one_row_per_valid_image() {
    let root = tempfile::tempdir().unwrap();
    let images = image_dir(root.path());
    let table_path = root.path().join("emotion_results.csv");

    let outcome = BatchRunner::new(WidthClassifier)
        .run_and_save(&images, &table_path)
        .unwrap();

    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].image(), "broken.jpg");

    let rows = read_csv(&table_path);
    assert_eq!(rows[0], emotion_table_header());
    assert_eq!(rows.len(), 4);

    let mut images: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
    images.sort();
    assert_eq!(images, vec!["a.png", "b.png", "c.png"]);
}

#[test]
fn test_fear_score_reproduces_from_table_columns() {
    let root = tempfile::tempdir().unwrap();
    let images = image_dir(root.path());
    let table_path = root.path().join("emotion_results.csv");
    BatchRunner::new(WidthClassifier)
        .run_and_save(&images, &table_path)
        .unwrap();

    let rows = read_csv(&table_path);
    let header = &rows[0];
    let col = |name: &str| header.iter().position(|h| h == name).unwrap();

    for row in &rows[1..] {
        let cell = |name: &str| row[col(name)].parse::<f64>().unwrap();
        let sum = cell("fear") + cell("angry") + cell("sad") + cell("surprise");
        assert!((cell("fear_score") - sum).abs() < 1e-9, "row {:?}", row);
        assert_eq!(row[col("dominant_emotion")], "fear");
    }
}

#[test]
fn test_empty_directory_writes_header_only_and_merges() {
    let root = tempfile::tempdir().unwrap();
    let images = root.path().join("images");
    fs::create_dir_all(&images).unwrap();
    let table_path = root.path().join("emotion_results.csv");
    let final_path = root.path().join("final_dataset.csv");

    let outcome = BatchRunner::new(WidthClassifier)
        .run_and_save(&images, &table_path)
        .unwrap();
    assert_eq!(outcome.attempted(), 0);
    assert!(EmotionTable::load(&table_path).unwrap().is_empty());

    let merged = merger(FixedVix { latest: 18.5 })
        .merge(&table_path, "7d", &final_path)
        .unwrap();
    assert!(merged.is_empty());
    assert_eq!(read_csv(&final_path).len(), 1);
}

#[test]
fn test_worked_example_gaps() {
    let root = tempfile::tempdir().unwrap();
    let table_path = root.path().join("emotion_results.csv");
    let final_path = root.path().join("final_dataset.csv");
    fs::write(&table_path, "image,fear_score\na.jpg,42.10\nb.jpg,10.00\n").unwrap();

    let when = Utc.with_ymd_and_hms(2024, 3, 4, 15, 2, 11).unwrap();
    merger(FixedVix { latest: 18.50 })
        .merge_at(&table_path, "7d", &final_path, when)
        .unwrap();

    let rows = read_csv(&final_path);
    assert_eq!(
        rows,
        vec![
            vec!["image", "fear_score", "vix_close", "fear_vix_gap", "analysis_timestamp"],
            vec!["a.jpg", "42.10", "18.5", "23.6", "2024-03-04 15:02:11 UTC"],
            vec!["b.jpg", "10.00", "18.5", "-8.5", "2024-03-04 15:02:11 UTC"],
        ]
    );
}

#[test]
fn test_missing_input_leaves_previous_dataset_untouched() {
    let root = tempfile::tempdir().unwrap();
    let final_path = root.path().join("final_dataset.csv");
    fs::write(&final_path, "previous,run\n1,2\n").unwrap();

    let err = merger(FixedVix { latest: 18.5 })
        .merge(&root.path().join("absent.csv"), "7d", &final_path)
        .unwrap_err();

    assert!(matches!(err, MergeError::Input(TableError::MissingInput { .. })));
    assert_eq!(fs::read_to_string(&final_path).unwrap(), "previous,run\n1,2\n");
}

#[test]
fn test_missing_columns_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let table_path = root.path().join("emotion_results.csv");
    let final_path = root.path().join("final_dataset.csv");
    fs::write(&table_path, "image,score\na.jpg,1.0\n").unwrap();

    let err = merger(FixedVix { latest: 18.5 })
        .merge(&table_path, "7d", &final_path)
        .unwrap_err();

    match err {
        MergeError::Input(TableError::SchemaViolation { missing, .. }) => {
            assert_eq!(missing, vec!["fear_score".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!final_path.exists());
}

#[test]
fn test_unavailable_market_data_preserves_previous_dataset() {
    let root = tempfile::tempdir().unwrap();
    let table_path = root.path().join("emotion_results.csv");
    let final_path = root.path().join("final_dataset.csv");
    fs::write(&table_path, "image,fear_score\na.jpg,42.10\n").unwrap();
    fs::write(&final_path, "old\n").unwrap();

    let err = merger(Offline)
        .merge(&table_path, "7d", &final_path)
        .unwrap_err();

    assert!(matches!(err, MergeError::MarketDataUnavailable { .. }));
    assert_eq!(fs::read_to_string(&final_path).unwrap(), "old\n");
}

#[test]
fn test_rerun_keeps_row_count_and_schema() {
    let root = tempfile::tempdir().unwrap();
    let table_path = root.path().join("emotion_results.csv");
    let final_path = root.path().join("final_dataset.csv");
    fs::write(&table_path, "image,fear_score\na.jpg,42.10\nb.jpg,10.00\n").unwrap();

    let merger = merger(FixedVix { latest: 18.5 });
    merger.merge(&table_path, "7d", &final_path).unwrap();
    let first = read_csv(&final_path);
    merger.merge(&table_path, "7d", &final_path).unwrap();
    let second = read_csv(&final_path);

    assert_eq!(first.len(), second.len());
    assert_eq!(first[0], second[0]);
}

#[test]
fn test_run_pipeline_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        image_dir: image_dir(root.path()),
        emotion_table: root.path().join("emotion_results.csv"),
        final_dataset: root.path().join("final_dataset.csv"),
        vix_table: root.path().join("vix_data.csv"),
        jobs: Some(2),
        ..PipelineConfig::default()
    };

    let report = run_pipeline(&config, WidthClassifier, FixedVix { latest: 17.256 }).unwrap();

    assert_eq!(report.batch.records.len(), 3);
    assert_eq!(report.merged.len(), 3);
    assert_eq!(report.merged.snapshot().vix_close, 17.26);
    for row in report.merged.rows() {
        let expected = ((row.fear_score - 17.26) * 100.0).round() / 100.0;
        assert!((row.fear_vix_gap - expected).abs() < 1e-9);
    }
    assert_eq!(read_csv(&config.final_dataset).len(), 4);
}

#[test]
fn test_run_pipeline_missing_image_dir() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        image_dir: root.path().join("nope"),
        emotion_table: root.path().join("emotion_results.csv"),
        final_dataset: root.path().join("final_dataset.csv"),
        ..PipelineConfig::default()
    };

    let err = run_pipeline(&config, WidthClassifier, FixedVix { latest: 18.5 }).unwrap_err();
    assert!(matches!(err, PipelineError::Batch(_)));
    assert!(!config.final_dataset.exists());
}
