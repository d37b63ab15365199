//! CSV artifacts: the intermediate emotion table and table writing helpers
//!
//! Every artifact is written to a temporary file next to its destination and
//! renamed into place, so a failed write never leaves a truncated table behind.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::analysis::result::{Emotion, EmotionRecord};
use crate::error::TableError;

/// Leading columns of the emotion table, followed by one column per emotion
pub const EMOTION_TABLE_LEADING_COLUMNS: [&str; 3] = ["image", "dominant_emotion", "fear_score"];

/// Columns the merger needs in an emotion table, sorted by name
pub const REQUIRED_COLUMNS: [&str; 2] = ["fear_score", "image"];

/// Format a float the way it is stored in artifacts
///
/// Integral values keep a trailing `.0` and negative zero is normalized.
pub fn format_float(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:?}", value)
}

/// Write a header and rows to `path`, replacing any existing file
pub fn write_table<H, R, F>(path: &Path, header: H, rows: impl IntoIterator<Item = R>) -> Result<(), TableError>
where
    H: IntoIterator<Item = F>,
    R: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| TableError::Io(e.error))?;
    Ok(())
}

/// Column names of the emotion table
pub fn emotion_table_header() -> Vec<String> {
    EMOTION_TABLE_LEADING_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(Emotion::ALL.iter().map(|e| e.name().to_string()))
        .collect()
}

fn emotion_record_row(record: &EmotionRecord) -> Vec<String> {
    let mut row = Vec::with_capacity(EMOTION_TABLE_LEADING_COLUMNS.len() + Emotion::COUNT);
    row.push(record.image.clone());
    row.push(record.dominant_emotion.name().to_string());
    row.push(format_float(record.fear_score));
    row.extend(record.emotions.iter().map(|(_, v)| format_float(v)));
    row
}

/// Persist scored records as the intermediate emotion table
///
/// The header is written even when `records` is empty.
pub fn write_emotion_table(path: &Path, records: &[EmotionRecord]) -> Result<(), TableError> {
    log::debug!("Writing {} emotion records to {}", records.len(), path.display());
    write_table(path, emotion_table_header(), records.iter().map(emotion_record_row))
}

/// One row of a loaded emotion table
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionRow {
    /// Image file name
    pub image: String,

    /// Parsed fear score
    pub fear_score: f64,

    /// Raw cell values, aligned with [`EmotionTable::headers`]
    pub values: Vec<String>,
}

/// An emotion table read back from disk
///
/// Only `image` and `fear_score` are interpreted; every other column is kept
/// verbatim so it can be carried into the merged dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionTable {
    headers: Vec<String>,
    rows: Vec<EmotionRow>,
}

impl EmotionTable {
    /// Build a table from already-parsed parts
    pub fn new(headers: Vec<String>, rows: Vec<EmotionRow>) -> Self {
        Self { headers, rows }
    }

    /// Load and validate an emotion table
    ///
    /// # Errors
    ///
    /// - [`TableError::MissingInput`] if the file does not exist
    /// - [`TableError::SchemaViolation`] naming every missing required column
    /// - [`TableError::InvalidRow`] if a `fear_score` cell is not a number
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TableError::MissingInput {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(TableError::Io(e)),
        };

        let mut reader = csv::Reader::from_reader(file);
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !headers.iter().any(|h| h == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TableError::SchemaViolation {
                path: path.to_path_buf(),
                missing,
            });
        }

        let position = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
        let image_idx = position("image");
        let fear_idx = position("fear_score");

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let cell = |idx: usize| record.get(idx).unwrap_or_default();
            let fear_raw = cell(fear_idx).trim();
            let fear_score = fear_raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| TableError::InvalidRow {
                    path: path.to_path_buf(),
                    row: i + 1,
                    message: format!("fear_score '{}' is not a number", fear_raw),
                })?;
            rows.push(EmotionRow {
                image: cell(image_idx).to_string(),
                fear_score,
                values: record.iter().map(|v| v.to_string()).collect(),
            });
        }

        log::info!("Loaded {} emotion records from {}", rows.len(), path.display());
        Ok(Self { headers, rows })
    }

    /// Column names in file order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Rows in file order
    pub fn rows(&self) -> &[EmotionRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fear scores in row order
    pub fn fear_scores(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.fear_score).collect()
    }

    /// Consume the table into its headers and rows
    pub fn into_parts(self) -> (Vec<String>, Vec<EmotionRow>) {
        (self.headers, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::EmotionProbabilities;

    fn record(image: &str, values: [f64; Emotion::COUNT]) -> EmotionRecord {
        EmotionRecord::from_probabilities(image, EmotionProbabilities::new(values))
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(40.0), "40.0");
        assert_eq!(format_float(42.1), "42.1");
        assert_eq!(format_float(-8.5), "-8.5");
        assert_eq!(format_float(-0.0), "0.0");
    }

    #[test]
    fn test_emotion_table_header_order() {
        assert_eq!(
            emotion_table_header(),
            vec![
                "image", "dominant_emotion", "fear_score", "angry", "disgust", "fear", "happy",
                "sad", "surprise", "neutral"
            ]
        );
    }

    #[test]
    fn test_write_then_load_emotion_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emotion_results.csv");
        let records = vec![
            record("a.jpg", [10.0, 0.0, 20.0, 30.0, 5.0, 5.0, 30.0]),
            record("b.png", [1.0, 1.0, 1.0, 90.0, 1.0, 1.0, 5.0]),
        ];
        write_emotion_table(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("image,dominant_emotion,fear_score,angry,disgust,fear,happy,sad,surprise,neutral")
        );
        assert_eq!(lines.next(), Some("a.jpg,happy,40.0,10.0,0.0,20.0,30.0,5.0,5.0,30.0"));

        let table = EmotionTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].image, "b.png");
        assert_eq!(table.rows()[1].fear_score, 4.0);
        assert_eq!(table.headers().len(), 10);
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emotion_results.csv");
        write_emotion_table(&path, &[]).unwrap();

        let table = EmotionTable::load(&path).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers().len(), 10);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmotionTable::load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, TableError::MissingInput { .. }));
    }

    #[test]
    fn test_load_reports_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "file,score\na.jpg,1.0\n").unwrap();
        match EmotionTable::load(&path).unwrap_err() {
            TableError::SchemaViolation { missing, .. } => {
                assert_eq!(missing, vec!["fear_score", "image"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        std::fs::write(&path, "image,score\na.jpg,1.0\n").unwrap();
        match EmotionTable::load(&path).unwrap_err() {
            TableError::SchemaViolation { missing, .. } => assert_eq!(missing, vec!["fear_score"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_rejects_non_numeric_fear_score() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "image,fear_score\na.jpg,12.5\nb.jpg,high\n").unwrap();
        match EmotionTable::load(&path).unwrap_err() {
            TableError::InvalidRow { row, .. } => assert_eq!(row, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_table_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "old contents\n").unwrap();
        write_table(&path, ["a", "b"], vec![vec!["1", "2"]]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");
    }
}
