//! Per-image fear scoring

use std::path::Path;

use image::DynamicImage;

use super::classifier::{AnalysisRequest, EmotionClassifier};
use crate::analysis::result::{EmotionProbabilities, EmotionRecord};
use crate::error::{ImageFailure, ScoreFailure};
use crate::io::decoder::{decode_image, image_id};

/// Scores single images through an emotion classifier
#[derive(Debug, Clone)]
pub struct EmotionScorer<C> {
    classifier: C,
}

impl<C: EmotionClassifier> EmotionScorer<C> {
    /// Wrap a classifier
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// The wrapped classifier
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Score one decoded image
    ///
    /// Only the emotion axis is requested and face-detection enforcement is
    /// disabled, so images without a confidently located face still get a
    /// best-effort score. The first region returned by the classifier is used.
    ///
    /// # Arguments
    ///
    /// * `image_id` - Identifier stored in the record (the file name)
    /// * `image` - Decoded raster, must be non-empty
    ///
    /// # Returns
    ///
    /// The derived [`EmotionRecord`]; any classifier problem becomes a
    /// [`ScoreFailure`] carrying `image_id`
    pub fn score(&self, image_id: &str, image: &DynamicImage) -> Result<EmotionRecord, ScoreFailure> {
        let failure = |message: String| ScoreFailure {
            image: image_id.to_string(),
            message,
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(failure("image has no pixels".to_string()));
        }

        let faces = self
            .classifier
            .analyze(image, &AnalysisRequest::EMOTION_ONLY)
            .map_err(|e| failure(e.to_string()))?;
        let face = faces
            .first()
            .ok_or_else(|| failure("classifier returned no analysis".to_string()))?;

        let probabilities = EmotionProbabilities::from_labels(&face.emotion).map_err(failure)?;
        let record = EmotionRecord::from_probabilities(image_id, probabilities);

        if !face.dominant_emotion.is_empty()
            && !face.dominant_emotion.eq_ignore_ascii_case(record.dominant_emotion.name())
        {
            log::debug!(
                "{}: classifier reported '{}' as dominant, recomputed '{}'",
                image_id,
                face.dominant_emotion,
                record.dominant_emotion
            );
        }

        log::debug!(
            "{}: dominant={} fear_score={:.2}",
            image_id,
            record.dominant_emotion,
            record.fear_score
        );
        Ok(record)
    }

    /// Decode an image file and score it
    pub fn score_file(&self, path: &Path) -> Result<EmotionRecord, ImageFailure> {
        let image = decode_image(path)?;
        Ok(self.score(&image_id(path), &image)?)
    }
}
