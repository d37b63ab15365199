//! Emotion classification and fear scoring
//!
//! The classifier itself is an external capability behind
//! [`classifier::EmotionClassifier`]; [`scorer::EmotionScorer`] turns its raw
//! answer into an [`EmotionRecord`](crate::EmotionRecord).

pub mod classifier;
pub mod scorer;
