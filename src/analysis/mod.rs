//! Emotion analysis and result aggregation modules
//!
//! - Result types (emotion vocabulary, per-image records)
//! - Batch scoring over a directory of images
//! - Fear score summaries

pub mod batch;
pub mod result;
pub mod summary;
