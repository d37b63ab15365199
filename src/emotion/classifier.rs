//! Emotion classification capability

use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// What the classifier is asked to do for one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Analysis axes to compute
    pub actions: &'static [&'static str],

    /// Fail when no face is confidently localized
    ///
    /// When `false` the classifier falls back to a best-effort region.
    pub enforce_detection: bool,
}

impl AnalysisRequest {
    /// Emotion axis only, detection enforcement disabled
    pub const EMOTION_ONLY: AnalysisRequest = AnalysisRequest {
        actions: &["emotion"],
        enforce_detection: false,
    };
}

/// Classifier answer for one detected (or estimated) face region
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceAnalysis {
    /// Raw label to probability (percent scale) mapping
    pub emotion: HashMap<String, f64>,

    /// The classifier's own dominant label
    #[serde(default)]
    pub dominant_emotion: String,
}

/// An emotion classification capability
///
/// Implementations return one [`FaceAnalysis`] per region they found, most
/// relevant first.
pub trait EmotionClassifier {
    /// Analyze a decoded image
    fn analyze(
        &self,
        image: &DynamicImage,
        request: &AnalysisRequest,
    ) -> Result<Vec<FaceAnalysis>, ClassifierError>;
}

impl<T: EmotionClassifier + ?Sized> EmotionClassifier for &T {
    fn analyze(
        &self,
        image: &DynamicImage,
        request: &AnalysisRequest,
    ) -> Result<Vec<FaceAnalysis>, ClassifierError> {
        (**self).analyze(image, request)
    }
}

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    img: String,
    actions: &'a [&'a str],
    enforce_detection: bool,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    results: Vec<FaceAnalysis>,
}

/// Client for a DeepFace REST service (`POST /analyze`)
#[derive(Clone)]
pub struct DeepFaceClassifier {
    endpoint: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for DeepFaceClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepFaceClassifier")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl DeepFaceClassifier {
    /// Create a client for the service at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, e.g. `http://127.0.0.1:5005`
    /// * `timeout` - Read timeout for one analysis call
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            endpoint: format!("{}/analyze", base_url.trim_end_matches('/')),
            agent,
        }
    }

    /// Full URL of the analyze endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EmotionClassifier for DeepFaceClassifier {
    fn analyze(
        &self,
        image: &DynamicImage,
        request: &AnalysisRequest,
    ) -> Result<Vec<FaceAnalysis>, ClassifierError> {
        let body = AnalyzeBody {
            img: encode_data_uri(image)?,
            actions: request.actions,
            enforce_detection: request.enforce_detection,
        };

        log::debug!("POST {} ({} bytes payload)", self.endpoint, body.img.len());
        let response = match self.agent.post(&self.endpoint).send_json(&body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let text = response.into_string().unwrap_or_default();
                return Err(ClassifierError::Http(format!("HTTP {code}: {text}")));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(ClassifierError::Http(err.to_string()));
            }
        };

        let text = response
            .into_string()
            .map_err(|e| ClassifierError::Http(e.to_string()))?;
        parse_analyze_response(&text)
    }
}

/// PNG-encode an image as a base64 data URI
fn encode_data_uri(image: &DynamicImage) -> Result<String, ClassifierError> {
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ClassifierError::Encoding(e.to_string()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    Ok(format!("data:image/png;base64,{encoded}"))
}

/// Parse the body of a DeepFace `/analyze` response
pub fn parse_analyze_response(body: &str) -> Result<Vec<FaceAnalysis>, ClassifierError> {
    serde_json::from_str::<AnalyzeResponse>(body)
        .map(|r| r.results)
        .map_err(|e| ClassifierError::Malformed(e.to_string()))
}
