//! Emotion scoring result types

use std::collections::HashMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Emotion label in the classifier's closed vocabulary
///
/// Declaration order is the column order of the emotion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    /// Anger
    Angry,
    /// Disgust
    Disgust,
    /// Fear
    Fear,
    /// Happiness
    Happy,
    /// Sadness
    Sad,
    /// Surprise
    Surprise,
    /// No marked expression
    Neutral,
}

impl Emotion {
    /// Size of the vocabulary
    pub const COUNT: usize = 7;

    /// Every label, in column order
    pub const ALL: [Emotion; Emotion::COUNT] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Labels summed into the fear score
    pub const FEAR_COMPONENTS: [Emotion; 4] = [
        Emotion::Fear,
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    /// Lowercase label as used by the classifier and in table headers
    ///
    /// # Example
    ///
    /// ```
    /// use visual_fear_index::Emotion;
    ///
    /// assert_eq!(Emotion::Surprise.name(), "surprise");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Parse a label, ignoring case and surrounding whitespace
    ///
    /// Returns `None` for labels outside the vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Probability (percent scale) for every label of the vocabulary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionProbabilities {
    values: [f64; Emotion::COUNT],
}

impl EmotionProbabilities {
    /// Build from values given in [`Emotion::ALL`] order
    pub fn new(values: [f64; Emotion::COUNT]) -> Self {
        Self { values }
    }

    /// Build from a classifier's raw label map
    ///
    /// Every vocabulary label must be present with a finite, non-negative value,
    /// and no label outside the vocabulary may appear.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the first problem found.
    pub fn from_labels(raw: &HashMap<String, f64>) -> Result<Self, String> {
        let mut values = [f64::NAN; Emotion::COUNT];
        for (label, &value) in raw {
            let emotion = Emotion::from_name(label)
                .ok_or_else(|| format!("unknown emotion label '{}'", label))?;
            if !value.is_finite() || value < 0.0 {
                return Err(format!("invalid probability {} for '{}'", value, emotion));
            }
            values[emotion.index()] = value;
        }
        if let Some(missing) = Emotion::ALL.iter().find(|e| values[e.index()].is_nan()) {
            return Err(format!("classifier omitted emotion '{}'", missing));
        }
        Ok(Self { values })
    }

    /// Probability of one label
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.values[emotion.index()]
    }

    /// `(label, probability)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.get(e)))
    }

    /// Copy with every probability rounded to two decimals
    pub fn rounded(&self) -> Self {
        Self {
            values: self.values.map(round2),
        }
    }

    /// Highest-probability label; ties go to the label listed first
    pub fn dominant(&self) -> Emotion {
        let mut best = Emotion::ALL[0];
        for (emotion, value) in self.iter().skip(1) {
            if value > self.get(best) {
                best = emotion;
            }
        }
        best
    }

    /// Sum of the fear components, rounded to two decimals
    pub fn fear_score(&self) -> f64 {
        round2(
            Emotion::FEAR_COMPONENTS
                .iter()
                .map(|&e| self.get(e))
                .sum::<f64>(),
        )
    }
}

impl Serialize for EmotionProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Emotion::COUNT))?;
        for (emotion, value) in self.iter() {
            map.serialize_entry(emotion.name(), &value)?;
        }
        map.end()
    }
}

/// One successfully scored image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionRecord {
    /// Image file name
    pub image: String,

    /// Label with the highest probability in `emotions`
    pub dominant_emotion: Emotion,

    /// Sum of fear, angry, sad and surprise in `emotions`
    ///
    /// Summed after rounding the components, so it matches the stored columns
    /// exactly but can differ from the rounded raw sum by up to 0.02.
    pub fear_score: f64,

    /// Per-label probabilities, rounded to two decimals
    pub emotions: EmotionProbabilities,
}

impl EmotionRecord {
    /// Derive a record from raw classifier probabilities
    ///
    /// Probabilities are rounded first; the dominant label and the fear score
    /// are then computed from the rounded values so that both can be
    /// reproduced exactly from the persisted table.
    ///
    /// # Example
    ///
    /// ```
    /// use visual_fear_index::{Emotion, EmotionProbabilities, EmotionRecord};
    ///
    /// let probs = EmotionProbabilities::new([10.0, 0.0, 20.004, 30.0, 5.0, 5.0, 29.996]);
    /// let record = EmotionRecord::from_probabilities("a.jpg", probs);
    ///
    /// assert_eq!(record.fear_score, 40.0);
    /// assert_eq!(record.dominant_emotion, Emotion::Happy);
    /// ```
    pub fn from_probabilities(image: impl Into<String>, probabilities: EmotionProbabilities) -> Self {
        let emotions = probabilities.rounded();
        Self {
            image: image.into(),
            dominant_emotion: emotions.dominant(),
            fear_score: emotions.fear_score(),
            emotions,
        }
    }
}
