use crate::model::Confidence;

pub const HIGH_THRESHOLD: f32 = 0.70;
pub const MEDIUM_THRESHOLD: f32 = 0.40;

/// Maps a cosine similarity to a [`Confidence`] label.
///
/// Total over every `f32`: scores outside `[-1, 1]` bucket like any other
/// value and `NaN` falls through to `Low`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreClassifier {
    high: f32,
    medium: f32,
}

impl ScoreClassifier {
    pub fn new(high: f32, medium: f32) -> Self {
        Self {
            high,
            medium: medium.min(high),
        }
    }

    pub fn classify(&self, similarity: f32) -> Confidence {
        if similarity >= self.high {
            Confidence::High
        } else if similarity >= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl Default for ScoreClassifier {
    fn default() -> Self {
        Self::new(HIGH_THRESHOLD, MEDIUM_THRESHOLD)
    }
}

pub fn classify(similarity: f32) -> Confidence {
    ScoreClassifier::default().classify(similarity)
}
