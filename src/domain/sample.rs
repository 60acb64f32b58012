// ============================================================
// Layer 3 — Sample Types
// ============================================================
// A Sample is one (input, target) pair. Input and target shapes
// vary between model families but are fixed within one run, and
// a sample is never mutated once it has been loaded.

use serde::{Deserialize, Serialize};

/// The two classes of the synthetic shape dataset.
/// The discriminant is the label written to the CSV manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle = 0,
    Square = 1,
}

impl ShapeKind {
    pub fn label(self) -> usize {
        self as usize
    }

    pub fn from_label(label: usize) -> Option<Self> {
        match label {
            0 => Some(ShapeKind::Circle),
            1 => Some(ShapeKind::Square),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Square => "square",
        }
    }
}

/// One preprocessed grayscale image and its class.
///
/// `pixels` is row-major `[height * width]` in `[0, 1]`,
/// i.e. the single channel of a `[1, H, W]` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    pub pixels: Vec<f32>,
    pub height: usize,
    pub width:  usize,
    pub label:  ShapeKind,
}

/// A window of a 1-D series and the values that follow it.
///
/// Forecasters regress `target` directly; the WaveNet generator
/// classifies the quantised `target[0]`; the audio transformer
/// quantises `input` and regresses `target[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSample {
    pub input:  Vec<f32>,
    pub target: Vec<f32>,
}

impl SeriesSample {
    pub fn new(input: Vec<f32>, target: Vec<f32>) -> Self {
        Self { input, target }
    }
}

/// A tokenised translation pair.
/// Both sides already carry their `[START]` and `[END]` ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub source: Vec<u32>,
    pub target: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_labels_round_trip() {
        assert_eq!(ShapeKind::Circle.label(), 0);
        assert_eq!(ShapeKind::Square.label(), 1);
        assert_eq!(ShapeKind::from_label(1), Some(ShapeKind::Square));
        assert_eq!(ShapeKind::from_label(2), None);
    }
}
