use serde::{Deserialize, Serialize};

/// Categorical reading of a confidence value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceLabel {
    Unknown,
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    /// Fixed thresholds: `>= 0.8` High, `>= 0.5` Medium, `> 0` Low, otherwise Unknown.
    pub fn for_value(value: f64) -> Self {
        if value >= 0.8 {
            ConfidenceLabel::High
        } else if value >= 0.5 {
            ConfidenceLabel::Medium
        } else if value > 0.0 {
            ConfidenceLabel::Low
        } else {
            ConfidenceLabel::Unknown
        }
    }
}

/// A value in `[0, 1]` together with its label. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Confidence {
    pub value: f64,
    pub label: ConfidenceLabel,
}

impl Confidence {
    pub const UNKNOWN: Confidence = Confidence {
        value: 0.0,
        label: ConfidenceLabel::Unknown,
    };

    /// Builds a confidence, clamping into `[0, 1]`. Non-finite input reads as zero.
    pub fn new(value: f64) -> Self {
        let value = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            value,
            label: ConfidenceLabel::for_value(value),
        }
    }

    /// Confidence as a whole percentage (0-100)
    pub fn percent(&self) -> u8 {
        (self.value * 100.0).round() as u8
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_thresholds() {
        assert_eq!(ConfidenceLabel::for_value(1.0), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::for_value(0.8), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::for_value(0.79), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::for_value(0.5), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::for_value(0.49), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::for_value(0.0001), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::for_value(0.0), ConfidenceLabel::Unknown);
    }

    #[test]
    fn test_new_clamps_out_of_range() {
        assert_eq!(Confidence::new(1.7).value, 1.0);
        assert_eq!(Confidence::new(-0.2), Confidence::UNKNOWN);
        assert_eq!(Confidence::new(f64::NAN), Confidence::UNKNOWN);
    }

    #[test]
    fn test_percent() {
        assert_eq!(Confidence::new(0.9).percent(), 90);
        assert_eq!(Confidence::UNKNOWN.percent(), 0);
    }

    #[test]
    fn test_label_serializes_by_name() {
        let json = serde_json::to_value(Confidence::new(0.9)).unwrap();
        assert_eq!(json["label"], "High");
    }
}
