use serde::{Deserialize, Serialize};

use super::{Confidence, Title};

/// A ranked suggestion for a household. `reasons` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: Title,
    pub score: f64,
    pub confidence: Confidence,
    pub reasons: Vec<String>,
}
