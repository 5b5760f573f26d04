use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::AppError;

/// Represents a movie or series that a household can watch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Title {
    /// Unique identifier for the title
    pub id: Uuid,
    /// Identifier from the content source the title was imported from
    pub external_id: String,
    /// Display name of the movie or series
    pub name: String,
    /// Type of content (movie or series)
    pub title_type: TitleType,
}

/// Type of content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TitleType {
    Movie,
    Series,
}

impl TitleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleType::Movie => "movie",
            TitleType::Series => "series",
        }
    }
}

impl Display for TitleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TitleType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(TitleType::Movie),
            "series" => Ok(TitleType::Series),
            other => Err(AppError::InvalidInput(format!(
                "unknown title type: {}",
                other
            ))),
        }
    }
}

impl Title {
    /// Creates a new title
    pub fn new(external_id: impl Into<String>, name: impl Into<String>, title_type: TitleType) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            name: name.into(),
            title_type,
        }
    }

    pub fn is_series(&self) -> bool {
        self.title_type == TitleType::Series
    }
}
