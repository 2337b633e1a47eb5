//! Highlight model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Article field a highlight points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightField {
    Title,
    Description,
    Body,
}

impl fmt::Display for HighlightField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighlightField::Title => write!(f, "title"),
            HighlightField::Description => write!(f, "description"),
            HighlightField::Body => write!(f, "body"),
        }
    }
}

impl FromStr for HighlightField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(HighlightField::Title),
            "description" => Ok(HighlightField::Description),
            "body" => Ok(HighlightField::Body),
            _ => Err(anyhow::anyhow!("Invalid highlight field: {}", s)),
        }
    }
}

/// Highlighted span of an article, inclusive on both ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub field: HighlightField,
    pub start_index: i64,
    pub end_index: i64,
    pub comment: Option<String>,
    pub highlighted_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated highlight ready to be stored
#[derive(Debug, Clone)]
pub struct NewHighlight {
    pub user_id: i64,
    pub article_id: i64,
    pub field: HighlightField,
    pub start_index: i64,
    pub end_index: i64,
    pub comment: Option<String>,
    pub highlighted_text: String,
}
