//! Escalation (article report) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a report description
pub const MAX_ESCALATION_DESCRIPTION: usize = 128;

/// Why an article was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationReason {
    Plagiarism,
    #[serde(rename = "Rule Violation")]
    RuleViolation,
    Spam,
}

impl EscalationReason {
    pub const ALL: [EscalationReason; 3] = [
        EscalationReason::Plagiarism,
        EscalationReason::RuleViolation,
        EscalationReason::Spam,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EscalationReason::Plagiarism => "Plagiarism",
            EscalationReason::RuleViolation => "Rule Violation",
            EscalationReason::Spam => "Spam",
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscalationReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid escalation reason: {}", s))
    }
}

/// A user's report against an article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    pub id: i64,
    pub reporter_id: i64,
    pub article_id: i64,
    pub reason: EscalationReason,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// An escalation as listed to admins
#[derive(Debug, Clone, Serialize)]
pub struct EscalationReport {
    pub id: i64,
    pub reason: EscalationReason,
    pub description: String,
    /// Username of the reporter
    pub reporter: String,
    pub article: ReportedArticle,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportedArticle {
    pub slug: String,
    pub title: String,
}
