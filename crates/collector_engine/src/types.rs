use std::fmt;

use chrono::{DateTime, Utc};
use collector_core::{JobRecord, PassSummary};
use serde::Serialize;

/// One line of a job's result payload with its routing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEvent {
    /// Group name.
    pub index: String,
    /// Job name.
    pub host: String,
    pub data: String,
    /// Scheme-less job URL.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    /// The listing body was not the expected JSON document.
    InvalidBody,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::InvalidBody => write!(f, "invalid response body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every listed job was handled and the checkpoint pruned.
    Completed,
    /// The listing was empty; nothing was touched.
    EmptyListing,
    /// The listing call failed; the checkpoint was not touched.
    ListingFailed(FetchError),
    /// Cancellation stopped the pass at a job boundary before the prune step.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub group: String,
    pub outcome: PassOutcome,
    pub summary: PassSummary,
    pub jobs: Vec<JobRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
