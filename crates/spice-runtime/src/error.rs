use std::fmt;

use spice_manifest::{HashError, ManifestError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PodError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Canonicalization failed on a manifest that already parsed.
    #[error("internal error hashing pod manifest: {0}")]
    Hash(#[from] HashError),
    #[error(transparent)]
    InvalidField(#[from] InvalidFieldError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("pod {pod} declares no data source {group}")]
    UnknownDataSource { pod: String, group: String },
    #[error("pod {pod} data source {group}: {message}")]
    Connector {
        pod: String,
        group: String,
        message: String,
    },
    #[error("pod {pod} has no manifest path to reload from")]
    NoManifestPath { pod: String },
    #[error("pod {0} is already loaded")]
    DuplicatePod(String),
    #[error("pod {0} is not loaded")]
    UnknownPod(String),
}

/// A local observation referenced a field the pod does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{field} is an invalid field for pod {pod}. Valid fields are: [{}]",
    .valid_fields.join(" ")
)]
pub struct InvalidFieldError {
    pub field: String,
    pub pod: String,
    /// Registry fields in declaration order.
    pub valid_fields: Vec<String>,
}

/// Why a single data source contributed nothing to a fetch.
#[derive(Debug)]
pub enum FailureReason {
    Failed(anyhow::Error),
    TimedOut(std::time::Duration),
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Failed(err) => write!(f, "{err:#}"),
            FailureReason::TimedOut(after) => write!(f, "timed out after {after:?}"),
            FailureReason::Cancelled => f.write_str("cancelled by caller deadline"),
        }
    }
}

#[derive(Debug)]
pub struct SourceFailure {
    /// Data-source group prefix.
    pub source: String,
    pub reason: FailureReason,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

/// Aggregate of every source that failed during one fetch.
#[derive(Debug, Error)]
#[error("pod {pod} failed to fetch from {} data source(s): {}", .failures.len(), join_failures(.failures))]
pub struct FetchError {
    pub pod: String,
    pub failures: Vec<SourceFailure>,
}

impl FetchError {
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.source.as_str())
    }
}

fn join_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
