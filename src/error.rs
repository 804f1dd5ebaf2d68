use std::time::Duration;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::bridge::IdentifierError;
use crate::domain::{ErrorClass, FailureSummary, TargetId};
use crate::provider::ProviderError;
use crate::selection::ClusteringError;
use crate::store::StoreError;

/// Errors that abort a batch before any grid runs
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown choice mode '{0}', expected one of: cluster, manual, all")]
    UnknownChoiceMode(String),

    #[error("choice mode '{mode}' requires '{parameter}' to be set")]
    MissingParameter {
        mode: &'static str,
        parameter: &'static str,
    },

    #[error("number of clusters must be positive")]
    InvalidClusterCount,

    #[error("MV grid {0} is not available")]
    UnknownTarget(TargetId),

    #[error("MV grid {0} is selected more than once")]
    DuplicateTarget(TargetId),

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("target discovery failed: {0}")]
    Discovery(#[from] StoreError),

    #[error("clustering failed: {0}")]
    Clustering(#[from] ClusteringError),

    #[error("cluster result is inconsistent: {0}")]
    InconsistentClusters(String),
}

impl From<validator::ValidationErrors> for ConfigurationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ConfigurationError::Invalid(errors.to_string())
    }
}

/// Errors raised while running the pipeline for one grid.
///
/// Never fatal to a batch: the runner turns every variant into a failure outcome.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Interface(#[from] ProviderError),

    #[error("no MV grid file for MV grid ID {0}")]
    MissingTargetData(TargetId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("pipeline timed out after {0:?}")]
    Timeout(Duration),

    #[error("pipeline panicked: {0}")]
    Panicked(String),
}

impl TargetError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TargetError::Identifier(IdentifierError::Backend(_)) => ErrorClass::Infrastructure,
            TargetError::Identifier(_) => ErrorClass::DataAvailability,
            TargetError::Interface(ProviderError::Unavailable(_)) => ErrorClass::Infrastructure,
            TargetError::Interface(_) => ErrorClass::DataAvailability,
            TargetError::MissingTargetData(_) => ErrorClass::DataAvailability,
            TargetError::Store(_) => ErrorClass::Infrastructure,
            TargetError::Analysis(AnalysisError::InvalidNetwork(_)) => ErrorClass::DataAvailability,
            TargetError::Analysis(_) => ErrorClass::Analysis,
            TargetError::Timeout(_) => ErrorClass::Timeout,
            TargetError::Panicked(_) => ErrorClass::Panic,
        }
    }

    /// Only infrastructure errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Infrastructure
    }

    /// Failure record with the full cause chain
    pub fn summarize(&self, target_id: TargetId) -> FailureSummary {
        let mut cause = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            cause.push_str(": ");
            cause.push_str(&err.to_string());
            source = err.source();
        }
        FailureSummary {
            target_id,
            class: self.class(),
            cause,
        }
    }
}
