//! Selection of the MV grids a batch runs.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::domain::{SelectionPolicy, TargetDescriptor, TargetId};
use crate::error::ConfigurationError;

#[derive(Debug, Error)]
pub enum ClusteringError {
    #[error("cluster attributes are missing")]
    AttributesMissing,

    #[error("attribute analysis failed: {0}")]
    AttributeAnalysis(String),

    #[error("{0}")]
    Failed(String),
}

/// One cluster: its representative grid and the number of grids it stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterGroup {
    pub representative: TargetId,
    pub member_count: u32,
}

/// External clustering of grids by their attributes
/// (installed wind and solar capacity, distance to the farthest node)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusteringService: Send + Sync {
    /// Whether the attribute table has been computed
    async fn attributes_available(&self) -> bool;

    /// Compute the attribute table for the given grids
    async fn analyze_attributes(&self, targets: &[TargetId]) -> Result<(), ClusteringError>;

    async fn cluster(
        &self,
        targets: &[TargetId],
        count: usize,
    ) -> Result<Vec<ClusterGroup>, ClusteringError>;
}

pub struct TargetSelector {
    clustering: Option<Arc<dyn ClusteringService>>,
}

impl TargetSelector {
    pub fn new(clustering: Option<Arc<dyn ClusteringService>>) -> Self {
        Self { clustering }
    }

    /// Selector without clustering support; `Cluster` policies fail
    pub fn without_clustering() -> Self {
        Self { clustering: None }
    }

    /// Resolve `policy` into the ordered list of grids to run.
    ///
    /// `available` is expected in ascending id order. A grid listed twice in
    /// `available` is rejected for every policy.
    pub async fn select(
        &self,
        policy: &SelectionPolicy,
        available: &[TargetId],
    ) -> Result<Vec<TargetDescriptor>, ConfigurationError> {
        Self::ensure_unique(available)?;
        match policy {
            SelectionPolicy::Manual { ids } => {
                let known: HashSet<TargetId> = available.iter().copied().collect();
                let mut seen = HashSet::with_capacity(ids.len());
                for id in ids {
                    if !known.contains(id) {
                        return Err(ConfigurationError::UnknownTarget(*id));
                    }
                    if !seen.insert(*id) {
                        return Err(ConfigurationError::DuplicateTarget(*id));
                    }
                }
                info!(grids = ?ids, "calculating manually chosen MV grids");
                Ok(ids.iter().copied().map(TargetDescriptor::single).collect())
            }
            SelectionPolicy::All => {
                info!(count = available.len(), "calculating all available MV grids");
                Ok(available.iter().copied().map(TargetDescriptor::single).collect())
            }
            SelectionPolicy::Cluster { count } => self.select_clustered(*count, available).await,
        }
    }

    async fn select_clustered(
        &self,
        count: usize,
        available: &[TargetId],
    ) -> Result<Vec<TargetDescriptor>, ConfigurationError> {
        if count == 0 {
            return Err(ConfigurationError::InvalidClusterCount);
        }
        let clustering = self.clustering.as_ref().ok_or(ConfigurationError::MissingParameter {
            mode: "cluster",
            parameter: "clustering service",
        })?;
        if available.is_empty() {
            return Ok(Vec::new());
        }

        let count = count.min(available.len());
        if !clustering.attributes_available().await {
            info!("cluster attributes are missing, calculating them");
            clustering.analyze_attributes(available).await?;
        }

        info!(count, "clustering to MV grids");
        let groups = clustering.cluster(available, count).await?;
        Self::check_groups(&groups, available)?;

        Ok(groups
            .into_iter()
            .map(|g| TargetDescriptor::new(g.representative, g.member_count))
            .collect())
    }

    fn ensure_unique(available: &[TargetId]) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::with_capacity(available.len());
        match available.iter().find(|id| !seen.insert(**id)) {
            Some(id) => Err(ConfigurationError::DuplicateTarget(*id)),
            None => Ok(()),
        }
    }

    /// Representatives must be available and unique, and the groups must cover every grid
    fn check_groups(groups: &[ClusterGroup], available: &[TargetId]) -> Result<(), ConfigurationError> {
        let known: HashSet<TargetId> = available.iter().copied().collect();
        let mut seen = HashSet::with_capacity(groups.len());
        for group in groups {
            if !known.contains(&group.representative) {
                return Err(ConfigurationError::InconsistentClusters(format!(
                    "representative {} is not an available MV grid",
                    group.representative
                )));
            }
            if !seen.insert(group.representative) {
                return Err(ConfigurationError::InconsistentClusters(format!(
                    "representative {} appears in more than one cluster",
                    group.representative
                )));
            }
            if group.member_count == 0 {
                return Err(ConfigurationError::InconsistentClusters(format!(
                    "cluster of {} is empty",
                    group.representative
                )));
            }
        }

        let covered: u64 = groups.iter().map(|g| u64::from(g.member_count)).sum();
        if covered != available.len() as u64 {
            return Err(ConfigurationError::InconsistentClusters(format!(
                "clusters cover {} MV grids, {} are available",
                covered,
                available.len()
            )));
        }
        Ok(())
    }
}
