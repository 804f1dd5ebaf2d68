mod pipeline;
mod selection;

use std::path::Path;
use std::sync::Arc;

use grid_batch::bridge::{IdentifierBridge, InMemorySubstations, SchemaVersion};
use grid_batch::domain::{ExternalId, Scenario, TargetId};
use grid_batch::orchestrator::{BatchOrchestrator, Concurrency};
use grid_batch::runner::{RetryPolicy, TargetRunner};
use grid_batch::selection::{ClusteringService, TargetSelector};
use grid_batch::simulation::{AttributeClustering, SimulatedAnalysisEngine, SimulatedInterfaceProvider};
use grid_batch::store::FileTargetStore;
use tempfile::TempDir;

pub fn ids(raw: &[u32]) -> Vec<TargetId> {
    raw.iter().copied().map(TargetId).collect()
}

pub fn bus_for(id: TargetId) -> ExternalId {
    ExternalId(100_000 + u64::from(id.0))
}

/// Grid directory with one definition file per id
pub fn grid_dir(stored: &[u32]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for id in stored {
        touch(dir.path(), &format!("ding0_grids__{id}.pkl"));
    }
    dir
}

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"ding0").unwrap();
}

/// Collaborators of a test batch; every mapped grid has a substation in both schemas
pub struct Fixture {
    pub grid_dir: TempDir,
    pub mapped: Vec<TargetId>,
    pub schema: SchemaVersion,
    pub engine: SimulatedAnalysisEngine,
    pub interface: SimulatedInterfaceProvider,
    pub clustering: Option<Arc<dyn ClusteringService>>,
    pub concurrency: Concurrency,
}

impl Fixture {
    pub fn new(stored: &[u32]) -> Self {
        let clustering: Arc<dyn ClusteringService> = Arc::new(AttributeClustering::new());
        Self {
            grid_dir: grid_dir(stored),
            mapped: ids(stored),
            schema: SchemaVersion::Legacy,
            engine: SimulatedAnalysisEngine::new(),
            interface: SimulatedInterfaceProvider::new(24),
            clustering: Some(clustering),
            concurrency: Concurrency::Sequential,
        }
    }

    pub fn store(&self) -> FileTargetStore {
        FileTargetStore::new(self.grid_dir.path())
    }

    pub fn orchestrator(&self) -> BatchOrchestrator {
        let rows: Vec<_> = self.mapped.iter().map(|id| (*id, bus_for(*id))).collect();
        let backend = InMemorySubstations::new()
            .with_legacy(rows.clone())
            .with_versioned("v0.4.5", rows);
        let bridge = IdentifierBridge::resolve(&backend, self.schema.clone());

        let runner = TargetRunner::new(
            Arc::new(bridge),
            Arc::new(self.interface.clone()),
            Arc::new(self.engine.clone()),
            Arc::new(self.store()),
            Scenario::Nep2035,
        )
        .with_retry(RetryPolicy::no_retry());

        BatchOrchestrator::new(TargetSelector::new(self.clustering.clone()), Arc::new(runner))
            .with_concurrency(self.concurrency)
    }
}
