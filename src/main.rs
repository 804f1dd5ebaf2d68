use anyhow::Result;
use grid_batch::{bridge, config, orchestrator, provider, runner, selection, store, telemetry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use bridge::{IdentifierBridge, SubstationBackend};
use config::Config;
use orchestrator::{BatchOrchestrator, Concurrency};
use provider::{HttpInterfaceProvider, InterfaceProvider};
use runner::TargetRunner;
use selection::TargetSelector;
use store::{FileTargetStore, TargetStore};
use telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let scenario = cfg.batch.scenario()?;
    let schema = cfg.schema_version();
    info!(%scenario, %schema, choice_mode = %cfg.batch.choice_mode, "starting grid batch");

    let store = Arc::new(FileTargetStore::new(&cfg.batch.grid_dir));
    let backend = substation_backend(&cfg, store.as_ref()).await?;
    let bridge = Arc::new(IdentifierBridge::resolve(backend.as_ref(), schema));

    let interface: Arc<dyn InterfaceProvider> = match &cfg.interface {
        Some(interface) => {
            info!(base_url = %interface.base_url, "using HTTP interface provider");
            Arc::new(HttpInterfaceProvider::new(
                interface.base_url.clone(),
                Duration::from_secs(interface.http_timeout_seconds),
            )?)
        }
        None => simulated_interface()?,
    };

    let (engine, clustering) = analysis_collaborators()?;
    let runner = TargetRunner::new(bridge, interface, engine, store.clone(), scenario)
        .with_retry(cfg.batch.retry)
        .with_timeout(cfg.batch.target_timeout())
        .with_analysis_slots(cfg.batch.workers);
    let orchestrator = BatchOrchestrator::new(TargetSelector::new(clustering), Arc::new(runner))
        .with_concurrency(Concurrency::from_workers(cfg.batch.workers));

    tokio::select! {
        result = orchestrator.execute_with_config(&cfg.batch, store.as_ref()) => {
            let result = result?;
            let summary = result.summary();
            for failure in result.failures() {
                warn!(mv_grid = %failure.target_id, class = %failure.class, "{}", failure);
            }
            info!(
                batch_id = %result.batch_id,
                total = summary.total,
                succeeded = summary.succeeded,
                failed = summary.failed,
                failures_by_class = ?summary.failures_by_class,
                "batch summary"
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ = telemetry::shutdown_signal() => {
            error!("batch interrupted, no results written");
        }
    }

    Ok(())
}

#[cfg(feature = "db")]
async fn substation_backend(
    cfg: &Config,
    store: &dyn TargetStore,
) -> Result<Arc<dyn SubstationBackend>> {
    match &cfg.db {
        Some(db) => Ok(Arc::new(bridge::pg::PgSubstations::connect(&db.url).await?)),
        None => simulated_substations(cfg, store).await,
    }
}

#[cfg(not(feature = "db"))]
async fn substation_backend(
    cfg: &Config,
    store: &dyn TargetStore,
) -> Result<Arc<dyn SubstationBackend>> {
    if cfg.db.is_some() {
        warn!("database configured but the `db` feature is disabled");
    }
    simulated_substations(cfg, store).await
}

/// One substation per stored grid, bus id derived from the grid id
#[cfg(feature = "sim")]
async fn simulated_substations(
    cfg: &Config,
    store: &dyn TargetStore,
) -> Result<Arc<dyn SubstationBackend>> {
    let rows: Vec<_> = store
        .discover()
        .await?
        .into_iter()
        .map(|id| (id, grid_batch::domain::ExternalId(100_000 + u64::from(id.0))))
        .collect();
    let mut backend = bridge::InMemorySubstations::new().with_legacy(rows.clone());
    if let Some(version) = &cfg.global.grid_version {
        backend = backend.with_versioned(version.clone(), rows);
    }
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "sim"))]
async fn simulated_substations(
    _cfg: &Config,
    _store: &dyn TargetStore,
) -> Result<Arc<dyn SubstationBackend>> {
    anyhow::bail!("no substation database configured; set db.url or enable the `sim` feature")
}

#[cfg(feature = "sim")]
fn simulated_interface() -> Result<Arc<dyn InterfaceProvider>> {
    info!("using simulated interface provider");
    Ok(Arc::new(grid_batch::simulation::SimulatedInterfaceProvider::default()))
}

#[cfg(not(feature = "sim"))]
fn simulated_interface() -> Result<Arc<dyn InterfaceProvider>> {
    anyhow::bail!("no interface provider configured; set interface.base_url or enable the `sim` feature")
}

type AnalysisCollaborators = (
    Arc<dyn grid_batch::analysis::AnalysisEngine>,
    Option<Arc<dyn selection::ClusteringService>>,
);

#[cfg(feature = "sim")]
fn analysis_collaborators() -> Result<AnalysisCollaborators> {
    use grid_batch::simulation::{AttributeClustering, SimulatedAnalysisEngine};
    warn!("running with the simulated analysis engine");
    let engine: Arc<dyn grid_batch::analysis::AnalysisEngine> = Arc::new(SimulatedAnalysisEngine::new());
    let clustering: Arc<dyn selection::ClusteringService> = Arc::new(AttributeClustering::new());
    Ok((engine, Some(clustering)))
}

#[cfg(not(feature = "sim"))]
fn analysis_collaborators() -> Result<AnalysisCollaborators> {
    anyhow::bail!("no analysis engine is linked into this build; enable the `sim` feature")
}
