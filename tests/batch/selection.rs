use proptest::prelude::*;
use std::sync::Arc;

use grid_batch::aggregate::ResultAggregator;
use grid_batch::config::BatchConfig;
use grid_batch::domain::{SelectionPolicy, TargetId};
use grid_batch::error::ConfigurationError;
use grid_batch::runner::RetryPolicy;
use grid_batch::selection::{ClusteringService, TargetSelector};
use grid_batch::simulation::AttributeClustering;

use super::{ids, Fixture};

fn batch_config(fixture: &Fixture, choice_mode: &str) -> BatchConfig {
    BatchConfig {
        choice_mode: choice_mode.to_string(),
        no_grids: Some(3),
        manual_grids: None,
        grid_dir: fixture.grid_dir.path().to_path_buf(),
        scn_name: "NEP 2035".to_string(),
        workers: 2,
        target_timeout_seconds: Some(60),
        retry: RetryPolicy::no_retry(),
    }
}

#[tokio::test]
async fn test_clustered_batch_from_config() {
    let stored: Vec<u32> = (100..120).collect();
    let fixture = Fixture::new(&stored);
    let config = batch_config(&fixture, "cluster");

    let result = fixture
        .orchestrator()
        .execute_with_config(&config, &fixture.store())
        .await
        .unwrap();

    assert!(!result.descriptors.is_empty() && result.descriptors.len() <= 3);
    let weight: u32 = result.descriptors.iter().map(|d| d.weight).sum();
    assert_eq!(weight, 20);
    assert_eq!(result.outcomes.len(), result.descriptors.len());

    let unweighted: f64 = ResultAggregator::totals_by_target(&result.aggregated_costs)
        .values()
        .sum();
    let weighted: f64 = ResultAggregator::weighted_totals(&result.descriptors, &result.aggregated_costs)
        .iter()
        .map(|(_, amount)| amount)
        .sum();
    assert!(weighted >= unweighted);
}

#[tokio::test]
async fn test_cluster_count_is_clamped_to_available() {
    let fixture = Fixture::new(&[1, 2, 3]);

    let result = fixture
        .orchestrator()
        .execute(&SelectionPolicy::Cluster { count: 10 }, &ids(&[1, 2, 3]))
        .await
        .unwrap();

    assert_eq!(result.descriptors.len(), 3);
    assert!(result.descriptors.iter().all(|d| d.weight == 1));
}

#[tokio::test]
async fn test_zero_clusters_is_rejected() {
    let fixture = Fixture::new(&[1, 2, 3]);

    let err = fixture
        .orchestrator()
        .execute(&SelectionPolicy::Cluster { count: 0 }, &ids(&[1, 2, 3]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::InvalidClusterCount));
}

#[tokio::test]
async fn test_cluster_without_service_is_rejected() {
    let mut fixture = Fixture::new(&[1, 2]);
    fixture.clustering = None;

    let err = fixture
        .orchestrator()
        .execute(&SelectionPolicy::Cluster { count: 1 }, &ids(&[1, 2]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::MissingParameter { mode: "cluster", .. }));
}

#[tokio::test]
async fn test_unknown_choice_mode_from_config() {
    let fixture = Fixture::new(&[1]);
    let config = batch_config(&fixture, "random");

    let err = fixture
        .orchestrator()
        .execute_with_config(&config, &fixture.store())
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::UnknownChoiceMode(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn cluster_weights_cover_available_grids(
        raw in prop::collection::btree_set(1u32..5_000, 1..60),
        count in 1usize..12,
    ) {
        let available: Vec<TargetId> = raw.into_iter().map(TargetId).collect();
        let clustering: Arc<dyn ClusteringService> = Arc::new(AttributeClustering::new());
        let selector = TargetSelector::new(Some(clustering));
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let descriptors = rt
            .block_on(selector.select(&SelectionPolicy::Cluster { count }, &available))
            .unwrap();

        let weight: u64 = descriptors.iter().map(|d| u64::from(d.weight)).sum();
        prop_assert_eq!(weight, available.len() as u64);
        prop_assert!(descriptors.len() <= count.min(available.len()));
        prop_assert!(descriptors.iter().all(|d| available.contains(&d.id)));
    }
}
