use std::collections::BTreeSet;

use grid_batch::bridge::SchemaVersion;
use grid_batch::domain::{ErrorClass, SelectionPolicy, TargetId, TargetState};
use grid_batch::error::ConfigurationError;
use grid_batch::orchestrator::Concurrency;
use grid_batch::simulation::{SimulatedAnalysisEngine, SimulatedInterfaceProvider};
use grid_batch::store::TargetStore;

use super::{bus_for, ids, Fixture};

#[tokio::test]
async fn test_grid_without_definition_fails_alone() {
    // 2 is mapped to a substation but has no definition file
    let mut fixture = Fixture::new(&[1, 3]);
    fixture.mapped = ids(&[1, 2, 3]);
    let policy = SelectionPolicy::Manual { ids: ids(&[1, 2, 3]) };

    let result = fixture
        .orchestrator()
        .execute(&policy, &ids(&[1, 2, 3]))
        .await
        .unwrap();

    assert_eq!(
        result.outcomes.keys().copied().collect::<Vec<_>>(),
        ids(&[1, 2, 3])
    );
    assert_eq!(result.outcomes[&TargetId(1)].state(), TargetState::Succeeded);
    assert_eq!(result.outcomes[&TargetId(3)].state(), TargetState::Succeeded);
    let failure = result.outcomes[&TargetId(2)].failure().unwrap();
    assert_eq!(failure.class, ErrorClass::DataAvailability);
    assert!(failure.cause.contains("no MV grid file for MV grid ID 2"));
}

#[tokio::test]
async fn test_all_produces_one_outcome_per_grid() {
    let stored: Vec<u32> = (1..=12).collect();
    let fixture = Fixture::new(&stored);
    let available = fixture.store().discover().await.unwrap();

    let result = fixture
        .orchestrator()
        .execute(&SelectionPolicy::All, &available)
        .await
        .unwrap();

    assert_eq!(result.outcomes.len(), 12);
    assert_eq!(result.descriptors.len(), 12);
    assert!(result.descriptors.iter().all(|d| d.weight == 1));
    assert_eq!(result.summary().succeeded, 12);
}

#[tokio::test]
async fn test_unknown_manual_grid_aborts_batch() {
    let fixture = Fixture::new(&[1, 2]);
    let policy = SelectionPolicy::Manual { ids: ids(&[1, 77]) };

    let err = fixture
        .orchestrator()
        .execute(&policy, &ids(&[1, 2]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::UnknownTarget(TargetId(77))));
}

#[tokio::test]
async fn test_failures_are_classified_and_excluded_from_costs() {
    let mut fixture = Fixture::new(&[1, 2, 3, 4, 5]);
    fixture.engine = SimulatedAnalysisEngine::new()
        .with_diverging([TargetId(2)])
        .with_invalid([TargetId(3)]);
    fixture.interface = SimulatedInterfaceProvider::new(24).with_unknown_buses([bus_for(TargetId(4))]);

    let result = fixture
        .orchestrator()
        .execute(&SelectionPolicy::All, &ids(&[1, 2, 3, 4, 5]))
        .await
        .unwrap();

    let classes: Vec<_> = result.failures().map(|f| (f.target_id.0, f.class)).collect();
    assert_eq!(
        classes,
        vec![
            (2, ErrorClass::Analysis),
            (3, ErrorClass::DataAvailability),
            (4, ErrorClass::DataAvailability),
        ]
    );

    let successful: BTreeSet<TargetId> = result.successes().map(|(id, _)| *id).collect();
    assert_eq!(successful, ids(&[1, 5]).into_iter().collect());
    assert!(result
        .aggregated_costs
        .iter()
        .all(|r| successful.contains(&r.target_id)));
}

#[tokio::test]
async fn test_processing_order_and_pool_do_not_change_outcomes() {
    let stored: Vec<u32> = (1..=9).collect();
    let mut fixture = Fixture::new(&stored);
    fixture.engine = SimulatedAnalysisEngine::new().with_diverging([TargetId(4), TargetId(7)]);
    let available = ids(&stored);

    let forward = SelectionPolicy::Manual { ids: available.clone() };
    let reversed = SelectionPolicy::Manual {
        ids: available.iter().rev().copied().collect(),
    };

    let sequential = fixture.orchestrator().execute(&forward, &available).await.unwrap();
    let backwards = fixture.orchestrator().execute(&reversed, &available).await.unwrap();
    fixture.concurrency = Concurrency::Pool { workers: 4 };
    let pooled = fixture.orchestrator().execute(&forward, &available).await.unwrap();

    assert_eq!(sequential.outcomes, backwards.outcomes);
    assert_eq!(sequential.outcomes, pooled.outcomes);
    assert_eq!(sequential.aggregated_costs, pooled.aggregated_costs);
}

#[tokio::test]
async fn test_versioned_schema_without_substation_fails_grid() {
    let mut fixture = Fixture::new(&[1, 2]);
    fixture.mapped = ids(&[1]);
    fixture.schema = SchemaVersion::Versioned {
        version: "v0.4.5".to_string(),
    };

    let result = fixture
        .orchestrator()
        .execute(&SelectionPolicy::All, &ids(&[1, 2]))
        .await
        .unwrap();

    assert!(result.outcomes[&TargetId(1)].is_success());
    let failure = result.outcomes[&TargetId(2)].failure().unwrap();
    assert_eq!(failure.class, ErrorClass::DataAvailability);
    assert!(failure.cause.contains("versioned v0.4.5"));
}
