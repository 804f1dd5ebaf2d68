use async_trait::async_trait;
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::domain::TargetId;
use crate::selection::{ClusterGroup, ClusteringError, ClusteringService};

const MAX_ITERATIONS: usize = 50;

/// Clustering attributes of one MV grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAttributes {
    pub wind_capacity_mw: f64,
    pub solar_capacity_mw: f64,
    pub farthest_node_km: f64,
}

impl GridAttributes {
    /// Synthetic attributes, stable per grid id
    pub fn synthetic(target_id: TargetId) -> Self {
        let mut rng = StdRng::seed_from_u64(u64::from(target_id.0).rotate_left(17));
        Self {
            wind_capacity_mw: rng.gen_range(0.0..60.0),
            solar_capacity_mw: rng.gen_range(0.0..40.0),
            farthest_node_km: rng.gen_range(2.0..35.0),
        }
    }

    fn as_point(&self) -> [f64; 3] {
        [
            self.wind_capacity_mw / 60.0,
            self.solar_capacity_mw / 40.0,
            self.farthest_node_km / 35.0,
        ]
    }
}

/// k-means over grid attributes; the grid closest to each centroid represents its cluster
#[derive(Debug, Default)]
pub struct AttributeClustering {
    attributes: RwLock<Option<BTreeMap<TargetId, GridAttributes>>>,
}

impl AttributeClustering {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a precomputed attribute table
    pub fn with_attributes(attributes: BTreeMap<TargetId, GridAttributes>) -> Self {
        Self {
            attributes: RwLock::new(Some(attributes)),
        }
    }

    fn points(&self, targets: &[TargetId]) -> Result<Vec<(TargetId, [f64; 3])>, ClusteringError> {
        let guard = self.attributes.read();
        let table = guard.as_ref().ok_or(ClusteringError::AttributesMissing)?;
        let mut points: Vec<_> = targets
            .iter()
            .map(|id| {
                let attrs = table
                    .get(id)
                    .copied()
                    .unwrap_or_else(|| GridAttributes::synthetic(*id));
                (*id, attrs.as_point())
            })
            .collect();
        points.sort_by_key(|(id, _)| *id);
        points.dedup_by_key(|(id, _)| *id);
        Ok(points)
    }
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &[f64; 3], centroids: &[[f64; 3]]) -> usize {
    centroids
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| OrderedFloat(distance(point, c)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn k_means(points: &[(TargetId, [f64; 3])], count: usize) -> Vec<usize> {
    let n = points.len();
    let mut centroids: Vec<[f64; 3]> = (0..count).map(|i| points[i * n / count].1).collect();
    let mut assignment = vec![usize::MAX; n];

    for iteration in 0..MAX_ITERATIONS {
        let next: Vec<usize> = points.iter().map(|(_, p)| nearest(p, &centroids)).collect();
        if next == assignment {
            debug!(iteration, "k-means converged");
            break;
        }
        assignment = next;

        for (k, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&[f64; 3]> = points
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == k)
                .map(|((_, p), _)| p)
                .collect();
            if members.is_empty() {
                continue;
            }
            for dim in 0..3 {
                centroid[dim] = members.iter().map(|p| p[dim]).sum::<f64>() / members.len() as f64;
            }
        }
    }
    assignment
}

#[async_trait]
impl ClusteringService for AttributeClustering {
    async fn attributes_available(&self) -> bool {
        self.attributes.read().is_some()
    }

    async fn analyze_attributes(&self, targets: &[TargetId]) -> Result<(), ClusteringError> {
        let table: BTreeMap<_, _> = targets
            .iter()
            .map(|id| (*id, GridAttributes::synthetic(*id)))
            .collect();
        info!(grids = table.len(), "analyzed cluster attributes");
        *self.attributes.write() = Some(table);
        Ok(())
    }

    async fn cluster(
        &self,
        targets: &[TargetId],
        count: usize,
    ) -> Result<Vec<ClusterGroup>, ClusteringError> {
        let points = self.points(targets)?;
        if count == 0 || count > points.len() {
            return Err(ClusteringError::Failed(format!(
                "cannot build {} clusters from {} MV grids",
                count,
                points.len()
            )));
        }

        let assignment = k_means(&points, count);
        let mut groups = Vec::with_capacity(count);
        for k in 0..count {
            let members: Vec<&(TargetId, [f64; 3])> = points
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == k)
                .map(|(p, _)| p)
                .collect();
            if members.is_empty() {
                continue;
            }

            let mut centroid = [0.0; 3];
            for dim in 0..3 {
                centroid[dim] = members.iter().map(|(_, p)| p[dim]).sum::<f64>() / members.len() as f64;
            }
            let representative = members
                .iter()
                .min_by_key(|(id, p)| (OrderedFloat(distance(p, &centroid)), *id))
                .map(|(id, _)| *id)
                .ok_or_else(|| ClusteringError::Failed("empty cluster".to_string()))?;

            groups.push(ClusterGroup {
                representative,
                member_count: members.len() as u32,
            });
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<TargetId> {
        range.map(TargetId).collect()
    }

    #[tokio::test]
    async fn test_requires_attributes() {
        let clustering = AttributeClustering::new();
        assert!(!clustering.attributes_available().await);
        assert!(matches!(
            clustering.cluster(&ids(1..=4), 2).await,
            Err(ClusteringError::AttributesMissing)
        ));

        clustering.analyze_attributes(&ids(1..=4)).await.unwrap();
        assert!(clustering.attributes_available().await);
    }

    #[tokio::test]
    async fn test_groups_cover_all_grids() {
        let clustering = AttributeClustering::new();
        let targets = ids(1..=30);
        clustering.analyze_attributes(&targets).await.unwrap();

        let groups = clustering.cluster(&targets, 4).await.unwrap();

        assert!(!groups.is_empty() && groups.len() <= 4);
        let covered: u32 = groups.iter().map(|g| g.member_count).sum();
        assert_eq!(covered, 30);
        assert!(groups.iter().all(|g| targets.contains(&g.representative)));
    }

    #[tokio::test]
    async fn test_one_cluster_per_grid() {
        let clustering = AttributeClustering::new();
        let targets = ids(10..=14);
        clustering.analyze_attributes(&targets).await.unwrap();

        let groups = clustering.cluster(&targets, 5).await.unwrap();

        let mut reps: Vec<_> = groups.iter().map(|g| g.representative).collect();
        reps.sort();
        assert_eq!(reps, targets);
        assert!(groups.iter().all(|g| g.member_count == 1));
    }

    #[tokio::test]
    async fn test_separates_distinct_grids() {
        let near = GridAttributes {
            wind_capacity_mw: 1.0,
            solar_capacity_mw: 1.0,
            farthest_node_km: 3.0,
        };
        let far = GridAttributes {
            wind_capacity_mw: 55.0,
            solar_capacity_mw: 38.0,
            farthest_node_km: 30.0,
        };
        let clustering = AttributeClustering::with_attributes(BTreeMap::from([
            (TargetId(1), near),
            (TargetId(2), near),
            (TargetId(3), far),
            (TargetId(4), far),
            (TargetId(5), far),
        ]));

        let mut groups = clustering.cluster(&ids(1..=5), 2).await.unwrap();
        groups.sort_by_key(|g| g.member_count);

        assert_eq!(
            groups,
            vec![
                ClusterGroup { representative: TargetId(1), member_count: 2 },
                ClusterGroup { representative: TargetId(3), member_count: 3 },
            ]
        );
    }
}
