//! Lloyd k-means over 3-component points with injectable seeding.
//!
//! Shared by palette extraction (points in LAB) and k-means quantization
//! (points in RGB). The only randomness is the initial centroid draw, which
//! takes the caller's RNG so seeded runs are reproducible.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Upper bound on assignment/update rounds.
pub const MAX_KMEANS_ITERATIONS: usize = 100;

pub type Point3 = [f64; 3];

/// Result of a clustering run.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub centroids: Vec<Point3>,
    /// Cluster index per input point.
    pub assignments: Vec<usize>,
    /// Number of points assigned to each centroid.
    pub counts: Vec<usize>,
    pub iterations: usize,
}

#[inline]
pub fn distance_sq(a: &Point3, b: &Point3) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}

#[inline]
fn nearest_centroid(point: &Point3, centroids: &[Point3]) -> usize {
    let mut best_idx = 0usize;
    let mut best_dist = f64::MAX;
    for (j, c) in centroids.iter().enumerate() {
        let d = distance_sq(point, c);
        if d < best_dist {
            best_dist = d;
            best_idx = j;
        }
    }
    best_idx
}

/// Pick `k` initial centroids among the distinct values of `points`.
///
/// Distinct values are collected in first-occurrence order, shuffled with
/// `rng`, and the first `k` are kept. Returns fewer than `k` when there are
/// fewer distinct values.
pub fn seed_centroids<R: Rng + ?Sized>(points: &[Point3], k: usize, rng: &mut R) -> Vec<Point3> {
    let mut distinct: Vec<Point3> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for p in points {
        let key = (p[0].to_bits(), p[1].to_bits(), p[2].to_bits());
        if seen.insert(key) {
            distinct.push(*p);
        }
    }

    distinct.shuffle(rng);
    distinct.truncate(k);
    distinct
}

/// Cluster `points` into at most `k` groups.
///
/// Stops after [`MAX_KMEANS_ITERATIONS`] rounds or as soon as a round leaves
/// every assignment unchanged. A centroid that loses all its points keeps its
/// previous position.
pub fn cluster<R: Rng + ?Sized>(points: &[Point3], k: usize, rng: &mut R) -> Clustering {
    let mut centroids = seed_centroids(points, k, rng);
    let k = centroids.len();
    let mut assignments = vec![usize::MAX; points.len()];
    let mut counts = vec![0usize; k];

    if k == 0 {
        return Clustering {
            centroids,
            assignments,
            counts,
            iterations: 0,
        };
    }

    let mut iterations = 0;
    for _ in 0..MAX_KMEANS_ITERATIONS {
        iterations += 1;

        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let idx = nearest_centroid(p, &centroids);
            if assignments[i] != idx {
                assignments[i] = idx;
                changed = true;
            }
        }

        if !changed {
            break;
        }

        let mut sums = vec![[0.0f64; 3]; k];
        counts.iter_mut().for_each(|c| *c = 0);
        for (p, &a) in points.iter().zip(assignments.iter()) {
            sums[a][0] += p[0];
            sums[a][1] += p[1];
            sums[a][2] += p[2];
            counts[a] += 1;
        }

        for (j, c) in centroids.iter_mut().enumerate() {
            if counts[j] == 0 {
                continue;
            }
            let n = counts[j] as f64;
            *c = [sums[j][0] / n, sums[j][1] / n, sums[j][2] / n];
        }
    }

    // Counts must reflect the final assignment even when the loop ran out.
    counts.iter_mut().for_each(|c| *c = 0);
    for &a in &assignments {
        counts[a] += 1;
    }

    debug!(k, points = points.len(), iterations, "k-means finished");

    Clustering {
        centroids,
        assignments,
        counts,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn two_blobs() -> Vec<Point3> {
        let mut points = Vec::new();
        for i in 0..50 {
            points.push([10.0 + (i % 5) as f64, 10.0, 10.0]);
            points.push([200.0 + (i % 5) as f64, 200.0, 200.0]);
        }
        points
    }

    #[test]
    fn test_seed_centroids_are_distinct() {
        let points = vec![[1.0, 1.0, 1.0]; 10]
            .into_iter()
            .chain(vec![[2.0, 2.0, 2.0]; 10])
            .collect::<Vec<_>>();
        let mut rng = StdRng::seed_from_u64(7);
        let seeds = seed_centroids(&points, 5, &mut rng);
        assert_eq!(seeds.len(), 2);
        assert_ne!(seeds[0], seeds[1]);
    }

    #[test]
    fn test_seed_centroids_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(seed_centroids(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn test_cluster_separates_blobs() {
        let points = two_blobs();
        let mut rng = StdRng::seed_from_u64(1);
        let result = cluster(&points, 2, &mut rng);
        assert_eq!(result.centroids.len(), 2);
        assert_eq!(result.counts.iter().sum::<usize>(), points.len());
        assert_eq!(result.counts, vec![50, 50]);

        let mut firsts: Vec<f64> = result.centroids.iter().map(|c| c[0]).collect();
        firsts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((firsts[0] - 12.0).abs() < 1e-9);
        assert!((firsts[1] - 202.0).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_is_reproducible_with_same_seed() {
        let points = two_blobs();
        let a = cluster(&points, 4, &mut StdRng::seed_from_u64(99));
        let b = cluster(&points, 4, &mut StdRng::seed_from_u64(99));
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.assignments, b.assignments);
    }

    #[test]
    fn test_cluster_stops_early_when_stable() {
        let points = vec![[0.0, 0.0, 0.0], [100.0, 100.0, 100.0]];
        let result = cluster(&points, 2, &mut StdRng::seed_from_u64(3));
        assert!(result.iterations < MAX_KMEANS_ITERATIONS);
        assert_eq!(result.counts, vec![1, 1]);
    }
}
