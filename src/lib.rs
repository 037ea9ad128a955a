// This software is licensed under a dual license model:
//
// GNU Affero General Public License v3 (AGPLv3): You may use, modify, and
// distribute this software under the terms of the AGPLv3.
//
// Elastic License v2 (ELv2): You may also use, modify, and distribute this
// software under the Elastic License v2, which has specific restrictions.
//
// We welcome any commercial collaboration or support. For inquiries
// regarding the licenses, please contact us at:
// vectorchord-inquiry@tensorchord.ai
//
// Copyright (c) 2025 TensorChord Inc.

//! Accelerated k-means clustering.
//!
//! The exact Lloyd iteration together with variants that skip distance
//! computations through triangle-inequality bounds, a k-d tree over the
//! points, and the Hartigan-Wong transfer method.

mod error;
mod options;

pub use distance::DistanceKind;
pub use error::Error;
pub use k_means::init::{Initializer, Predefined, RandomlyChosen};
pub use k_means::kdtree::Split;
pub use k_means::{Cluster, Clustering, k_means_lookup};
pub use options::{KMeansAlgorithm, KMeansOptions, KdTreeOptions, YinYangOptions};
pub use vector::{PointRef, Relation, SVectBorrowed, SparseMatrix, Square};

use k_means::ClusterState;
use validator::Validate;

/// Clusters `relation` into `options.k` clusters, starting from the means
/// chosen by `initializer`. `check` is called before every iteration.
pub fn k_means<R: Relation>(
    options: &KMeansOptions,
    relation: &R,
    initializer: &impl Initializer,
    check: impl FnMut(usize),
) -> Result<Clustering, Error> {
    options.validate()?;
    if relation.is_empty() {
        return Err(Error::EmptyRelation);
    }
    let means = initializer.initial_means(relation, options.k as usize);
    k_means_with_means(options, relation, means, check)
}

pub fn k_means_with_means<R: Relation>(
    options: &KMeansOptions,
    relation: &R,
    means: Square,
    check: impl FnMut(usize),
) -> Result<Clustering, Error> {
    options.validate()?;
    if relation.is_empty() {
        return Err(Error::EmptyRelation);
    }
    let k = options.k as usize;
    if means.len() != k {
        return Err(Error::NumberOfMeans {
            expected: k,
            actual: means.len(),
        });
    }
    if means.d() != relation.dims() {
        return Err(Error::DimensionMismatch {
            expected: relation.dims(),
            actual: means.d(),
        });
    }
    let distance = options.checked_distance();
    let mut state = ClusterState::new(relation, distance, means);
    let mut algorithm = options.algorithm.build(relation, k);
    let outcome = k_means::run(
        &mut state,
        algorithm.as_mut(),
        options.max_iterations as usize,
        check,
    );
    let variances = if options.varstat {
        Some(state.exact_variances(options.num_threads as usize)?)
    } else {
        state.tracked_variances()
    };
    log::info!(
        "{}: {} points, {} iterations, converged: {}, {} distance computations",
        algorithm.name(),
        relation.len(),
        outcome.iterations,
        outcome.converged,
        state.distance_computations()
    );
    Ok(state.into_clustering(outcome, variances))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn blobs(n: usize) -> Square {
        let mut rng = StdRng::seed_from_u64(7);
        let centers = [[0.0, 0.0, 0.0], [8.0, 8.0, 0.0], [-8.0, 4.0, 6.0], [3.0, -9.0, 2.0]];
        Square::from_rows(
            3,
            (0..n).map(|i| {
                let c = centers[i % centers.len()];
                [
                    c[0] + rng.random_range(-2.0..2.0),
                    c[1] + rng.random_range(-2.0..2.0),
                    c[2] + rng.random_range(-2.0..2.0),
                ]
            }),
        )
    }

    fn algorithms() -> Vec<KMeansAlgorithm> {
        use KMeansAlgorithm::*;
        vec![
            Hamerly {},
            SimplifiedHamerly {},
            Elkan {},
            SimplifiedElkan {},
            Annulus {},
            Exponion {},
            Shallot {},
            Compare {},
            Sort {},
            YinYang(YinYangOptions::default()),
            YinYang(YinYangOptions { groups: Some(3) }),
            KdTreePruning(KdTreeOptions::default()),
            KdTreeFiltering(KdTreeOptions {
                split: Split::Median,
                leaf_size: 3,
            }),
        ]
    }

    #[test]
    fn every_algorithm_agrees_with_lloyd() {
        let relation = blobs(400);
        let mut options = KMeansOptions::new(6);
        let initializer = RandomlyChosen::from_u64(3);
        let lloyd = k_means(&options, &relation, &initializer, |_| ()).unwrap();
        assert!(lloyd.converged);
        for algorithm in algorithms() {
            options.algorithm = algorithm.clone();
            let result = k_means(&options, &relation, &initializer, |_| ()).unwrap();
            assert!(result.converged, "{algorithm:?}");
            assert_eq!(result.iterations, lloyd.iterations, "{algorithm:?}");
            assert_eq!(
                result.labels(relation.len()),
                lloyd.labels(relation.len()),
                "{algorithm:?}"
            );
            for (a, b) in result.clusters.iter().zip(lloyd.clusters.iter()) {
                for (x, y) in a.centroid.iter().zip(b.centroid.iter()) {
                    assert!((x - y).abs() < 1e-9, "{algorithm:?}");
                }
            }
        }
    }

    #[test]
    fn hartigan_wong_does_not_lose_to_lloyd() {
        let relation = blobs(200);
        let means = Square::from_rows(3, relation.iter().take(4));
        let mut options = KMeansOptions::new(4);
        options.varstat = true;
        let lloyd = k_means_with_means(&options, &relation, means.clone(), |_| ()).unwrap();
        options.algorithm = KMeansAlgorithm::HartiganWong {};
        let hartigan_wong = k_means_with_means(&options, &relation, means, |_| ()).unwrap();
        let ssq = |c: &Clustering| c.clusters.iter().map(|c| c.variance.unwrap()).sum::<f64>();
        assert!(ssq(&hartigan_wong) <= ssq(&lloyd) + 1e-9);
    }

    #[test]
    fn exact_variances_match_tracked() {
        let relation = blobs(300);
        let initializer = RandomlyChosen::from_u64(5);
        let mut options = KMeansOptions::new(4);
        let tracked = k_means(&options, &relation, &initializer, |_| ()).unwrap();
        options.varstat = true;
        options.num_threads = 4;
        let exact = k_means(&options, &relation, &initializer, |_| ()).unwrap();
        for (a, b) in tracked.clusters.iter().zip(exact.clusters.iter()) {
            assert_eq!(a.ids, b.ids);
            let (a, b) = (a.variance.unwrap(), b.variance.unwrap());
            assert!((a - b).abs() <= 1e-9 * b.max(1.0));
        }
    }

    #[test]
    fn sparse_relation() {
        let mut relation = SparseMatrix::new(6);
        for i in 0..40 {
            let x = (i % 5) as f64 * 0.01;
            if i % 2 == 0 {
                relation.push(&[0, 3], &[1.0 + x, 2.0]).unwrap();
            } else {
                relation.push(&[1, 5], &[-4.0, 3.0 + x]).unwrap();
            }
        }
        let mut options = KMeansOptions::new(2);
        let means = Square::from_rows(6, [[0.0, 0.0, 0.0, 2.0, 0.0, 0.0], [0.0; 6]]);
        for algorithm in [KMeansAlgorithm::Lloyd {}, KMeansAlgorithm::Elkan {}] {
            options.algorithm = algorithm;
            let result = k_means_with_means(&options, &relation, means.clone(), |_| ()).unwrap();
            let labels = result.labels(relation.len());
            for (i, label) in labels.iter().enumerate() {
                assert_eq!(*label as usize, i % 2);
            }
            assert!((result.clusters[1].centroid[5] - 3.02).abs() < 1e-9);
        }
    }

    #[test]
    fn check_sees_every_iteration() {
        let relation = blobs(100);
        let mut options = KMeansOptions::new(4);
        options.max_iterations = 2;
        let mut seen = Vec::new();
        let result = k_means(
            &options,
            &relation,
            &RandomlyChosen::from_u64(1),
            |i| seen.push(i),
        )
        .unwrap();
        assert_eq!(result.iterations, 2);
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn errors() {
        let relation = blobs(10);
        let options = KMeansOptions::new(2);
        let empty = Square::new(3);
        assert!(matches!(
            k_means(&options, &empty, &RandomlyChosen::from_u64(0), |_| ()),
            Err(Error::EmptyRelation)
        ));
        assert!(matches!(
            k_means_with_means(&options, &relation, Square::from_zeros(3, 3), |_| ()),
            Err(Error::NumberOfMeans {
                expected: 2,
                actual: 3
            })
        ));
        assert!(matches!(
            k_means_with_means(&options, &relation, Square::from_zeros(2, 2), |_| ()),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            k_means(
                &KMeansOptions::new(0),
                &relation,
                &RandomlyChosen::from_u64(0),
                |_| ()
            ),
            Err(Error::InvalidOptions(_))
        ));
        assert!(matches!(
            "k = ".parse::<KMeansOptions>(),
            Err(Error::ParseOptions(_))
        ));
    }

    #[test]
    fn lookup_after_clustering() {
        let relation = blobs(200);
        let options = KMeansOptions::new(4);
        let result = k_means(&options, &relation, &RandomlyChosen::from_u64(9), |_| ()).unwrap();
        let centroids = result.centroids();
        let labels = result.labels(relation.len());
        for i in 0..relation.len() {
            let nearest =
                k_means_lookup(relation.get(i), &centroids, DistanceKind::SquaredEuclidean);
            assert_eq!(nearest as u32, labels[i]);
        }
    }
}
