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

use crate::lloyd::Lloyd;
use crate::{ClusterState, KMeans};
use distance::DistanceKind;
use rand::Rng;
use rand::rngs::StdRng;
use vector::{Relation, Square};

/// Gaussian-ish blobs around `centers` random centers in `[-10, 10]^d`.
pub fn blobs(rng: &mut StdRng, n: usize, d: usize, centers: usize) -> Square {
    let centers = (0..centers)
        .map(|_| (0..d).map(|_| rng.random_range(-10.0..10.0)).collect::<Vec<f64>>())
        .collect::<Vec<_>>();
    let mut relation = Square::with_capacity(d, n);
    for i in 0..n {
        let center = &centers[i % centers.len()];
        relation.push_iter(center.iter().map(|&c| {
            let noise = (0..4).map(|_| rng.random_range(-1.0..1.0)).sum::<f64>();
            c + noise
        }));
    }
    relation
}

/// Integer coordinates in `[0, side)^d`, where equal distances are common.
pub fn grid(rng: &mut StdRng, n: usize, d: usize, side: u32) -> Square {
    let mut relation = Square::with_capacity(d, n);
    for _ in 0..n {
        relation.push_iter((0..d).map(|_| rng.random_range(0..side) as f64));
    }
    relation
}

pub fn pick_means(rng: &mut StdRng, relation: &Square, k: usize) -> Square {
    let mut means = Square::with_capacity(relation.d(), k);
    for index in rand::seq::index::sample(rng, relation.len(), k) {
        means.push_slice(&relation[index]);
    }
    means
}

pub fn assert_sums_consistent<R: Relation>(state: &ClusterState<'_, R>) {
    let mut sums = Square::from_zeros(state.d(), state.k());
    let mut sizes = vec![0usize; state.k()];
    for i in 0..state.n() {
        let a = state.assignment()[i] as usize;
        state.relation().get(i).add_to(&mut sums[a]);
        sizes[a] += 1;
    }
    for j in 0..state.k() {
        assert_eq!(sizes[j], state.cluster_size(j));
        for (x, y) in sums[j].iter().zip(state.sums()[j].iter()) {
            assert!((x - y).abs() < 1e-6, "sum drifted: {x} vs {y}");
        }
    }
}

/// Runs the first pass of `k_means` and of brute force, requiring identical assignments.
pub fn assert_first_pass_matches_lloyd<R: Relation>(
    relation: &R,
    means: &Square,
    distance: DistanceKind,
    k_means: &mut dyn KMeans<R>,
) {
    let mut expected = ClusterState::new(relation, distance, means.clone());
    let mut actual = ClusterState::new(relation, distance, means.clone());
    KMeans::initial_assign(&mut Lloyd, &mut expected);
    k_means.initial_assign(&mut actual);
    assert_eq!(
        expected.assignment(),
        actual.assignment(),
        "{} breaks a tie differently",
        k_means.name()
    );
    assert_sums_consistent(&actual);
}

/// Steps `k_means` and brute force side by side and requires identical assignments.
pub fn assert_matches_lloyd(
    relation: &Square,
    means: &Square,
    distance: DistanceKind,
    k_means: &mut dyn KMeans<Square>,
) {
    let mut expected = ClusterState::new(relation, distance, means.clone());
    let mut actual = ClusterState::new(relation, distance, means.clone());
    let mut lloyd = Lloyd;
    KMeans::initial_assign(&mut lloyd, &mut expected);
    k_means.initial_assign(&mut actual);
    assert_eq!(expected.assignment(), actual.assignment(), "initial pass");
    for iteration in 1..100 {
        KMeans::update(&mut lloyd, &mut expected);
        k_means.update(&mut actual);
        for j in 0..means.len() {
            for (x, y) in expected.means()[j].iter().zip(actual.means()[j].iter()) {
                assert!((x - y).abs() < 1e-9, "means differ at iteration {iteration}");
            }
        }
        let expected_changed = KMeans::assign(&mut lloyd, &mut expected);
        let actual_changed = k_means.assign(&mut actual);
        assert_eq!(
            expected.assignment(),
            actual.assignment(),
            "{} differs at iteration {iteration}",
            k_means.name()
        );
        assert_eq!(expected_changed, actual_changed);
        assert_sums_consistent(&actual);
        if expected_changed == 0 {
            return;
        }
    }
    panic!("brute force did not converge");
}
