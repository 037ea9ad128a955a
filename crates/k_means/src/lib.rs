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

pub mod annulus;
pub mod compare;
pub mod elkan;
pub mod exponion;
pub mod hamerly;
pub mod hartigan_wong;
pub mod init;
pub mod kdtree;
pub mod lloyd;
pub mod shallot;
pub mod state;
pub mod yinyang;

#[cfg(test)]
mod testing;

pub use lloyd::k_means_lookup;
pub use state::{Cluster, ClusterState, Clustering, Outcome, UNASSIGNED};

use vector::Relation;

/// One k-means variant, driven by [`run`].
pub trait KMeans<R: Relation> {
    fn name(&self) -> &'static str;

    /// First pass from unassigned points; returns the number of points.
    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize;

    /// Installs new means before the next pass.
    fn update(&mut self, state: &mut ClusterState<'_, R>) {
        state.update_means();
    }

    /// Reassigns points, returning the number of changes; a non-positive value ends the run.
    fn assign(&mut self, state: &mut ClusterState<'_, R>) -> isize;
}

/// Iterates `k_means` on `state` until no point changes or `max_iterations`
/// passes were made, `0` meaning no limit.
///
/// The means left in `state` are the ones the last pass assigned against.
pub fn run<R: Relation>(
    state: &mut ClusterState<'_, R>,
    k_means: &mut dyn KMeans<R>,
    max_iterations: usize,
    mut check: impl FnMut(usize),
) -> Outcome {
    let name = k_means.name();
    let mut iterations = 0;
    let mut converged = false;
    while max_iterations == 0 || iterations < max_iterations {
        check(iterations);
        iterations += 1;
        let changed = if iterations == 1 {
            k_means.initial_assign(state)
        } else {
            k_means.update(state);
            k_means.assign(state)
        };
        log::debug!("{name}.iteration-{iterations}.reassignments: {changed}");
        if let Some(varsum) = state.varsum.as_ref() {
            log::debug!(
                "{name}.iteration-{iterations}.variance-sum: {}",
                varsum.iter().sum::<f64>()
            );
        }
        if changed <= 0 {
            converged = true;
            break;
        }
    }
    log::debug!(
        "{name}.distance-computations: {}",
        state.distance_computations()
    );
    Outcome {
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdtree::{Filter, KdTreeKMeans, Split};
    use crate::testing::*;
    use distance::DistanceKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use vector::Square;

    fn strategies(relation: &Square, k: usize) -> Vec<Box<dyn KMeans<Square>>> {
        let n = relation.len();
        let mut strategies: Vec<Box<dyn KMeans<Square>>> = vec![
            Box::new(hamerly::Hamerly::new(n, k)),
            Box::new(hamerly::Hamerly::simplified(n, k)),
            Box::new(elkan::Elkan::new(n, k)),
            Box::new(elkan::Elkan::simplified(n, k)),
            Box::new(annulus::Annulus::new(n, k)),
            Box::new(exponion::Exponion::new(n, k)),
            Box::new(shallot::Shallot::new(n, k)),
            Box::new(compare::Compare::new(k)),
            Box::new(compare::Compare::sorted(k)),
            Box::new(yinyang::YinYang::new(n, k, None)),
            Box::new(yinyang::YinYang::new(n, k, Some(k))),
            Box::new(hartigan_wong::HartiganWong::new(n, k)),
        ];
        for split in [Split::Midpoint, Split::BoundedMidpoint, Split::Median, Split::Ssq] {
            for filter in [Filter::Pruning, Filter::Filtering] {
                for leaf_size in [1, 5] {
                    strategies.push(Box::new(KdTreeKMeans::new(
                        relation, k, filter, split, leaf_size,
                    )));
                }
            }
        }
        strategies
    }

    #[test]
    fn ties_go_to_the_lower_index() {
        let kind = DistanceKind::SquaredEuclidean;
        let relation = Square::from_rows(1, [[0.0], [2.0], [4.0]]);
        let means = Square::from_rows(1, [[3.0], [1.0], [10.0]]);
        for mut k_means in strategies(&relation, 3) {
            assert_first_pass_matches_lloyd(&relation, &means, kind, k_means.as_mut());
        }
        let relation = Square::from_rows(1, [[2.0], [9.0]]);
        let means = Square::from_rows(1, [[10.0], [0.0], [4.0]]);
        for mut k_means in strategies(&relation, 3) {
            assert_first_pass_matches_lloyd(&relation, &means, kind, k_means.as_mut());
        }
        let mut state = ClusterState::new(&relation, kind, means);
        run(&mut state, &mut compare::Compare::sorted(3), 0, |_| ());
        assert_eq!(state.assignment(), &[1, 0]);
    }

    #[test]
    fn integer_grids_match_lloyd() {
        let kind = DistanceKind::SquaredEuclidean;
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let relation = grid(&mut rng, 120, 2, 8);
            let means = pick_means(&mut rng, &relation, 6);
            for mut k_means in strategies(&relation, 6) {
                assert_first_pass_matches_lloyd(&relation, &means, kind, k_means.as_mut());
            }
        }
    }
}
