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

//! Hamerly's k-means: one upper and one lower bound per point.

use crate::KMeans;
use crate::state::{ClusterState, nearer};
use vector::Relation;

pub struct Hamerly {
    simplified: bool,
    upper: Vec<f64>,
    lower: Vec<f64>,
    sep: Vec<f64>,
}

impl Hamerly {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            simplified: false,
            upper: vec![f64::INFINITY; n],
            lower: vec![0.0; n],
            sep: vec![0.0; k],
        }
    }

    /// Hamerly without the center separation test.
    pub fn simplified(n: usize, k: usize) -> Self {
        Self {
            simplified: true,
            ..Self::new(n, k)
        }
    }

    #[cfg(test)]
    pub(crate) fn bounds(&self) -> (&[f64], &[f64]) {
        (&self.upper, &self.lower)
    }
}

impl<R: Relation> KMeans<R> for Hamerly {
    fn name(&self) -> &'static str {
        if self.simplified {
            "simplified-hamerly"
        } else {
            "hamerly"
        }
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        let relation = state.relation();
        for i in 0..state.n() {
            let x = relation.get(i);
            let (mut min1, mut min2, mut best) = (f64::INFINITY, f64::INFINITY, 0);
            for j in 0..state.k() {
                let dist = state.distance(x, &state.means[j]);
                if dist < min1 {
                    min2 = min1;
                    min1 = dist;
                    best = j;
                } else if dist < min2 {
                    min2 = dist;
                }
            }
            state.assign(i, best);
            let kind = state.distance_kind();
            self.upper[i] = kind.to_metric(min1);
            self.lower[i] = kind.to_metric(min2);
        }
        state.n() as isize
    }

    fn update(&mut self, state: &mut ClusterState<'_, R>) {
        let previous = state.update_means();
        let moved = state.moved_distances(&previous);
        let delta = moved.iter().copied().fold(0.0, f64::max);
        for i in 0..state.n() {
            self.upper[i] += moved[state.assignment[i] as usize];
            self.lower[i] -= delta;
        }
    }

    fn assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        if !self.simplified {
            state.recompute_separation(&mut self.sep);
        }
        let relation = state.relation();
        let mut changed = 0;
        for i in 0..state.n() {
            let cur = state.assignment[i] as usize;
            let z = if self.simplified {
                self.lower[i]
            } else {
                self.lower[i].max(self.sep[cur])
            };
            if self.upper[i] < z {
                continue;
            }
            let x = relation.get(i);
            let u = state.sqrt_distance(x, &state.means[cur]);
            self.upper[i] = u;
            if u < z {
                continue;
            }
            let (mut min1, mut min2, mut best) = (u, f64::INFINITY, cur);
            for j in 0..state.k() {
                if j == cur {
                    continue;
                }
                let dist = state.sqrt_distance(x, &state.means[j]);
                if nearer(dist, j, min1, best) {
                    min2 = min1;
                    min1 = dist;
                    best = j;
                } else if dist < min2 {
                    min2 = dist;
                }
            }
            self.lower[i] = min2;
            if best != cur {
                self.upper[i] = min1;
                state.assign(i, best);
                changed += 1;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use distance::DistanceKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn matches_lloyd() {
        let mut rng = StdRng::seed_from_u64(7);
        let relation = blobs(&mut rng, 600, 4, 7);
        let means = pick_means(&mut rng, &relation, 7);
        for kind in [
            DistanceKind::SquaredEuclidean,
            DistanceKind::Euclidean,
            DistanceKind::Manhattan,
        ] {
            assert_matches_lloyd(&relation, &means, kind, &mut Hamerly::new(600, 7));
            assert_matches_lloyd(&relation, &means, kind, &mut Hamerly::simplified(600, 7));
        }
    }

    #[test]
    fn bounds_stay_sound() {
        let mut rng = StdRng::seed_from_u64(7);
        let relation = blobs(&mut rng, 300, 3, 5);
        let means = pick_means(&mut rng, &relation, 5);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let mut hamerly = Hamerly::new(300, 5);
        KMeans::initial_assign(&mut hamerly, &mut state);
        for _ in 0..10 {
            KMeans::update(&mut hamerly, &mut state);
            let (upper, lower) = hamerly.bounds();
            for i in 0..state.n() {
                let x = state.relation().get(i);
                let a = state.assignment()[i] as usize;
                for j in 0..state.k() {
                    let dist = DistanceKind::Euclidean.distance(x, &state.means()[j]);
                    if j == a {
                        assert!(dist <= upper[i] + 1e-9);
                    } else {
                        assert!(dist >= lower[i] - 1e-9);
                    }
                }
            }
            if KMeans::assign(&mut hamerly, &mut state) == 0 {
                break;
            }
        }
    }

    #[test]
    fn single_mean() {
        let relation = vector::Square::from_rows(2, [[0.0, 1.0], [2.0, 3.0]]);
        let means = vector::Square::from_rows(2, [[5.0, 5.0]]);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let outcome = crate::run(&mut state, &mut Hamerly::new(2, 1), 0, |_| ());
        assert!(outcome.converged);
        assert_eq!(&state.means()[0], &[1.0, 2.0]);
    }
}
