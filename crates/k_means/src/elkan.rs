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

use crate::KMeans;
use crate::state::{ClusterState, nearer};
use vector::{Relation, Square};

/// Elkan's k-means: one lower bound per point and mean.
pub struct Elkan {
    simplified: bool,
    k: usize,
    upper: Vec<f64>,
    lower: Vec<f64>,
    sep: Vec<f64>,
    cdist: Square,
}

impl Elkan {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            simplified: false,
            k,
            upper: vec![f64::INFINITY; n],
            lower: vec![0.0; n * k],
            sep: vec![0.0; k],
            cdist: Square::from_zeros(k, k),
        }
    }

    /// Elkan without center-center distances.
    pub fn simplified(n: usize, k: usize) -> Self {
        Self {
            simplified: true,
            cdist: Square::new(k),
            ..Self::new(n, k)
        }
    }
}

impl<R: Relation> KMeans<R> for Elkan {
    fn name(&self) -> &'static str {
        if self.simplified {
            "simplified-elkan"
        } else {
            "elkan"
        }
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        let relation = state.relation();
        let k = self.k;
        for i in 0..state.n() {
            let x = relation.get(i);
            let lower = &mut self.lower[i * k..][..k];
            let (mut min, mut best) = (f64::INFINITY, 0);
            for j in 0..k {
                let dist = state.sqrt_distance(x, &state.means[j]);
                lower[j] = dist;
                if dist < min {
                    min = dist;
                    best = j;
                }
            }
            self.upper[i] = min;
            state.assign(i, best);
        }
        state.n() as isize
    }

    fn update(&mut self, state: &mut ClusterState<'_, R>) {
        let previous = state.update_means();
        let moved = state.moved_distances(&previous);
        let k = self.k;
        for i in 0..state.n() {
            self.upper[i] += moved[state.assignment[i] as usize];
            for (l, m) in self.lower[i * k..][..k].iter_mut().zip(moved.iter()) {
                *l -= m;
            }
        }
    }

    fn assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        if !self.simplified {
            state.recompute_separation_with(&mut self.sep, &mut self.cdist);
        }
        let relation = state.relation();
        let (k, simplified, cdist) = (self.k, self.simplified, &self.cdist);
        let mut changed = 0;
        for i in 0..state.n() {
            let cur = state.assignment[i] as usize;
            let mut u = self.upper[i];
            if !simplified && u < self.sep[cur] {
                continue;
            }
            let x = relation.get(i);
            let lower = &mut self.lower[i * k..][..k];
            let mut tight = false;
            let mut best = cur;
            for j in 0..k {
                if j == best || u < lower[j] || (!simplified && u < cdist[best][j]) {
                    continue;
                }
                if !tight {
                    u = state.sqrt_distance(x, &state.means[best]);
                    lower[best] = u;
                    tight = true;
                    if u < lower[j] || (!simplified && u < cdist[best][j]) {
                        continue;
                    }
                }
                let dist = state.sqrt_distance(x, &state.means[j]);
                lower[j] = dist;
                if nearer(dist, j, u, best) {
                    best = j;
                    u = dist;
                }
            }
            self.upper[i] = u;
            if best != cur {
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
        let relation = blobs(&mut rng, 500, 5, 9);
        let means = pick_means(&mut rng, &relation, 9);
        for kind in [DistanceKind::SquaredEuclidean, DistanceKind::Maximum] {
            assert_matches_lloyd(&relation, &means, kind, &mut Elkan::new(500, 9));
            assert_matches_lloyd(&relation, &means, kind, &mut Elkan::simplified(500, 9));
        }
    }

    #[test]
    fn bounds_stay_sound() {
        let mut rng = StdRng::seed_from_u64(7);
        let relation = blobs(&mut rng, 300, 3, 5);
        let means = pick_means(&mut rng, &relation, 5);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let mut elkan = Elkan::new(300, 5);
        KMeans::initial_assign(&mut elkan, &mut state);
        for _ in 0..10 {
            KMeans::update(&mut elkan, &mut state);
            for i in 0..state.n() {
                let x = state.relation().get(i);
                let a = state.assignment()[i] as usize;
                let dist = DistanceKind::Euclidean.distance(x, &state.means()[a]);
                assert!(dist <= elkan.upper[i] + 1e-9);
                for j in 0..5 {
                    let dist = DistanceKind::Euclidean.distance(x, &state.means()[j]);
                    assert!(dist >= elkan.lower[i * 5 + j] - 1e-9);
                }
            }
            if KMeans::assign(&mut elkan, &mut state) == 0 {
                break;
            }
        }
    }
}
