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
use crate::state::{ClusterState, nearer, nearest_means};
use vector::{Relation, Square};

/// Exponion that also remembers each point's second nearest mean and scans
/// around whichever of the two is nearer, shrinking the radius as it goes.
pub struct Shallot {
    upper: Vec<f64>,
    lower: Vec<f64>,
    second: Vec<u32>,
    sep: Vec<f64>,
    cdist: Square,
    cnum: Vec<Vec<u32>>,
}

impl Shallot {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            upper: vec![f64::INFINITY; n],
            lower: vec![0.0; n],
            second: vec![0; n],
            sep: vec![0.0; k],
            cdist: Square::from_zeros(k, k),
            cnum: Vec::new(),
        }
    }
}

impl<R: Relation> KMeans<R> for Shallot {
    fn name(&self) -> &'static str {
        "shallot"
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        let relation = state.relation();
        let kind = state.distance_kind();
        for i in 0..state.n() {
            let x = relation.get(i);
            let (mut min1, mut min2) = (f64::INFINITY, f64::INFINITY);
            let (mut best, mut second) = (0, 0);
            for j in 0..state.k() {
                let dist = state.distance(x, &state.means[j]);
                if dist < min1 {
                    (min2, second) = (min1, best);
                    (min1, best) = (dist, j);
                } else if dist < min2 {
                    (min2, second) = (dist, j);
                }
            }
            state.assign(i, best);
            self.upper[i] = kind.to_metric(min1);
            self.lower[i] = kind.to_metric(min2);
            self.second[i] = second as u32;
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
        state.recompute_separation_with(&mut self.sep, &mut self.cdist);
        nearest_means(&self.cdist, &mut self.cnum);
        let relation = state.relation();
        let mut changed = 0;
        for i in 0..state.n() {
            let cur = state.assignment[i] as usize;
            let z = self.lower[i].max(self.sep[cur]);
            if self.upper[i] < z {
                continue;
            }
            let x = relation.get(i);
            let u = state.sqrt_distance(x, &state.means[cur]);
            self.upper[i] = u;
            if u < z {
                continue;
            }
            let sp = self.second[i] as usize;
            let sd = state.sqrt_distance(x, &state.means[sp]);
            let (mut min1, mut best, mut min2, mut second) = if nearer(sd, sp, u, cur) {
                (sd, sp, u, cur)
            } else {
                (u, cur, sd, sp)
            };
            // A mean c can enter the top two only if cdist[center][c] <= (dc + min2) / 2.
            let (center, dc) = (best, min1);
            for &c in self.cnum[center].iter() {
                let c = c as usize;
                if self.cdist[center][c] > 0.5 * (dc + min2) {
                    break;
                }
                if c == cur || c == sp {
                    continue;
                }
                let dist = state.sqrt_distance(x, &state.means[c]);
                if nearer(dist, c, min1, best) {
                    (min2, second) = (min1, best);
                    (min1, best) = (dist, c);
                } else if nearer(dist, c, min2, second) {
                    (min2, second) = (dist, c);
                }
            }
            self.lower[i] = min2;
            self.second[i] = second as u32;
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
        let relation = blobs(&mut rng, 600, 4, 12);
        let means = pick_means(&mut rng, &relation, 12);
        for kind in [DistanceKind::SquaredEuclidean, DistanceKind::Maximum] {
            assert_matches_lloyd(&relation, &means, kind, &mut Shallot::new(600, 12));
        }
    }

    #[test]
    fn bounds_stay_sound() {
        let mut rng = StdRng::seed_from_u64(7);
        let relation = blobs(&mut rng, 300, 3, 8);
        let means = pick_means(&mut rng, &relation, 8);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let mut shallot = Shallot::new(300, 8);
        KMeans::initial_assign(&mut shallot, &mut state);
        for _ in 0..15 {
            KMeans::update(&mut shallot, &mut state);
            for i in 0..state.n() {
                let x = state.relation().get(i);
                let a = state.assignment()[i] as usize;
                assert_ne!(shallot.second[i], a as u32);
                for j in 0..state.k() {
                    let dist = DistanceKind::Euclidean.distance(x, &state.means()[j]);
                    if j == a {
                        assert!(dist <= shallot.upper[i] + 1e-9);
                    } else {
                        assert!(dist >= shallot.lower[i] - 1e-9);
                    }
                }
            }
            if KMeans::assign(&mut shallot, &mut state) == 0 {
                break;
            }
        }
    }
}
