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

/// Hamerly bounds, with candidates drawn from a ball around the current mean.
///
/// Half center distances are sorted per mean, and a candidate `c` is only
/// considered while `cdist[cur][c] <= upper + sep[cur]`.
pub struct Exponion {
    upper: Vec<f64>,
    lower: Vec<f64>,
    sep: Vec<f64>,
    cdist: Square,
    cnum: Vec<Vec<u32>>,
}

impl Exponion {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            upper: vec![f64::INFINITY; n],
            lower: vec![0.0; n],
            sep: vec![0.0; k],
            cdist: Square::from_zeros(k, k),
            cnum: Vec::new(),
        }
    }
}

impl<R: Relation> KMeans<R> for Exponion {
    fn name(&self) -> &'static str {
        "exponion"
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        let relation = state.relation();
        let kind = state.distance_kind();
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
        state.recompute_separation_with(&mut self.sep, &mut self.cdist);
        nearest_means(&self.cdist, &mut self.cnum);
        let relation = state.relation();
        let mut changed = 0;
        for i in 0..state.n() {
            let cur = state.assignment[i] as usize;
            let sa = self.sep[cur];
            let z = self.lower[i].max(sa);
            if self.upper[i] < z {
                continue;
            }
            let x = relation.get(i);
            let u = state.sqrt_distance(x, &state.means[cur]);
            self.upper[i] = u;
            if u < z {
                continue;
            }
            let r = u + sa;
            let (mut min1, mut min2, mut best) = (u, f64::INFINITY, cur);
            for &c in self.cnum[cur].iter() {
                let c = c as usize;
                if self.cdist[cur][c] > r {
                    break;
                }
                let dist = state.sqrt_distance(x, &state.means[c]);
                if nearer(dist, c, min1, best) {
                    min2 = min1;
                    min1 = dist;
                    best = c;
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
