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
use distance::Distance;
use vector::{PointRef, Relation};

/// Hamerly bounds plus a norm annulus: a mean can only beat the current one
/// if its norm lies within `r` of the point's norm.
pub struct Annulus {
    upper: Vec<f64>,
    lower: Vec<f64>,
    second: Vec<u32>,
    sep: Vec<f64>,
    cnorm: Vec<f64>,
    corder: Vec<u32>,
}

impl Annulus {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            upper: vec![f64::INFINITY; n],
            lower: vec![0.0; n],
            second: vec![0; n],
            sep: vec![0.0; k],
            cnorm: vec![0.0; k],
            corder: (0..k as u32).collect(),
        }
    }

    fn order_means<R: Relation>(&mut self, state: &ClusterState<'_, R>) {
        let kind = state.distance_kind();
        let norms = (0..state.k())
            .map(|j| kind.norm(PointRef::Dense(&state.means[j])))
            .collect::<Vec<_>>();
        self.corder.sort_by_key(|&j| Distance::from_f64(norms[j as usize]));
        for (p, &j) in self.corder.iter().enumerate() {
            self.cnorm[p] = norms[j as usize];
        }
    }
}

impl<R: Relation> KMeans<R> for Annulus {
    fn name(&self) -> &'static str {
        "annulus"
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
        state.recompute_separation(&mut self.sep);
        self.order_means(state);
        let relation = state.relation();
        let kind = state.distance_kind();
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
            let r = u.max(sd);
            let (mut min1, mut best, mut min2, mut second) = if nearer(sd, sp, u, cur) {
                (sd, sp, u, cur)
            } else {
                (u, cur, sd, sp)
            };
            let xn = kind.norm(x);
            let start = self.cnorm.partition_point(|&norm| norm < xn - r);
            for p in start..self.cnorm.len() {
                if self.cnorm[p] > xn + r {
                    break;
                }
                let c = self.corder[p] as usize;
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
