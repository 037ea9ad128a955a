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
use vector::{Floating, Relation, Square};

/// Yinyang k-means: means are grouped once, each point keeps one upper bound
/// and one lower bound per group.
pub struct YinYang {
    t: usize,
    groups: Vec<Vec<u32>>,
    glabel: Vec<u32>,
    cdrift: Vec<f64>,
    gdrift: Vec<f64>,
    upper: Vec<f64>,
    lower: Vec<f64>,
    prevlb: Vec<f64>,
    folded: Vec<f64>,
}

impl YinYang {
    const GROUP_ITERATIONS: usize = 5;

    pub fn new(n: usize, k: usize, t: Option<usize>) -> Self {
        let t = t.unwrap_or_else(|| Self::default_groups(k)).clamp(1, k.max(1));
        Self {
            t,
            groups: Vec::new(),
            glabel: vec![0; k],
            cdrift: vec![0.0; k],
            gdrift: vec![0.0; t],
            upper: vec![f64::INFINITY; n],
            lower: vec![0.0; n * t],
            prevlb: vec![0.0; t],
            folded: vec![0.0; t],
        }
    }

    pub fn default_groups(k: usize) -> usize {
        if k > 10 {
            k / 10
        } else if k > 1 {
            k / 2
        } else {
            1
        }
    }

    /// Clusters the means themselves into `t` groups.
    fn group_means<R: Relation>(&mut self, state: &ClusterState<'_, R>) {
        let (k, t, d) = (state.k(), self.t, state.d());
        let means = &state.means;
        if t == 1 {
            self.glabel.fill(0);
            self.groups = vec![(0..k as u32).collect()];
            return;
        }
        let mut centers = Square::from_rows(d, (0..t).map(|g| &means[g]));
        for i in 0..k {
            self.glabel[i] = if i < t {
                i as u32
            } else {
                nearest_center(state, &centers, &means[i], None) as u32
            };
        }
        for _ in 0..Self::GROUP_ITERATIONS {
            move_group_centers(&mut centers, means, &self.glabel);
            let mut changed = false;
            for i in 0..k {
                let prev = self.glabel[i] as usize;
                let g = nearest_center(state, &centers, &means[i], Some(prev));
                if g != prev {
                    self.glabel[i] = g as u32;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        self.groups = vec![Vec::new(); t];
        for i in 0..k {
            self.groups[self.glabel[i] as usize].push(i as u32);
        }
    }

    #[cfg(test)]
    pub(crate) fn bounds(&self) -> (&[f64], &[f64], &[u32]) {
        (&self.upper, &self.lower, &self.glabel)
    }
}

/// Moves every group center to the mean of its members; a group without members stays put.
fn move_group_centers(centers: &mut Square, means: &Square, glabel: &[u32]) {
    let mut sums = Square::from_zeros(centers.d(), centers.len());
    let mut weights = vec![0usize; centers.len()];
    for (i, &g) in glabel.iter().enumerate() {
        f64::vector_add_inplace(&mut sums[g as usize], &means[i]);
        weights[g as usize] += 1;
    }
    for g in 0..centers.len() {
        if weights[g] > 0 {
            centers[g].copy_from_slice(&sums[g]);
            f64::vector_mul_scalar_inplace(&mut centers[g], 1.0 / weights[g] as f64);
        }
    }
}

/// Nearest row of `centers`, keeping `prev` on ties.
fn nearest_center<R: Relation>(
    state: &ClusterState<'_, R>,
    centers: &Square,
    mean: &[f64],
    prev: Option<usize>,
) -> usize {
    let mut best = prev.unwrap_or(0);
    let mut min = state.mean_distance(mean, &centers[best]);
    for g in 0..centers.len() {
        if g == best {
            continue;
        }
        let dist = state.mean_distance(mean, &centers[g]);
        if dist < min {
            best = g;
            min = dist;
        }
    }
    best
}

impl<R: Relation> KMeans<R> for YinYang {
    fn name(&self) -> &'static str {
        "yinyang"
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        self.group_means(state);
        let relation = state.relation();
        let t = self.t;
        let mut best_of = vec![(f64::INFINITY, f64::INFINITY, 0usize); t];
        for i in 0..state.n() {
            let x = relation.get(i);
            for (g, group) in self.groups.iter().enumerate() {
                let (mut min1, mut min2, mut best) = (f64::INFINITY, f64::INFINITY, 0);
                for &c in group.iter() {
                    let dist = state.sqrt_distance(x, &state.means[c as usize]);
                    if dist < min1 {
                        min2 = min1;
                        min1 = dist;
                        best = c as usize;
                    } else if dist < min2 {
                        min2 = dist;
                    }
                }
                best_of[g] = (min1, min2, best);
            }
            let mut gbest = 0;
            for g in 1..t {
                let (min, _, best) = best_of[gbest];
                if nearer(best_of[g].0, best_of[g].2, min, best) {
                    gbest = g;
                }
            }
            let lower = &mut self.lower[i * t..][..t];
            for g in 0..t {
                lower[g] = if g == gbest { best_of[g].1 } else { best_of[g].0 };
            }
            self.upper[i] = best_of[gbest].0;
            state.assign(i, best_of[gbest].2);
        }
        state.n() as isize
    }

    fn update(&mut self, state: &mut ClusterState<'_, R>) {
        let previous = state.update_means();
        self.cdrift = state.moved_distances(&previous);
        self.gdrift.fill(0.0);
        for (i, &drift) in self.cdrift.iter().enumerate() {
            let g = self.glabel[i] as usize;
            self.gdrift[g] = self.gdrift[g].max(drift);
        }
    }

    fn assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        let relation = state.relation();
        let t = self.t;
        let mut changed = 0;
        for i in 0..state.n() {
            let prev = state.assignment[i] as usize;
            let mut ub = self.upper[i] + self.cdrift[prev];
            let lbs = &mut self.lower[i * t..][..t];
            self.prevlb.copy_from_slice(lbs);
            let mut minlb = f64::INFINITY;
            for g in 0..t {
                lbs[g] -= self.gdrift[g];
                minlb = minlb.min(lbs[g]);
            }
            if minlb > ub {
                self.upper[i] = ub;
                continue;
            }
            let x = relation.get(i);
            ub = state.sqrt_distance(x, &state.means[prev]);
            if minlb > ub {
                self.upper[i] = ub;
                continue;
            }
            // Distances of displaced best means, kept as lower bounds of their group.
            self.folded.fill(f64::INFINITY);
            let mut best = prev;
            for g in 0..t {
                if lbs[g] > ub {
                    continue;
                }
                let mut lb = f64::INFINITY;
                for &c in self.groups[g].iter() {
                    let c = c as usize;
                    if c == prev {
                        continue;
                    }
                    let clb = self.prevlb[g] - self.cdrift[c];
                    if clb > ub {
                        lb = lb.min(clb);
                        continue;
                    }
                    let dist = state.sqrt_distance(x, &state.means[c]);
                    if nearer(dist, c, ub, best) {
                        let h = self.glabel[best] as usize;
                        self.folded[h] = self.folded[h].min(ub);
                        best = c;
                        ub = dist;
                    } else {
                        lb = lb.min(dist);
                    }
                }
                lbs[g] = lb;
            }
            for g in 0..t {
                lbs[g] = lbs[g].min(self.folded[g]);
            }
            self.upper[i] = ub;
            if best != prev {
                state.assign(i, best);
                changed += 1;
            }
        }
        changed
    }
}
