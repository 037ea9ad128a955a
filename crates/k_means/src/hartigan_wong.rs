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

//! Hartigan-Wong k-means (Applied Statistics algorithm AS 136).
//!
//! Points are moved one at a time whenever doing so lowers the total sum of
//! squares, alternating an optimal-transfer pass over all live clusters with
//! a quick-transfer pass that only looks at each point's second-best cluster.

use crate::KMeans;
use crate::state::ClusterState;
use distance::DistanceKind;
use vector::{PointRef, Relation};

pub struct HartiganWong {
    /// Second-best cluster of every point.
    ic2: Vec<u32>,
    /// Cost of removing every point from its cluster.
    d: Vec<f64>,
    /// `n / (n - 1)` per cluster, infinite for singletons.
    an1: Vec<f64>,
    /// `n / (n + 1)` per cluster.
    an2: Vec<f64>,
    itran: Vec<bool>,
    /// Step at which a cluster was last updated; `0` not updated, `-1` never visited.
    ncp: Vec<i64>,
    live: Vec<i64>,
    indx: usize,
    done: bool,
}

impl HartiganWong {
    const QUICK_TRANSFER_STEPS: usize = 50;

    pub fn new(n: usize, k: usize) -> Self {
        Self {
            ic2: vec![0; n],
            d: vec![0.0; n],
            an1: vec![0.0; k],
            an2: vec![0.0; k],
            itran: vec![true; k],
            ncp: vec![-1; k],
            live: vec![0; k],
            indx: 0,
            done: false,
        }
    }

    fn transfer<R: Relation>(
        &mut self,
        state: &mut ClusterState<'_, R>,
        i: usize,
        l1: usize,
        l2: usize,
    ) {
        state.assign(i, l2);
        state.refresh_mean(l1);
        state.refresh_mean(l2);
        let n1 = state.cluster_size(l1) as f64;
        let n2 = state.cluster_size(l2) as f64;
        self.an2[l1] = n1 / (n1 + 1.0);
        self.an1[l1] = if n1 > 1.0 { n1 / (n1 - 1.0) } else { f64::INFINITY };
        self.an1[l2] = n2 / (n2 - 1.0);
        self.an2[l2] = n2 / (n2 + 1.0);
        self.ic2[i] = l1 as u32;
    }

    fn optimal_transfer<R: Relation>(&mut self, state: &mut ClusterState<'_, R>) -> usize {
        let (n, k) = (state.n(), state.k());
        let relation = state.relation();
        for l in 0..k {
            if self.itran[l] {
                self.live[l] = n as i64 + 1;
            }
        }
        let mut transfers = 0;
        for i in 0..n {
            let step = i as i64 + 1;
            self.indx += 1;
            let l1 = state.assignment[i] as usize;
            if state.cluster_size(l1) != 1 {
                let x = relation.get(i);
                if self.ncp[l1] != 0 {
                    self.d[i] = d2(state, x, l1) * self.an1[l1];
                }
                let ll = self.ic2[i] as usize;
                let mut l2 = ll;
                let mut r2 = d2(state, x, ll) * self.an2[ll];
                for l in 0..k {
                    // Outside the live set of l1, only live clusters can take the point.
                    if (step >= self.live[l1] && step >= self.live[l]) || l == l1 || l == ll {
                        continue;
                    }
                    let dc = d2(state, x, l);
                    if dc < r2 / self.an2[l] {
                        r2 = dc * self.an2[l];
                        l2 = l;
                    }
                }
                if r2 >= self.d[i] {
                    self.ic2[i] = l2 as u32;
                } else {
                    self.indx = 0;
                    self.live[l1] = n as i64 + step;
                    self.live[l2] = n as i64 + step;
                    self.ncp[l1] = step;
                    self.ncp[l2] = step;
                    self.transfer(state, i, l1, l2);
                    transfers += 1;
                }
            }
            if self.indx == n {
                return transfers;
            }
        }
        for l in 0..k {
            self.itran[l] = false;
            self.live[l] -= n as i64;
        }
        transfers
    }

    fn quick_transfer<R: Relation>(&mut self, state: &mut ClusterState<'_, R>) -> usize {
        let n = state.n();
        let relation = state.relation();
        let guard = Self::QUICK_TRANSFER_STEPS * n;
        let mut transfers = 0;
        let mut icoun = 0;
        let mut istep = 0i64;
        loop {
            for i in 0..n {
                icoun += 1;
                istep += 1;
                if istep as usize >= guard {
                    log::warn!("Hartigan-Wong quick transfer stopped after {guard} steps");
                    self.done = true;
                    return transfers;
                }
                let l1 = state.assignment[i] as usize;
                let l2 = self.ic2[i] as usize;
                if state.cluster_size(l1) != 1 {
                    let x = relation.get(i);
                    // A cluster updated exactly n steps ago still needs the distance.
                    if istep <= self.ncp[l1] {
                        self.d[i] = d2(state, x, l1) * self.an1[l1];
                    }
                    if istep < self.ncp[l1] || istep < self.ncp[l2] {
                        let r2 = self.d[i] / self.an2[l2];
                        let dd = d2(state, x, l2);
                        if dd < r2 {
                            icoun = 0;
                            self.indx = 0;
                            self.itran[l1] = true;
                            self.itran[l2] = true;
                            self.ncp[l1] = istep + n as i64;
                            self.ncp[l2] = istep + n as i64;
                            self.transfer(state, i, l1, l2);
                            transfers += 1;
                        }
                    }
                }
                if icoun == n {
                    return transfers;
                }
            }
        }
    }
}

#[inline]
fn d2<R: Relation>(state: &ClusterState<'_, R>, x: PointRef<'_>, l: usize) -> f64 {
    state.count(1);
    DistanceKind::SquaredEuclidean.distance(x, &state.means[l])
}

impl<R: Relation> KMeans<R> for HartiganWong {
    fn name(&self) -> &'static str {
        "hartigan-wong"
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        let relation = state.relation();
        for i in 0..state.n() {
            let x = relation.get(i);
            let (mut min1, mut min2) = (f64::INFINITY, f64::INFINITY);
            let (mut best, mut second) = (0, 0);
            for l in 0..state.k() {
                let dist = d2(state, x, l);
                if dist < min1 {
                    (min2, second) = (min1, best);
                    (min1, best) = (dist, l);
                } else if dist < min2 {
                    (min2, second) = (dist, l);
                }
            }
            state.assign(i, best);
            self.ic2[i] = second as u32;
        }
        state.update_means();
        for l in 0..state.k() {
            let size = state.cluster_size(l) as f64;
            self.an2[l] = size / (size + 1.0);
            self.an1[l] = if size > 1.0 { size / (size - 1.0) } else { f64::INFINITY };
        }
        state.n() as isize
    }

    /// Means move with every transfer, so there is nothing to install here.
    fn update(&mut self, _: &mut ClusterState<'_, R>) {}

    fn assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        if self.done || state.k() == 1 {
            return 0;
        }
        let mut transfers = self.optimal_transfer(state);
        if self.indx == state.n() {
            self.done = true;
            return transfers as isize;
        }
        transfers += self.quick_transfer(state);
        if state.k() == 2 {
            self.done = true;
        }
        self.ncp.fill(0);
        transfers as isize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use vector::{Floating, Square};

    fn sum_of_squares<R: Relation>(state: &ClusterState<'_, R>) -> f64 {
        (0..state.n())
            .map(|i| {
                let a = state.assignment()[i] as usize;
                let x = state.relation().get(i);
                DistanceKind::SquaredEuclidean.distance(x, &state.means()[a])
            })
            .sum()
    }

    #[test]
    fn no_single_transfer_improves() {
        let mut rng = StdRng::seed_from_u64(7);
        let relation = blobs(&mut rng, 400, 3, 6);
        let means = pick_means(&mut rng, &relation, 6);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let mut hartigan_wong = HartiganWong::new(400, 6);
        KMeans::initial_assign(&mut hartigan_wong, &mut state);
        let before = sum_of_squares(&state);
        let outcome = crate::run(&mut state, &mut hartigan_wong, 0, |_| ());
        assert!(outcome.converged);
        assert_sums_consistent(&state);
        assert!(sum_of_squares(&state) <= before + 1e-9);
        for j in 0..6 {
            let size = state.cluster_size(j);
            if size == 0 {
                continue;
            }
            let mut mean = state.sums()[j].to_vec();
            f64::vector_mul_scalar_inplace(&mut mean, 1.0 / size as f64);
            for (x, y) in mean.iter().zip(state.means()[j].iter()) {
                assert!((x - y).abs() < 1e-9);
            }
        }
        for i in 0..state.n() {
            let x = state.relation().get(i);
            let l1 = state.assignment()[i] as usize;
            let n1 = state.cluster_size(l1) as f64;
            if n1 <= 1.0 {
                continue;
            }
            let kind = DistanceKind::SquaredEuclidean;
            let leave = kind.distance(x, &state.means()[l1]) * n1 / (n1 - 1.0);
            for l in 0..6 {
                if l == l1 {
                    continue;
                }
                let nl = state.cluster_size(l) as f64;
                let join = kind.distance(x, &state.means()[l]) * nl / (nl + 1.0);
                assert!(join >= leave - 1e-9, "point {i} should move to {l}");
            }
        }
    }

    #[test]
    fn singleton_is_never_moved() {
        let relation = Square::from_rows(1, [[0.0], [10.0], [11.0], [12.0]]);
        let means = Square::from_rows(1, [[0.0], [11.0]]);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let outcome = crate::run(&mut state, &mut HartiganWong::new(4, 2), 0, |_| ());
        assert!(outcome.converged);
        assert_eq!(state.assignment(), &[0, 1, 1, 1]);
        assert_eq!(&state.means()[0], &[0.0]);
        assert_eq!(&state.means()[1], &[11.0]);
    }

    #[test]
    fn moves_what_lloyd_keeps() {
        // 2.0 is nearer to mean 1.0 than to 3.9, but moving it lowers the sum of squares.
        let relation = Square::from_rows(1, [[0.0], [2.0], [3.9]]);
        let means = Square::from_rows(1, [[1.0], [3.9]]);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means.clone());
        crate::run(&mut state, &mut crate::lloyd::Lloyd, 0, |_| ());
        assert_eq!(state.assignment(), &[0, 0, 1]);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let outcome = crate::run(&mut state, &mut HartiganWong::new(3, 2), 0, |_| ());
        assert!(outcome.converged);
        assert_eq!(state.assignment(), &[0, 1, 1]);
        assert!((state.means()[1][0] - 2.95).abs() < 1e-12);
    }

    #[test]
    fn single_cluster() {
        let relation = Square::from_rows(2, [[0.0, 0.0], [2.0, 4.0]]);
        let means = Square::from_rows(2, [[9.0, 9.0]]);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let outcome = crate::run(&mut state, &mut HartiganWong::new(2, 1), 0, |_| ());
        assert_eq!(outcome.iterations, 2);
        assert_eq!(&state.means()[0], &[1.0, 2.0]);
    }
}
