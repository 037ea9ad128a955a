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
use crate::state::{ClusterState, UNASSIGNED, nearer, nearest_means};
use vector::{Relation, Square};

/// Skips mean `j` whenever `d(cur, j) > 2 d(x, cur)`, with no per-point bounds.
///
/// The sorted flavor walks each mean's neighbors in ascending order and
/// stops at the first one past the threshold.
pub struct Compare {
    sorted: bool,
    cdist: Square,
    cnum: Vec<Vec<u32>>,
}

impl Compare {
    pub fn new(k: usize) -> Self {
        Self {
            sorted: false,
            cdist: Square::from_zeros(k, k),
            cnum: Vec::new(),
        }
    }

    pub fn sorted(k: usize) -> Self {
        Self {
            sorted: true,
            ..Self::new(k)
        }
    }

    fn recompute_center_distances<R: Relation>(&mut self, state: &ClusterState<'_, R>) {
        let k = state.k();
        for i in 0..k {
            self.cdist[i][i] = 0.0;
            for j in 0..i {
                let dist = state.mean_distance(&state.means[i], &state.means[j]);
                self.cdist[i][j] = dist;
                self.cdist[j][i] = dist;
            }
        }
        if self.sorted {
            nearest_means(&self.cdist, &mut self.cnum);
        }
    }
}

impl<R: Relation> KMeans<R> for Compare {
    fn name(&self) -> &'static str {
        if self.sorted { "sort" } else { "compare" }
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        self.assign(state);
        state.n() as isize
    }

    fn assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        self.recompute_center_distances(state);
        // Raw distances: on the squared scale the threshold 2d becomes 4d.
        let mult = if state.distance_kind().is_squared() { 4.0 } else { 2.0 };
        let relation = state.relation();
        let mut changed = 0;
        for i in 0..state.n() {
            let x = relation.get(i);
            let cur = match state.assignment[i] {
                UNASSIGNED => 0,
                a => a as usize,
            };
            let mut mindist = state.distance(x, &state.means[cur]);
            let thresh = mult * mindist;
            let mut best = cur;
            if self.sorted {
                for &j in self.cnum[cur].iter() {
                    let j = j as usize;
                    if self.cdist[cur][j] > thresh {
                        break;
                    }
                    let dist = state.distance(x, &state.means[j]);
                    if nearer(dist, j, mindist, best) {
                        best = j;
                        mindist = dist;
                    }
                }
            } else {
                for j in 0..state.k() {
                    if j == cur || self.cdist[cur][j] > thresh {
                        continue;
                    }
                    let dist = state.distance(x, &state.means[j]);
                    if nearer(dist, j, mindist, best) {
                        best = j;
                        mindist = dist;
                    }
                }
            }
            if state.assign(i, best) {
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
        let relation = blobs(&mut rng, 500, 3, 8);
        let means = pick_means(&mut rng, &relation, 8);
        for kind in [DistanceKind::SquaredEuclidean, DistanceKind::Manhattan] {
            assert_matches_lloyd(&relation, &means, kind, &mut Compare::new(8));
            assert_matches_lloyd(&relation, &means, kind, &mut Compare::sorted(8));
        }
    }

    #[test]
    fn far_means_are_skipped() {
        let relation = Square::from_rows(1, [[0.0], [1.0]]);
        let means = Square::from_rows(1, [[0.0], [1000.0], [2000.0]]);
        let mut state = ClusterState::new(&relation, DistanceKind::SquaredEuclidean, means);
        let mut compare = Compare::sorted(3);
        KMeans::initial_assign(&mut compare, &mut state);
        // Three center pairs, then one distance per point.
        assert_eq!(state.distance_computations(), 3 + 2);
        assert_eq!(state.assignment(), &[0, 0]);
    }
}
