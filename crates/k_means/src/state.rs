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

use distance::{Distance, DistanceKind};
use rayon::prelude::*;
use std::cell::Cell;
use std::collections::HashSet;
use vector::{Floating, PointRef, Relation, Square};

pub const UNASSIGNED: u32 = u32::MAX;

/// Shared model of one run: means, assignment, membership and per-cluster sums.
///
/// Strategies mutate it through [`ClusterState::assign`], which keeps
/// `sums[i]` equal to the sum of the members of cluster `i`.
pub struct ClusterState<'a, R> {
    relation: &'a R,
    distance: DistanceKind,
    k: usize,
    d: usize,
    pub(crate) means: Square,
    pub(crate) assignment: Vec<u32>,
    pub(crate) clusters: Vec<HashSet<u32>>,
    pub(crate) sums: Square,
    pub(crate) varsum: Option<Vec<f64>>,
    diststat: Cell<u64>,
}

impl<'a, R: Relation> ClusterState<'a, R> {
    pub fn new(relation: &'a R, distance: DistanceKind, means: Square) -> Self {
        let k = means.len();
        let d = means.d();
        assert!(k > 0, "no initial means");
        assert_eq!(relation.dims(), d, "dimensionality mismatch");
        Self {
            relation,
            distance,
            k,
            d,
            means,
            assignment: vec![UNASSIGNED; relation.len()],
            clusters: vec![HashSet::new(); k],
            sums: Square::from_zeros(d, k),
            varsum: None,
            diststat: Cell::new(0),
        }
    }

    #[inline(always)]
    pub fn relation(&self) -> &'a R {
        self.relation
    }

    #[inline(always)]
    pub fn distance_kind(&self) -> DistanceKind {
        self.distance
    }

    /// Number of points.
    #[inline(always)]
    pub fn n(&self) -> usize {
        self.assignment.len()
    }

    #[inline(always)]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline(always)]
    pub fn d(&self) -> usize {
        self.d
    }

    pub fn means(&self) -> &Square {
        &self.means
    }

    pub fn sums(&self) -> &Square {
        &self.sums
    }

    pub fn assignment(&self) -> &[u32] {
        &self.assignment
    }

    pub fn cluster_size(&self, i: usize) -> usize {
        self.clusters[i].len()
    }

    pub fn distance_computations(&self) -> u64 {
        self.diststat.get()
    }

    #[inline(always)]
    pub(crate) fn count(&self, computations: u64) {
        self.diststat.set(self.diststat.get() + computations);
    }

    #[inline]
    pub fn distance(&self, x: PointRef<'_>, mean: &[f64]) -> f64 {
        self.count(1);
        self.distance.distance(x, mean)
    }

    /// Distance on the metric scale, the scale bounds are kept on.
    #[inline]
    pub fn sqrt_distance(&self, x: PointRef<'_>, mean: &[f64]) -> f64 {
        self.distance.to_metric(self.distance(x, mean))
    }

    #[inline]
    pub fn mean_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.distance(PointRef::Dense(a), b)
    }

    #[inline]
    pub fn sqrt_mean_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.sqrt_distance(PointRef::Dense(a), b)
    }

    /// Moves point `i` to cluster `to`, returning whether its assignment changed.
    pub fn assign(&mut self, i: usize, to: usize) -> bool {
        let from = self.assignment[i];
        if from == to as u32 {
            return false;
        }
        let relation = self.relation;
        let x = relation.get(i);
        if from != UNASSIGNED {
            self.clusters[from as usize].remove(&(i as u32));
            x.sub_from(&mut self.sums[from as usize]);
        }
        x.add_to(&mut self.sums[to]);
        self.clusters[to].insert(i as u32);
        self.assignment[i] = to as u32;
        true
    }

    /// Like [`Self::assign`] but leaves the sums to the caller.
    pub(crate) fn relabel(&mut self, i: usize, to: usize) -> bool {
        let from = self.assignment[i];
        if from == to as u32 {
            return false;
        }
        if from != UNASSIGNED {
            self.clusters[from as usize].remove(&(i as u32));
        }
        self.clusters[to].insert(i as u32);
        self.assignment[i] = to as u32;
        true
    }

    /// Brute-force nearest-mean pass that also tracks per-cluster sums of squares.
    pub fn assign_to_nearest_cluster(&mut self) -> isize {
        let relation = self.relation;
        let squared = self.distance.is_squared();
        let mut varsum = vec![0.0; self.k];
        let mut changed = 0;
        for i in 0..relation.len() {
            let x = relation.get(i);
            let mut min = f64::INFINITY;
            let mut best = 0;
            for j in 0..self.k {
                let dist = self.distance(x, &self.means[j]);
                if dist < min {
                    best = j;
                    min = dist;
                }
            }
            varsum[best] += if squared { min } else { min * min };
            if self.assign(i, best) {
                changed += 1;
            }
        }
        self.varsum = Some(varsum);
        changed
    }

    /// Installs `sums[i] / size[i]` as the new means, returning the previous ones.
    ///
    /// Means of empty clusters stay where they are.
    pub fn update_means(&mut self) -> Square {
        let mut means = Square::with_capacity(self.d, self.k);
        for i in 0..self.k {
            let size = self.clusters[i].len();
            if size > 0 {
                means.push_slice(&self.sums[i]);
                f64::vector_mul_scalar_inplace(&mut means[i], 1.0 / size as f64);
            } else {
                means.push_slice(&self.means[i]);
            }
        }
        std::mem::replace(&mut self.means, means)
    }

    /// Recomputes a single mean from its sum; used by strategies that move means in place.
    pub(crate) fn refresh_mean(&mut self, i: usize) {
        let size = self.clusters[i].len();
        if size > 0 {
            self.means[i].copy_from_slice(&self.sums[i]);
            f64::vector_mul_scalar_inplace(&mut self.means[i], 1.0 / size as f64);
        }
    }

    /// Metric-scale movement of every mean since `previous`.
    pub fn moved_distances(&self, previous: &Square) -> Vec<f64> {
        (0..self.k)
            .map(|i| self.sqrt_mean_distance(&self.means[i], &previous[i]))
            .collect()
    }

    /// Fills `sep[i]` with half the metric distance from mean `i` to its nearest other mean.
    pub fn recompute_separation(&self, sep: &mut [f64]) {
        sep.fill(f64::INFINITY);
        for i in 1..self.k {
            for j in 0..i {
                let half = 0.5 * self.sqrt_mean_distance(&self.means[i], &self.means[j]);
                sep[i] = sep[i].min(half);
                sep[j] = sep[j].min(half);
            }
        }
    }

    /// Like [`Self::recompute_separation`], also keeping all half distances in `cdist`.
    pub fn recompute_separation_with(&self, sep: &mut [f64], cdist: &mut Square) {
        sep.fill(f64::INFINITY);
        for i in 0..self.k {
            cdist[i][i] = 0.0;
        }
        for i in 1..self.k {
            for j in 0..i {
                let half = 0.5 * self.sqrt_mean_distance(&self.means[i], &self.means[j]);
                cdist[i][j] = half;
                cdist[j][i] = half;
                sep[i] = sep[i].min(half);
                sep[j] = sep[j].min(half);
            }
        }
    }

    /// Exact per-cluster sums of squared distances, computed on `num_threads` threads.
    pub fn exact_variances(
        &self,
        num_threads: usize,
    ) -> Result<Vec<f64>, rayon::ThreadPoolBuildError> {
        let relation = self.relation;
        let distance = self.distance;
        let means = &self.means;
        let members = self.sorted_members();
        let varsum = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_scoped(
                |thread| thread.run(),
                |pool| {
                    pool.install(|| {
                        members
                            .par_iter()
                            .enumerate()
                            .map(|(i, ids)| {
                                let mean = &means[i];
                                ids.iter()
                                    .map(|&id| {
                                        let x = relation.get(id as usize);
                                        let dist = distance.distance(x, mean);
                                        if distance.is_squared() { dist } else { dist * dist }
                                    })
                                    .sum::<f64>()
                            })
                            .collect::<Vec<_>>()
                    })
                },
            )?;
        self.count(self.n() as u64);
        Ok(varsum)
    }

    fn sorted_members(&self) -> Vec<Vec<u32>> {
        self.clusters
            .iter()
            .map(|cluster| {
                let mut ids = cluster.iter().copied().collect::<Vec<_>>();
                ids.sort_unstable();
                ids
            })
            .collect()
    }

    pub fn tracked_variances(&self) -> Option<Vec<f64>> {
        self.varsum.clone()
    }

    /// Consumes the state into the final clustering.
    pub fn into_clustering(self, outcome: Outcome, variances: Option<Vec<f64>>) -> Clustering {
        let members = self.sorted_members();
        let mut clusters = Vec::with_capacity(self.k);
        for (i, ids) in members.into_iter().enumerate() {
            if ids.is_empty() {
                log::warn!("k-means produced an empty cluster - bad initialization?");
            }
            clusters.push(Cluster {
                ids,
                centroid: self.means[i].to_vec(),
                variance: variances.as_ref().map(|v| v[i]),
            });
        }
        Clustering {
            clusters,
            iterations: outcome.iterations,
            converged: outcome.converged,
            distance_computations: self.diststat.get(),
        }
    }
}

/// Whether mean `j` at `dist` beats mean `best` at `min`: nearer, or as near with a lower index.
#[inline(always)]
pub fn nearer(dist: f64, j: usize, min: f64, best: usize) -> bool {
    dist < min || (dist == min && j < best)
}

/// Sorts, for every mean, the other means by ascending `cdist`.
pub fn nearest_means(cdist: &Square, cnum: &mut Vec<Vec<u32>>) {
    let k = cdist.len();
    cnum.resize_with(k, Vec::new);
    for i in 0..k {
        let list = &mut cnum[i];
        list.clear();
        list.extend((0..k as u32).filter(|&j| j as usize != i));
        list.sort_by_key(|&j| Distance::from_f64(cdist[i][j as usize]));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Member point ids, ascending.
    pub ids: Vec<u32>,
    pub centroid: Vec<f64>,
    /// Sum of squared distances of the members to the centroid.
    pub variance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
    pub iterations: usize,
    pub converged: bool,
    pub distance_computations: u64,
}

impl Clustering {
    pub fn centroids(&self) -> Square {
        let d = self.clusters.first().map_or(0, |c| c.centroid.len());
        Square::from_rows(d, self.clusters.iter().map(|c| &c.centroid))
    }

    /// Cluster index of every point.
    pub fn labels(&self, n: usize) -> Vec<u32> {
        let mut labels = vec![UNASSIGNED; n];
        for (i, cluster) in self.clusters.iter().enumerate() {
            for &id in cluster.ids.iter() {
                labels[id as usize] = i as u32;
            }
        }
        labels
    }
}
