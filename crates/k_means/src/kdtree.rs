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

//! k-means over a k-d-tree of the points: whole subtrees are assigned at once
//! when every candidate mean but one can be ruled out for the node's box.

use crate::KMeans;
use crate::state::{ClusterState, nearer};
use distance::Distance;
use serde::{Deserialize, Serialize};
use vector::{Floating, Relation};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    /// Halve the widest dimension.
    #[default]
    Midpoint,
    /// Midpoint, falling back to a quantile when one side holds less than 1/8.
    BoundedMidpoint,
    /// Median of the widest dimension.
    Median,
    /// The position minimizing the sum of squares of both halves, over all dimensions.
    Ssq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Drop means whose minimum distance to the box exceeds the smallest maximum distance.
    Pruning,
    /// Drop means dominated by the mean nearest to the box midpoint.
    Filtering,
}

#[derive(Debug, Clone)]
pub struct KdNode {
    pub sum: Vec<f64>,
    pub mid: Vec<f64>,
    pub halfwidth: Vec<f64>,
    pub children: Option<(u32, u32)>,
    pub start: usize,
    pub end: usize,
}

impl KdNode {
    fn new<R: Relation>(relation: &R, ids: &[u32], start: usize, end: usize) -> Self {
        let d = relation.dims();
        let mut sum = vec![0.0; d];
        let mut min = vec![f64::INFINITY; d];
        let mut max = vec![f64::NEG_INFINITY; d];
        for &i in ids {
            let x = relation.get(i as usize);
            x.add_to(&mut sum);
            let row = x.to_dense();
            for j in 0..d {
                min[j] = min[j].min(row[j]);
                max[j] = max[j].max(row[j]);
            }
        }
        let mid = (0..d).map(|j| 0.5 * (max[j] + min[j])).collect();
        let halfwidth = (0..d).map(|j| 0.5 * (max[j] - min[j])).collect();
        Self {
            sum,
            mid,
            halfwidth,
            children: None,
            start,
            end,
        }
    }
}

/// Arena of nodes; node `0` is the root, `sorted[start..end]` are a node's points.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    sorted: Vec<u32>,
}

impl KdTree {
    pub fn build<R: Relation>(relation: &R, split: Split, leaf_size: usize) -> Self {
        assert!(leaf_size >= 1, "leaf size must be positive");
        let n = relation.len();
        let mut tree = Self {
            nodes: Vec::new(),
            sorted: (0..n as u32).collect(),
        };
        if n > 0 {
            tree.build_node(relation, split, leaf_size, 0, n);
        }
        tree
    }

    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    pub fn points(&self, node: &KdNode) -> &[u32] {
        &self.sorted[node.start..node.end]
    }

    fn build_node<R: Relation>(
        &mut self,
        relation: &R,
        split: Split,
        leaf_size: usize,
        left: usize,
        right: usize,
    ) -> u32 {
        let id = self.nodes.len();
        let node = KdNode::new(relation, &self.sorted[left..right], left, right);
        self.nodes.push(node);
        if right - left <= leaf_size {
            return id as u32;
        }
        let middle = match split {
            Split::Midpoint => self.split_midpoint(relation, id, left, right, false),
            Split::BoundedMidpoint => self.split_midpoint(relation, id, left, right, true),
            Split::Median => self.split_median(relation, id, left, right),
            Split::Ssq => self.split_ssq(relation, id, left, right),
        };
        // Only duplicates left.
        let Some(middle) = middle else {
            return id as u32;
        };
        debug_assert!(left < middle && middle < right);
        let l = self.build_node(relation, split, leaf_size, left, middle);
        let r = self.build_node(relation, split, leaf_size, middle, right);
        self.nodes[id].children = Some((l, r));
        id as u32
    }

    fn split_midpoint<R: Relation>(
        &mut self,
        relation: &R,
        id: usize,
        left: usize,
        right: usize,
        bounded: bool,
    ) -> Option<usize> {
        let dim = argmax(&self.nodes[id].halfwidth);
        let mid = self.nodes[id].mid[dim];
        let value = |i: u32| relation.get(i as usize).value(dim);
        let sorted = &mut self.sorted;
        let (mut l, mut r) = (left as isize, right as isize - 1);
        loop {
            while l <= r && value(sorted[l as usize]) <= mid {
                l += 1;
            }
            while l <= r && value(sorted[r as usize]) >= mid {
                r -= 1;
            }
            if l >= r {
                break;
            }
            sorted.swap(l as usize, r as usize);
            l += 1;
            r -= 1;
        }
        let mut r = (r + 1) as usize;
        if r == right {
            return None;
        }
        if bounded {
            let q = (right - left) >> 3;
            if left + q > r {
                select(relation, &mut sorted[r..right], left + q - r, dim);
                r = left + q;
            } else if right - q < r {
                select(relation, &mut sorted[left..r], right - q - left, dim);
                r = right - q;
            }
        }
        Some(r)
    }

    fn split_median<R: Relation>(
        &mut self,
        relation: &R,
        id: usize,
        left: usize,
        right: usize,
    ) -> Option<usize> {
        let dim = argmax(&self.nodes[id].halfwidth);
        if self.nodes[id].halfwidth[dim] <= 0.0 {
            return None;
        }
        let middle = (left + right) >> 1;
        select(relation, &mut self.sorted[left..right], middle - left, dim);
        Some(middle)
    }

    fn split_ssq<R: Relation>(
        &mut self,
        relation: &R,
        id: usize,
        left: usize,
        right: usize,
    ) -> Option<usize> {
        let len = right - left;
        let dims = relation.dims();
        let sum = &self.nodes[id].sum;
        let sorted = &mut self.sorted[left..right];
        let (mut bestdim, mut bestpos, mut bestscore) = (0, len >> 1, f64::NEG_INFINITY);
        for dim in 0..dims {
            sorted.sort_by_key(|&i| Distance::from_f64(relation.get(i as usize).value(dim)));
            // Minimizing both sums of squares maximizes i·j·|s1/i - s2/j|².
            let mut s1 = vec![0.0; dims];
            let mut s2 = sum.clone();
            for i in 1..len {
                let x = relation.get(sorted[i - 1] as usize);
                x.add_to(&mut s1);
                x.sub_from(&mut s2);
                let j = len - i;
                let mut score = 0.0;
                for d in 0..dims {
                    let v = s1[d] / i as f64 - s2[d] / j as f64;
                    score += v * v;
                }
                let score = score * i as f64 * j as f64;
                if score > bestscore {
                    bestscore = score;
                    bestdim = dim;
                    bestpos = i;
                }
            }
        }
        if bestscore <= 0.0 {
            return None;
        }
        select(relation, sorted, bestpos, bestdim);
        Some(left + bestpos)
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for i in 1..values.len() {
        if values[i] > values[best] {
            best = i;
        }
    }
    best
}

fn select<R: Relation>(relation: &R, ids: &mut [u32], nth: usize, dim: usize) {
    ids.select_nth_unstable_by_key(nth, |&i| {
        Distance::from_f64(relation.get(i as usize).value(dim))
    });
}

pub struct KdTreeKMeans {
    filter: Filter,
    tree: KdTree,
    indices: Vec<u32>,
}

impl KdTreeKMeans {
    pub fn new<R: Relation>(
        relation: &R,
        k: usize,
        filter: Filter,
        split: Split,
        leaf_size: usize,
    ) -> Self {
        let tree = KdTree::build(relation, split, leaf_size);
        log::debug!(
            "k-d-tree with {} nodes, {split:?} split, leaf size {leaf_size}",
            tree.nodes.len()
        );
        Self {
            filter,
            tree,
            indices: (0..k as u32).collect(),
        }
    }

    fn pass<R: Relation>(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        state.sums.fill(0.0);
        if self.tree.nodes.is_empty() {
            return 0;
        }
        let alive = self.indices.len();
        traversal(&self.tree, self.filter, &mut self.indices, state, 0, alive) as isize
    }
}

impl<R: Relation> KMeans<R> for KdTreeKMeans {
    fn name(&self) -> &'static str {
        match self.filter {
            Filter::Pruning => "kd-tree-pruning",
            Filter::Filtering => "kd-tree-filtering",
        }
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        self.pass(state)
    }

    fn assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        self.pass(state)
    }
}

/// Candidates alive at a node are `indices[..alive]`.
fn traversal<R: Relation>(
    tree: &KdTree,
    filter: Filter,
    indices: &mut [u32],
    state: &mut ClusterState<'_, R>,
    node: usize,
    alive: usize,
) -> usize {
    let u = &tree.nodes[node];
    let alive = match filter {
        Filter::Pruning => prune(u, indices, alive, state),
        Filter::Filtering => dominate(u, indices, alive, state),
    };
    if alive == 1 {
        return label_subtree(tree, u, indices[0] as usize, state);
    }
    match u.children {
        None => traverse_leaf(tree, u, &indices[..alive], state),
        Some((l, r)) => {
            traversal(tree, filter, indices, state, l as usize, alive)
                + traversal(tree, filter, indices, state, r as usize, alive)
        }
    }
}

fn prune<R: Relation>(
    u: &KdNode,
    indices: &mut [u32],
    mut alive: usize,
    state: &ClusterState<'_, R>,
) -> usize {
    let means = &state.means;
    let mut minmaxdist = f64::INFINITY;
    for &c in &indices[..alive] {
        let mean = &means[c as usize];
        let mut maxdist = 0.0;
        for d in 0..mean.len() {
            let delta = (mean[d] - u.mid[d]).abs() + u.halfwidth[d];
            maxdist += delta * delta;
        }
        minmaxdist = minmaxdist.min(maxdist);
    }
    state.count(alive as u64);
    let mut i = 0;
    while i < alive {
        let mean = &means[indices[i] as usize];
        let mut mindist = 0.0;
        for d in 0..mean.len() {
            let delta = (mean[d] - u.mid[d]).abs() - u.halfwidth[d];
            if delta > 0.0 {
                mindist += delta * delta;
            }
        }
        state.count(1);
        if mindist > minmaxdist {
            alive -= 1;
            indices.swap(i, alive);
        } else {
            i += 1;
        }
    }
    alive
}

fn dominate<R: Relation>(
    u: &KdNode,
    indices: &mut [u32],
    mut alive: usize,
    state: &ClusterState<'_, R>,
) -> usize {
    let means = &state.means;
    let mut zstar = indices[0] as usize;
    let mut min = f64::INFINITY;
    for &c in &indices[..alive] {
        let dist = f64::reduce_sum_of_d2(&means[c as usize], &u.mid);
        if dist < min {
            min = dist;
            zstar = c as usize;
        }
    }
    state.count(alive as u64);
    let zs = &means[zstar];
    let mut i = 0;
    while i < alive {
        let c = indices[i] as usize;
        if c == zstar {
            i += 1;
            continue;
        }
        // |z - v|² - |z* - v|² at the box vertex v furthest towards z.
        let z = &means[c];
        let mut diff = 0.0;
        for d in 0..z.len() {
            let v = if z[d] > zs[d] {
                u.mid[d] + u.halfwidth[d]
            } else {
                u.mid[d] - u.halfwidth[d]
            };
            diff += (z[d] - zs[d]) * (z[d] + zs[d] - 2.0 * v);
        }
        if diff > 0.0 {
            alive -= 1;
            indices.swap(i, alive);
        } else {
            i += 1;
        }
    }
    alive
}

fn label_subtree<R: Relation>(
    tree: &KdTree,
    u: &KdNode,
    index: usize,
    state: &mut ClusterState<'_, R>,
) -> usize {
    f64::vector_add_inplace(&mut state.sums[index], &u.sum);
    let mut changed = 0;
    for &i in tree.points(u) {
        if state.relabel(i as usize, index) {
            changed += 1;
        }
    }
    changed
}

fn traverse_leaf<R: Relation>(
    tree: &KdTree,
    u: &KdNode,
    candidates: &[u32],
    state: &mut ClusterState<'_, R>,
) -> usize {
    let relation = state.relation();
    let mut changed = 0;
    for &i in tree.points(u) {
        let x = relation.get(i as usize);
        let mut best = candidates[0] as usize;
        let mut min = f64::INFINITY;
        for &c in candidates {
            let dist = state.distance(x, &state.means[c as usize]);
            if nearer(dist, c as usize, min, best) {
                best = c as usize;
                min = dist;
            }
        }
        x.add_to(&mut state.sums[best]);
        if state.relabel(i as usize, best) {
            changed += 1;
        }
    }
    changed
}
