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
use crate::state::ClusterState;
use distance::DistanceKind;
use vector::{PointRef, Relation, Square};

/// Brute force: every point against every mean on every pass.
pub struct Lloyd;

impl<R: Relation> KMeans<R> for Lloyd {
    fn name(&self) -> &'static str {
        "lloyd"
    }

    fn initial_assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        state.assign_to_nearest_cluster();
        state.n() as isize
    }

    fn assign(&mut self, state: &mut ClusterState<'_, R>) -> isize {
        state.assign_to_nearest_cluster()
    }
}

pub fn k_means_lookup(vector: PointRef<'_>, centroids: &Square, distance: DistanceKind) -> usize {
    assert_ne!(centroids.len(), 0);
    let mut result = (f64::INFINITY, 0);
    for i in 0..centroids.len() {
        let dis = distance.distance(vector, &centroids[i]);
        if dis < result.0 {
            result = (dis, i);
        }
    }
    result.1
}
