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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vector::{Relation, Square};

/// Chooses the `k` initial means of a run.
pub trait Initializer {
    fn initial_means<R: Relation>(&self, relation: &R, k: usize) -> Square;
}

/// `k` distinct points drawn with a seeded generator; uniform noise in
/// `[-1, 1)` fills up when there are fewer than `k` points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomlyChosen {
    pub seed: [u8; 32],
}

impl RandomlyChosen {
    pub fn new(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    pub fn from_u64(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        Self { seed: bytes }
    }
}

impl Initializer for RandomlyChosen {
    fn initial_means<R: Relation>(&self, relation: &R, k: usize) -> Square {
        let d = relation.dims();
        let n = relation.len();
        let mut rng = StdRng::from_seed(self.seed);
        let mut means = Square::with_capacity(d, k);
        for index in rand::seq::index::sample(&mut rng, n, k.min(n)) {
            means.push_slice(&relation.get(index).to_dense());
        }
        while means.len() < k {
            means.push_iter((0..d).map(|_| rng.random_range(-1.0f64..1.0f64)));
        }
        means
    }
}

/// Means given by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Predefined(pub Square);

impl Initializer for Predefined {
    fn initial_means<R: Relation>(&self, _: &R, _: usize) -> Square {
        self.0.clone()
    }
}

#[test]
fn randomly_chosen() {
    let relation = Square::from_rows(2, (0..10).map(|i| [i as f64, -(i as f64)]));
    let means = RandomlyChosen::from_u64(42).initial_means(&relation, 4);
    assert_eq!(means.len(), 4);
    let mut picked = means.iter().map(|m| m[0] as i64).collect::<Vec<_>>();
    picked.sort_unstable();
    picked.dedup();
    assert_eq!(picked.len(), 4);
    assert_eq!(means, RandomlyChosen::from_u64(42).initial_means(&relation, 4));
    let padded = RandomlyChosen::from_u64(42).initial_means(&relation, 12);
    assert_eq!(padded.len(), 12);
    assert!(padded.iter().skip(10).flatten().all(|v| (-1.0..1.0).contains(v)));
}
