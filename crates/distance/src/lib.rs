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

use serde::{Deserialize, Serialize};
use vector::{Floating, PointRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Distance(i64);

impl Distance {
    #[inline(always)]
    pub const fn from_f64(value: f64) -> Self {
        let bits = value.to_bits() as i64;
        let mask = ((bits >> 63) as u64) >> 1;
        let res = bits ^ (mask as i64);
        Self(res)
    }

    #[inline(always)]
    pub const fn to_f64(self) -> f64 {
        let bits = self.0;
        let mask = ((bits >> 63) as u64) >> 1;
        let res = bits ^ (mask as i64);
        f64::from_bits(res as u64)
    }
}

impl From<f64> for Distance {
    #[inline(always)]
    fn from(value: f64) -> Self {
        Distance::from_f64(value)
    }
}

impl From<Distance> for f64 {
    #[inline(always)]
    fn from(value: Distance) -> Self {
        Distance::to_f64(value)
    }
}

/// Dissimilarity between a point and a dense mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    #[default]
    SquaredEuclidean,
    Euclidean,
    Manhattan,
    Maximum,
}

impl DistanceKind {
    /// Whether values are squares of a metric, so bounds need a square root first.
    #[inline(always)]
    pub fn is_squared(self) -> bool {
        matches!(self, DistanceKind::SquaredEuclidean)
    }

    /// Whether the triangle inequality holds on the raw values.
    #[inline(always)]
    pub fn is_metric(self) -> bool {
        !self.is_squared()
    }

    /// Whether the kind is squared or plain Euclidean, the ones minimizing the sum of squares.
    #[inline(always)]
    pub fn is_euclidean(self) -> bool {
        matches!(self, DistanceKind::SquaredEuclidean | DistanceKind::Euclidean)
    }

    #[inline]
    pub fn distance(self, lhs: PointRef<'_>, rhs: &[f64]) -> f64 {
        assert_eq!(lhs.dims(), rhs.len(), "dimensionality mismatch");
        match (self, lhs) {
            (DistanceKind::SquaredEuclidean, PointRef::Dense(x)) => f64::reduce_sum_of_d2(x, rhs),
            (DistanceKind::Euclidean, PointRef::Dense(x)) => f64::reduce_sum_of_d2(x, rhs).sqrt(),
            (DistanceKind::Manhattan, PointRef::Dense(x)) => f64::reduce_sum_of_abs_d(x, rhs),
            (DistanceKind::Maximum, PointRef::Dense(x)) => f64::reduce_max_of_abs_d(x, rhs),
            (DistanceKind::SquaredEuclidean, PointRef::Sparse(x)) => {
                f64::reduce_sum_of_d2_sparse(x.indexes(), x.values(), rhs)
            }
            (DistanceKind::Euclidean, PointRef::Sparse(x)) => {
                f64::reduce_sum_of_d2_sparse(x.indexes(), x.values(), rhs).sqrt()
            }
            (DistanceKind::Manhattan, PointRef::Sparse(x)) => {
                f64::reduce_sum_of_abs_d_sparse(x.indexes(), x.values(), rhs)
            }
            (DistanceKind::Maximum, PointRef::Sparse(x)) => {
                f64::reduce_max_of_abs_d_sparse(x.indexes(), x.values(), rhs)
            }
        }
    }

    /// Distance to the origin on the metric scale.
    #[inline]
    pub fn norm(self, x: PointRef<'_>) -> f64 {
        let values = match x {
            PointRef::Dense(x) => x,
            PointRef::Sparse(x) => x.values(),
        };
        match self {
            DistanceKind::SquaredEuclidean | DistanceKind::Euclidean => {
                f64::reduce_sum_of_x2(values).sqrt()
            }
            DistanceKind::Manhattan => f64::reduce_sum_of_abs_x(values),
            DistanceKind::Maximum => f64::reduce_max_of_abs_x(values),
        }
    }

    /// Maps a value of this kind onto the metric scale.
    #[inline(always)]
    pub fn to_metric(self, value: f64) -> f64 {
        if self.is_squared() { value.sqrt() } else { value }
    }
}

#[test]
fn distance_conversions() {
    assert_eq!(Distance::from(0.0f64), Distance::default());
    for i in -100..100 {
        let val = (i as f64) * 0.1;
        assert_eq!(f64::from(Distance::from(val)).to_bits(), val.to_bits());
    }
    assert_eq!(
        f64::from(Distance::from(-0.0f64)).to_bits(),
        (-0.0f64).to_bits()
    );
    assert_eq!(
        f64::from(Distance::from(f64::NAN)).to_bits(),
        f64::NAN.to_bits()
    );
    assert!(Distance::from(-1.5) < Distance::from(-0.5));
    assert!(Distance::from(-0.5) < Distance::from(0.0));
    assert!(Distance::from(0.0) < Distance::from(1e-300));
    assert!(Distance::from(2.0) < Distance::from(f64::INFINITY));
    assert!(Distance::from(f64::NEG_INFINITY) < Distance::from(-1e300));
}

#[test]
fn distance_kinds() {
    let x = [1.0, -2.0, 0.0];
    let y = [4.0, 2.0, 0.0];
    let x = PointRef::Dense(&x);
    assert_eq!(DistanceKind::SquaredEuclidean.distance(x, &y), 25.0);
    assert_eq!(DistanceKind::Euclidean.distance(x, &y), 5.0);
    assert_eq!(DistanceKind::Manhattan.distance(x, &y), 7.0);
    assert_eq!(DistanceKind::Maximum.distance(x, &y), 4.0);
    let sparse = vector::SVectBorrowed::new(3, &[0, 1], &[1.0, -2.0]);
    for kind in [
        DistanceKind::SquaredEuclidean,
        DistanceKind::Euclidean,
        DistanceKind::Manhattan,
        DistanceKind::Maximum,
    ] {
        assert_eq!(kind.distance(PointRef::Sparse(sparse), &y), kind.distance(x, &y));
        assert_eq!(kind.norm(PointRef::Sparse(sparse)), kind.norm(x));
    }
    assert_eq!(DistanceKind::SquaredEuclidean.to_metric(25.0), 5.0);
    assert_eq!(DistanceKind::Manhattan.to_metric(25.0), 25.0);
}
