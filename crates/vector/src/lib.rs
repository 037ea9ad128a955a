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

pub mod floating;
pub mod square;
pub mod svect;

pub use floating::Floating;
pub use square::Square;
pub use svect::{SVectBorrowed, SparseMatrix};

/// A borrowed point of a [`Relation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointRef<'a> {
    Dense(&'a [f64]),
    Sparse(SVectBorrowed<'a>),
}

impl<'a> PointRef<'a> {
    #[inline]
    pub fn dims(&self) -> usize {
        match self {
            PointRef::Dense(x) => x.len(),
            PointRef::Sparse(x) => x.dims() as usize,
        }
    }

    #[inline]
    pub fn value(&self, d: usize) -> f64 {
        match self {
            PointRef::Dense(x) => x[d],
            PointRef::Sparse(x) => x.value(d as u32),
        }
    }

    #[inline]
    pub fn add_to(&self, sum: &mut [f64]) {
        match self {
            PointRef::Dense(x) => f64::vector_add_inplace(sum, x),
            PointRef::Sparse(x) => f64::vector_add_sparse_inplace(sum, x.indexes(), x.values()),
        }
    }

    #[inline]
    pub fn sub_from(&self, sum: &mut [f64]) {
        match self {
            PointRef::Dense(x) => f64::vector_sub_inplace(sum, x),
            PointRef::Sparse(x) => f64::vector_sub_sparse_inplace(sum, x.indexes(), x.values()),
        }
    }

    /// Borrows dense points, densifies sparse ones.
    pub fn to_dense(&self) -> std::borrow::Cow<'a, [f64]> {
        match *self {
            PointRef::Dense(x) => std::borrow::Cow::Borrowed(x),
            PointRef::Sparse(_) => std::borrow::Cow::Owned(self.to_vec()),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            PointRef::Dense(x) => x.to_vec(),
            PointRef::Sparse(x) => {
                let mut result = vec![0.0; x.dims() as usize];
                f64::vector_add_sparse_inplace(&mut result, x.indexes(), x.values());
                result
            }
        }
    }
}

/// An indexed, read-only collection of points sharing one dimensionality.
pub trait Relation: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dims(&self) -> usize;

    fn get(&self, i: usize) -> PointRef<'_>;
}

impl<T: Relation + ?Sized> Relation for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn dims(&self) -> usize {
        (**self).dims()
    }

    fn get(&self, i: usize) -> PointRef<'_> {
        (**self).get(i)
    }
}

#[test]
fn point_ref_sums() {
    let sparse = SVectBorrowed::new(4, &[1, 2], &[3.0, -1.0]);
    let mut sum = vec![1.0; 4];
    PointRef::Sparse(sparse).add_to(&mut sum);
    PointRef::Dense(&[1.0, 1.0, 1.0, 1.0]).sub_from(&mut sum);
    assert_eq!(sum, vec![0.0, 3.0, -1.0, 0.0]);
    assert_eq!(PointRef::Sparse(sparse).to_vec(), vec![0.0, 3.0, -1.0, 0.0]);
    assert_eq!(PointRef::Sparse(sparse).value(2), -1.0);
    assert_eq!(PointRef::Sparse(sparse).dims(), 4);
}
