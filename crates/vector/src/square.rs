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

use crate::{PointRef, Relation};

/// Row-major matrix of `len()` rows with `d()` columns each.
#[derive(Debug, Clone, PartialEq)]
pub struct Square {
    d: usize,
    p: Vec<f64>,
}

impl Square {
    pub fn d(&self) -> usize {
        self.d
    }
    pub fn len(&self) -> usize {
        if self.d == 0 { 0 } else { self.p.len() / self.d }
    }
    pub fn is_empty(&self) -> bool {
        self.p.is_empty()
    }
    pub fn with_capacity(d: usize, p: usize) -> Self {
        Self {
            d,
            p: Vec::with_capacity(usize::saturating_mul(d, p)),
        }
    }
    pub fn new(d: usize) -> Self {
        Self { d, p: Vec::new() }
    }
    pub fn from_rows<T: AsRef<[f64]>>(d: usize, rows: impl IntoIterator<Item = T>) -> Self {
        let mut this = Self::new(d);
        for row in rows {
            this.push_slice(row.as_ref());
        }
        this
    }
    pub fn push_slice(&mut self, slice: &[f64]) {
        assert_eq!(slice.len(), self.d);
        self.p.extend_from_slice(slice);
    }
    pub fn push_iter(&mut self, iter: impl ExactSizeIterator<Item = f64>) {
        assert_eq!(iter.len(), self.d);
        self.p.extend(iter);
    }
    pub fn from_zeros(d: usize, p: usize) -> Self {
        Self {
            d,
            p: vec![0.0; d * p],
        }
    }
    pub fn fill(&mut self, value: f64) {
        self.p.fill(value);
    }
    pub fn iter(&self) -> std::slice::ChunksExact<'_, f64> {
        self.p.chunks_exact(self.d.max(1))
    }
}

impl std::ops::Index<usize> for Square {
    type Output = [f64];

    fn index(&self, index: usize) -> &Self::Output {
        &self.p[self.d * index..][..self.d]
    }
}

impl std::ops::IndexMut<usize> for Square {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.p[self.d * index..][..self.d]
    }
}

impl<'a> IntoIterator for &'a Square {
    type Item = &'a [f64];

    type IntoIter = std::slice::ChunksExact<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut Square {
    type Item = &'a mut [f64];

    type IntoIter = std::slice::ChunksExactMut<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.p.chunks_exact_mut(self.d.max(1))
    }
}

impl Relation for Square {
    fn len(&self) -> usize {
        Square::len(self)
    }

    fn dims(&self) -> usize {
        self.d
    }

    #[inline]
    fn get(&self, i: usize) -> PointRef<'_> {
        PointRef::Dense(&self[i])
    }
}

#[test]
fn square_rows() {
    let mut square = Square::with_capacity(3, 2);
    square.push_slice(&[1.0, 2.0, 3.0]);
    square.push_iter([4.0, 5.0, 6.0].into_iter());
    assert_eq!(square.len(), 2);
    assert_eq!(&square[1], &[4.0, 5.0, 6.0]);
    square[0][2] = 9.0;
    assert_eq!(square.iter().map(|r| r[2]).collect::<Vec<_>>(), vec![9.0, 6.0]);
    assert!(Square::new(4).is_empty());
}
