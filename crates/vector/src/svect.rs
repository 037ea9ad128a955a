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

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SVectBorrowed<'a> {
    dims: u32,
    indexes: &'a [u32],
    values: &'a [f64],
}

impl<'a> SVectBorrowed<'a> {
    #[inline(always)]
    pub fn new(dims: u32, indexes: &'a [u32], values: &'a [f64]) -> Self {
        Self::new_checked(dims, indexes, values).expect("invalid data")
    }

    #[inline(always)]
    pub fn new_checked(dims: u32, indexes: &'a [u32], values: &'a [f64]) -> Option<Self> {
        if indexes.len() != values.len() {
            return None;
        }
        for i in 1..indexes.len() {
            if indexes[i - 1] >= indexes[i] {
                return None;
            }
        }
        if let Some(&last) = indexes.last() {
            if last >= dims {
                return None;
            }
        }
        Some(Self {
            dims,
            indexes,
            values,
        })
    }

    #[inline(always)]
    pub fn dims(&self) -> u32 {
        self.dims
    }

    #[inline(always)]
    pub fn indexes(&self) -> &'a [u32] {
        self.indexes
    }

    #[inline(always)]
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    pub fn value(&self, d: u32) -> f64 {
        match self.indexes.binary_search(&d) {
            Ok(p) => self.values[p],
            Err(_) => 0.0,
        }
    }
}

/// Compressed sparse rows.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    dims: u32,
    offsets: Vec<usize>,
    indexes: Vec<u32>,
    values: Vec<f64>,
}

impl SparseMatrix {
    pub fn new(dims: u32) -> Self {
        Self {
            dims,
            offsets: vec![0],
            indexes: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Appends a row, returning `None` if the entries are unsorted, duplicated or out of bounds.
    pub fn push(&mut self, indexes: &[u32], values: &[f64]) -> Option<()> {
        SVectBorrowed::new_checked(self.dims, indexes, values)?;
        self.indexes.extend_from_slice(indexes);
        self.values.extend_from_slice(values);
        self.offsets.push(self.indexes.len());
        Some(())
    }

    pub fn row(&self, i: usize) -> SVectBorrowed<'_> {
        let (start, end) = (self.offsets[i], self.offsets[i + 1]);
        SVectBorrowed {
            dims: self.dims,
            indexes: &self.indexes[start..end],
            values: &self.values[start..end],
        }
    }
}

impl Relation for SparseMatrix {
    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn dims(&self) -> usize {
        self.dims as usize
    }

    #[inline]
    fn get(&self, i: usize) -> PointRef<'_> {
        PointRef::Sparse(self.row(i))
    }
}

#[test]
fn sparse_rows() {
    let mut matrix = SparseMatrix::new(5);
    assert!(matrix.push(&[0, 3], &[1.0, 2.0]).is_some());
    assert!(matrix.push(&[], &[]).is_some());
    assert!(matrix.push(&[3, 1], &[1.0, 1.0]).is_none());
    assert!(matrix.push(&[5], &[1.0]).is_none());
    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix.row(0).value(3), 2.0);
    assert_eq!(matrix.row(0).value(2), 0.0);
    assert!(matrix.row(1).indexes().is_empty());
}
