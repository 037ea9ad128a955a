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

pub trait Floating: Copy + Send + Sync + std::fmt::Debug + 'static {
    fn reduce_sum_of_x2(this: &[Self]) -> f64;
    fn reduce_sum_of_abs_x(this: &[Self]) -> f64;
    fn reduce_max_of_abs_x(this: &[Self]) -> f64;
    fn reduce_sum_of_d2(lhs: &[Self], rhs: &[Self]) -> f64;
    fn reduce_sum_of_abs_d(lhs: &[Self], rhs: &[Self]) -> f64;
    fn reduce_max_of_abs_d(lhs: &[Self], rhs: &[Self]) -> f64;

    /// Sparse `lhs` against dense `rhs`; `lidx` must be strictly increasing.
    fn reduce_sum_of_d2_sparse(lidx: &[u32], lval: &[Self], rhs: &[Self]) -> f64;
    fn reduce_sum_of_abs_d_sparse(lidx: &[u32], lval: &[Self], rhs: &[Self]) -> f64;
    fn reduce_max_of_abs_d_sparse(lidx: &[u32], lval: &[Self], rhs: &[Self]) -> f64;

    fn vector_add_inplace(lhs: &mut [Self], rhs: &[Self]);
    fn vector_sub_inplace(lhs: &mut [Self], rhs: &[Self]);
    fn vector_add_sparse_inplace(lhs: &mut [Self], ridx: &[u32], rval: &[Self]);
    fn vector_sub_sparse_inplace(lhs: &mut [Self], ridx: &[u32], rval: &[Self]);
    fn vector_mul_scalar_inplace(lhs: &mut [Self], rhs: f64);
}

impl Floating for f64 {
    #[inline(always)]
    fn reduce_sum_of_x2(this: &[f64]) -> f64 {
        reduce_sum_of_x2::reduce_sum_of_x2(this)
    }

    #[inline(always)]
    fn reduce_sum_of_abs_x(this: &[f64]) -> f64 {
        reduce_sum_of_abs_x::reduce_sum_of_abs_x(this)
    }

    #[inline(always)]
    fn reduce_max_of_abs_x(this: &[f64]) -> f64 {
        reduce_max_of_abs_x::reduce_max_of_abs_x(this)
    }

    #[inline(always)]
    fn reduce_sum_of_d2(lhs: &[f64], rhs: &[f64]) -> f64 {
        reduce_sum_of_d2::reduce_sum_of_d2(lhs, rhs)
    }

    #[inline(always)]
    fn reduce_sum_of_abs_d(lhs: &[f64], rhs: &[f64]) -> f64 {
        reduce_sum_of_abs_d::reduce_sum_of_abs_d(lhs, rhs)
    }

    #[inline(always)]
    fn reduce_max_of_abs_d(lhs: &[f64], rhs: &[f64]) -> f64 {
        reduce_max_of_abs_d::reduce_max_of_abs_d(lhs, rhs)
    }

    #[inline(always)]
    fn reduce_sum_of_d2_sparse(lidx: &[u32], lval: &[f64], rhs: &[f64]) -> f64 {
        reduce_sum_of_d2_sparse::reduce_sum_of_d2_sparse(lidx, lval, rhs)
    }

    #[inline(always)]
    fn reduce_sum_of_abs_d_sparse(lidx: &[u32], lval: &[f64], rhs: &[f64]) -> f64 {
        reduce_sum_of_abs_d_sparse::reduce_sum_of_abs_d_sparse(lidx, lval, rhs)
    }

    #[inline(always)]
    fn reduce_max_of_abs_d_sparse(lidx: &[u32], lval: &[f64], rhs: &[f64]) -> f64 {
        reduce_max_of_abs_d_sparse::reduce_max_of_abs_d_sparse(lidx, lval, rhs)
    }

    #[inline(always)]
    fn vector_add_inplace(lhs: &mut [f64], rhs: &[f64]) {
        vector_add_inplace::vector_add_inplace(lhs, rhs)
    }

    #[inline(always)]
    fn vector_sub_inplace(lhs: &mut [f64], rhs: &[f64]) {
        vector_sub_inplace::vector_sub_inplace(lhs, rhs)
    }

    #[inline(always)]
    fn vector_add_sparse_inplace(lhs: &mut [f64], ridx: &[u32], rval: &[f64]) {
        vector_add_sparse_inplace::vector_add_sparse_inplace(lhs, ridx, rval)
    }

    #[inline(always)]
    fn vector_sub_sparse_inplace(lhs: &mut [f64], ridx: &[u32], rval: &[f64]) {
        vector_sub_sparse_inplace::vector_sub_sparse_inplace(lhs, ridx, rval)
    }

    #[inline(always)]
    fn vector_mul_scalar_inplace(lhs: &mut [f64], rhs: f64) {
        vector_mul_scalar_inplace::vector_mul_scalar_inplace(lhs, rhs)
    }
}

mod reduce_sum_of_x2 {
    pub fn reduce_sum_of_x2(this: &[f64]) -> f64 {
        let n = this.len();
        let mut x2 = 0.0f64;
        for i in 0..n {
            x2 += this[i] * this[i];
        }
        x2
    }
}

mod reduce_sum_of_abs_x {
    pub fn reduce_sum_of_abs_x(this: &[f64]) -> f64 {
        let n = this.len();
        let mut x = 0.0f64;
        for i in 0..n {
            x += this[i].abs();
        }
        x
    }
}

mod reduce_max_of_abs_x {
    pub fn reduce_max_of_abs_x(this: &[f64]) -> f64 {
        let n = this.len();
        let mut x = 0.0f64;
        for i in 0..n {
            x = x.max(this[i].abs());
        }
        x
    }
}

mod reduce_sum_of_d2 {
    pub fn reduce_sum_of_d2(lhs: &[f64], rhs: &[f64]) -> f64 {
        assert_eq!(lhs.len(), rhs.len());
        let n = lhs.len();
        let mut d2 = 0.0f64;
        for i in 0..n {
            let d = lhs[i] - rhs[i];
            d2 += d * d;
        }
        d2
    }
}

mod reduce_sum_of_abs_d {
    pub fn reduce_sum_of_abs_d(lhs: &[f64], rhs: &[f64]) -> f64 {
        assert_eq!(lhs.len(), rhs.len());
        let n = lhs.len();
        let mut d = 0.0f64;
        for i in 0..n {
            d += (lhs[i] - rhs[i]).abs();
        }
        d
    }
}

mod reduce_max_of_abs_d {
    pub fn reduce_max_of_abs_d(lhs: &[f64], rhs: &[f64]) -> f64 {
        assert_eq!(lhs.len(), rhs.len());
        let n = lhs.len();
        let mut d = 0.0f64;
        for i in 0..n {
            d = d.max((lhs[i] - rhs[i]).abs());
        }
        d
    }
}

// Sparse kernels walk the dense side once and the sparse side by cursor, so
// coordinates absent from `lidx` contribute `rhs[j]` alone.

mod reduce_sum_of_d2_sparse {
    pub fn reduce_sum_of_d2_sparse(lidx: &[u32], lval: &[f64], rhs: &[f64]) -> f64 {
        assert_eq!(lidx.len(), lval.len());
        let (mut lp, ln) = (0, lidx.len());
        let mut d2 = 0.0f64;
        for j in 0..rhs.len() {
            let d = if lp < ln && lidx[lp] as usize == j {
                lp += 1;
                lval[lp - 1] - rhs[j]
            } else {
                rhs[j]
            };
            d2 += d * d;
        }
        assert_eq!(lp, ln, "sparse index out of bounds");
        d2
    }
}

mod reduce_sum_of_abs_d_sparse {
    pub fn reduce_sum_of_abs_d_sparse(lidx: &[u32], lval: &[f64], rhs: &[f64]) -> f64 {
        assert_eq!(lidx.len(), lval.len());
        let (mut lp, ln) = (0, lidx.len());
        let mut d = 0.0f64;
        for j in 0..rhs.len() {
            if lp < ln && lidx[lp] as usize == j {
                d += (lval[lp] - rhs[j]).abs();
                lp += 1;
            } else {
                d += rhs[j].abs();
            }
        }
        assert_eq!(lp, ln, "sparse index out of bounds");
        d
    }
}

mod reduce_max_of_abs_d_sparse {
    pub fn reduce_max_of_abs_d_sparse(lidx: &[u32], lval: &[f64], rhs: &[f64]) -> f64 {
        assert_eq!(lidx.len(), lval.len());
        let (mut lp, ln) = (0, lidx.len());
        let mut d = 0.0f64;
        for j in 0..rhs.len() {
            if lp < ln && lidx[lp] as usize == j {
                d = d.max((lval[lp] - rhs[j]).abs());
                lp += 1;
            } else {
                d = d.max(rhs[j].abs());
            }
        }
        assert_eq!(lp, ln, "sparse index out of bounds");
        d
    }
}

mod vector_add_inplace {
    pub fn vector_add_inplace(lhs: &mut [f64], rhs: &[f64]) {
        assert_eq!(lhs.len(), rhs.len());
        let n = lhs.len();
        for i in 0..n {
            lhs[i] += rhs[i];
        }
    }
}

mod vector_sub_inplace {
    pub fn vector_sub_inplace(lhs: &mut [f64], rhs: &[f64]) {
        assert_eq!(lhs.len(), rhs.len());
        let n = lhs.len();
        for i in 0..n {
            lhs[i] -= rhs[i];
        }
    }
}

mod vector_add_sparse_inplace {
    pub fn vector_add_sparse_inplace(lhs: &mut [f64], ridx: &[u32], rval: &[f64]) {
        assert_eq!(ridx.len(), rval.len());
        for (&j, &v) in ridx.iter().zip(rval) {
            lhs[j as usize] += v;
        }
    }
}

mod vector_sub_sparse_inplace {
    pub fn vector_sub_sparse_inplace(lhs: &mut [f64], ridx: &[u32], rval: &[f64]) {
        assert_eq!(ridx.len(), rval.len());
        for (&j, &v) in ridx.iter().zip(rval) {
            lhs[j as usize] -= v;
        }
    }
}

mod vector_mul_scalar_inplace {
    pub fn vector_mul_scalar_inplace(lhs: &mut [f64], rhs: f64) {
        let n = lhs.len();
        for i in 0..n {
            lhs[i] *= rhs;
        }
    }
}
