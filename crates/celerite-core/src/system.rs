//! Validated view of a structured (semiseparable) covariance matrix
//!
//! The matrix is never stored densely. It is described by four arrays:
//!
//! ```text
//! K = diag(a) + tril(U Vᵀ ∘ Φ) + triu(V Uᵀ ∘ Φᵀ)
//! Φⱼ[n, m] = P[m, j] · P[m+1, j] ⋯ P[n-1, j]      (n > m)
//! ```
//!
//! | array | shape | meaning |
//! |-------|-------|---------|
//! | `a` | `[N]` | diagonal |
//! | `U` | `[N, J]` | left low-rank factor |
//! | `V` | `[N, J]` | right low-rank factor |
//! | `P` | `[N-1, J]` | decay between consecutive points |

use crate::error::{check_len, CeleriteResult};
use scirs2_core::ndarray_ext::{ArrayView1, ArrayView2};

/// Borrowed, shape-checked inputs of one factorization call
#[derive(Debug, Clone)]
pub struct SemiseparableSystem<'a> {
    a: ArrayView1<'a, f64>,
    u: ArrayView2<'a, f64>,
    v: ArrayView2<'a, f64>,
    p: ArrayView2<'a, f64>,
}

impl<'a> SemiseparableSystem<'a> {
    /// Validate shapes and wrap the inputs
    ///
    /// `N` is taken from `a` and `J` from the columns of `U`. Every other
    /// argument is checked against those two numbers before any arithmetic
    /// happens, so a mismatch never surfaces halfway through a sweep.
    ///
    /// # Errors
    ///
    /// [`CeleriteError::ShapeMismatch`](crate::CeleriteError::ShapeMismatch)
    /// naming the argument and the offending axis.
    pub fn new(
        a: ArrayView1<'a, f64>,
        u: ArrayView2<'a, f64>,
        v: ArrayView2<'a, f64>,
        p: ArrayView2<'a, f64>,
    ) -> CeleriteResult<Self> {
        let n = a.len();
        let j = u.ncols();

        check_len("U", 0, n, u.nrows())?;
        check_len("V", 0, n, v.nrows())?;
        check_len("V", 1, j, v.ncols())?;
        check_len("P", 0, n.saturating_sub(1), p.nrows())?;
        check_len("P", 1, j, p.ncols())?;

        Ok(Self { a, u, v, p })
    }

    /// Number of observations `N`
    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Rank `J` of the low-rank coupling
    pub fn rank(&self) -> usize {
        self.u.ncols()
    }

    pub fn a(&self) -> &ArrayView1<'a, f64> {
        &self.a
    }

    pub fn u(&self) -> &ArrayView2<'a, f64> {
        &self.u
    }

    pub fn v(&self) -> &ArrayView2<'a, f64> {
        &self.v
    }

    pub fn p(&self) -> &ArrayView2<'a, f64> {
        &self.p
    }
}
