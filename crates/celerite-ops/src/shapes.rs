//! Shared argument checks

use celerite_core::error::{check_len, CeleriteResult};
use scirs2_core::ndarray_ext::{ArrayView1, ArrayView2};

/// Check `(U, P, d, W)` against each other and return `(N, J)`
pub(crate) fn check_factor_args(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
) -> CeleriteResult<(usize, usize)> {
    let n = d.len();
    let j = u.ncols();
    check_len("U", 0, n, u.nrows())?;
    check_len("W", 0, n, w.nrows())?;
    check_len("W", 1, j, w.ncols())?;
    check_len("P", 0, n.saturating_sub(1), p.nrows())?;
    check_len("P", 1, j, p.ncols())?;
    Ok((n, j))
}
