//! Product with the lower Cholesky-like factor
//!
//! `(I + L) diag(√d) Y` maps independent standard normal columns `Y` to
//! samples with covariance `K`, which is how a celerite process is drawn.

use crate::shapes::check_factor_args;
use celerite_core::error::{check_len, CeleriteError, CeleriteResult};
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Compute `(I + L) diag(√d) Y` for `Y` of shape `[N, K]`
///
/// # Errors
///
/// `ShapeMismatch` for inconsistent arguments, `InvalidInput` if a pivot is
/// negative.
pub fn dot_tril(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    y: &ArrayView2<f64>,
) -> CeleriteResult<Array2<f64>> {
    let (n, j) = check_factor_args(u, p, d, w)?;
    check_len("Y", 0, n, y.nrows())?;
    if let Some(idx) = d.iter().position(|&dn| !(dn >= 0.0)) {
        return Err(CeleriteError::InvalidInput(format!(
            "pivot d[{}] = {} has no real square root",
            idx, d[idx]
        )));
    }
    let k = y.ncols();
    log::debug!("celerite dot_tril: N={}, J={}, K={}", n, j, k);

    let mut z = y.to_owned();
    for (mut row, &dn) in z.axis_iter_mut(Axis(0)).zip(d.iter()) {
        let s = dn.sqrt();
        row.mapv_inplace(|x| x * s);
    }

    let mut out = z.clone();
    let mut f = Array2::<f64>::zeros((j, k));
    for i in 1..n {
        for jj in 0..j {
            let pj = p[[i - 1, jj]];
            let wj = w[[i - 1, jj]];
            for c in 0..k {
                f[[jj, c]] = pj * (f[[jj, c]] + wj * z[[i - 1, c]]);
            }
        }
        for c in 0..k {
            let mut acc = 0.0;
            for jj in 0..j {
                acc += u[[i, jj]] * f[[jj, c]];
            }
            out[[i, c]] += acc;
        }
    }
    Ok(out)
}

/// Single-column form of [`dot_tril`]
pub fn dot_tril_vec(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    y: &ArrayView1<f64>,
) -> CeleriteResult<Array1<f64>> {
    let out = dot_tril(u, p, d, w, &y.view().insert_axis(Axis(1)))?;
    Ok(out.column(0).to_owned())
}
