//! Linear solves with a factorized celerite matrix
//!
//! With `K = (I + L) diag(d) (I + L)ᵀ`, a solve is a forward substitution
//! with `I + L`, a division by `d` and a backward substitution with
//! `(I + L)ᵀ`. Both substitutions carry a J×K running sum instead of
//! touching the dense factor:
//!
//! ```text
//! forward:   F_n = p_{n-1} ∘ (F_{n-1} + w_{n-1}ᵀ z_{n-1}),   z_n = y_n − u_n F_n
//! backward:  G_n = p_n ∘ (G_{n+1} + u_{n+1}ᵀ x_{n+1}),       x_n = z_n − w_n G_n
//! ```

use crate::shapes::check_factor_args;
use celerite_core::error::{check_len, CeleriteResult};
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Solve `K X = Y` for a right-hand side of shape `[N, K]`
///
/// # Errors
///
/// `ShapeMismatch` if the arguments disagree on `N` or `J`.
pub fn solve(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    y: &ArrayView2<f64>,
) -> CeleriteResult<Array2<f64>> {
    let (n, j) = check_factor_args(u, p, d, w)?;
    check_len("Y", 0, n, y.nrows())?;
    log::debug!("celerite solve: N={}, J={}, K={}", n, j, y.ncols());

    let mut z = y.to_owned();
    forward_substitute(u, p, w, &mut z);
    for (mut row, &dn) in z.axis_iter_mut(Axis(0)).zip(d.iter()) {
        row.mapv_inplace(|x| x / dn);
    }
    backward_substitute(u, p, w, &mut z);
    Ok(z)
}

/// Solve `K x = y` for a single right-hand side
pub fn solve_vec(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    y: &ArrayView1<f64>,
) -> CeleriteResult<Array1<f64>> {
    let x = solve(u, p, d, w, &y.view().insert_axis(Axis(1)))?;
    Ok(x.column(0).to_owned())
}

/// Quadratic form `yᵀ K⁻¹ y`
///
/// Only needs the forward substitution: `yᵀ K⁻¹ y = Σ z_n² / d_n` with
/// `z = (I + L)⁻¹ y`.
pub fn norm(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    y: &ArrayView1<f64>,
) -> CeleriteResult<f64> {
    let (n, _) = check_factor_args(u, p, d, w)?;
    check_len("y", 0, n, y.len())?;

    let mut z = y.view().insert_axis(Axis(1)).to_owned();
    forward_substitute(u, p, w, &mut z);
    Ok(z.column(0)
        .iter()
        .zip(d.iter())
        .map(|(zn, dn)| zn * zn / dn)
        .sum())
}

/// `Z ← (I + L)⁻¹ Z`, in place
pub(crate) fn forward_substitute(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    w: &ArrayView2<f64>,
    z: &mut Array2<f64>,
) {
    let (n, k) = z.dim();
    let j = u.ncols();
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
            z[[i, c]] -= acc;
        }
    }
}

/// `Z ← (I + L)⁻ᵀ Z`, in place
pub(crate) fn backward_substitute(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    w: &ArrayView2<f64>,
    z: &mut Array2<f64>,
) {
    let (n, k) = z.dim();
    let j = u.ncols();
    let mut g = Array2::<f64>::zeros((j, k));

    for i in (0..n.saturating_sub(1)).rev() {
        for jj in 0..j {
            let pj = p[[i, jj]];
            let uj = u[[i + 1, jj]];
            for c in 0..k {
                g[[jj, c]] = pj * (g[[jj, c]] + uj * z[[i + 1, c]]);
            }
        }
        for c in 0..k {
            let mut acc = 0.0;
            for jj in 0..j {
                acc += w[[i, jj]] * g[[jj, c]];
            }
            z[[i, c]] -= acc;
        }
    }
}
