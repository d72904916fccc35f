//! Predictions at new points
//!
//! The conditional mean of a celerite process at test points `t` is
//! `K(t, x) z` with `z = K⁻¹ y`. Each test point sits between two training
//! points `x_{i-1} < t ≤ x_i` (with `i` from [`searchsorted`]) and the kernel
//! splits into a part from the points before it and a part from the points
//! after it:
//!
//! ```text
//! μ(t) = u*(t) · F_i + v*(t) · B_i
//! F_i = Σ_{n<i} v_n z_n Φ(x_{i-1}, x_n)
//! B_i = Σ_{n≥i} u_n z_n Φ(x_n, x_i)
//! ```
//!
//! where `u*(t)` carries the decay from `x_{i-1}` to `t` and `v*(t)` the
//! decay from `t` to `x_i` (see
//! [`TermCoefficients::conditional_matrices`](crate::terms::TermCoefficients::conditional_matrices)).
//! Both prefix tables take one O(N·J) sweep, so M predictions cost
//! O((N + M)·J).

use celerite_core::error::{check_len, CeleriteError, CeleriteResult};
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2};

/// Left insertion indices of `t` into the sorted `x`
///
/// `result[m]` is the first `i` with `x[i] >= t[m]` (or `N` if none).
pub fn searchsorted(x: &ArrayView1<f64>, t: &ArrayView1<f64>) -> Vec<usize> {
    t.iter().map(|&value| lower_bound(x, value)).collect()
}

fn lower_bound(x: &ArrayView1<f64>, value: f64) -> usize {
    let (mut lo, mut hi) = (0, x.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if x[mid] < value {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Conditional mean `K(t, x) z` at M test points
///
/// # Arguments
///
/// * `u`, `v`, `p` - Structured inputs at the training points
/// * `z` - Weights, usually `K⁻¹ y` from [`solve_vec`](crate::solve_vec)
/// * `u_star`, `v_star` - Test-point factors, shape `[M, J]`
/// * `inds` - Insertion indices from [`searchsorted`]
///
/// # Errors
///
/// `ShapeMismatch` for inconsistent shapes, `InvalidInput` for an index
/// past `N`.
pub fn conditional_mean(
    u: &ArrayView2<f64>,
    v: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    z: &ArrayView1<f64>,
    u_star: &ArrayView2<f64>,
    v_star: &ArrayView2<f64>,
    inds: &[usize],
) -> CeleriteResult<Array1<f64>> {
    let n = z.len();
    let j = u.ncols();
    let m = inds.len();
    check_len("U", 0, n, u.nrows())?;
    check_len("V", 0, n, v.nrows())?;
    check_len("V", 1, j, v.ncols())?;
    check_len("P", 0, n.saturating_sub(1), p.nrows())?;
    check_len("P", 1, j, p.ncols())?;
    check_len("U*", 0, m, u_star.nrows())?;
    check_len("U*", 1, j, u_star.ncols())?;
    check_len("V*", 0, m, v_star.nrows())?;
    check_len("V*", 1, j, v_star.ncols())?;
    if let Some(&bad) = inds.iter().find(|&&i| i > n) {
        return Err(CeleriteError::InvalidInput(format!(
            "insertion index {} is past the {} training points",
            bad, n
        )));
    }
    log::debug!("celerite conditional_mean: N={}, J={}, M={}", n, j, m);

    // forward[i] = F_i, backward[i] = B_i
    let mut forward = Array2::<f64>::zeros((n + 1, j));
    for i in 0..n {
        for k in 0..j {
            let carried = if i > 0 {
                p[[i - 1, k]] * forward[[i, k]]
            } else {
                0.0
            };
            forward[[i + 1, k]] = carried + v[[i, k]] * z[i];
        }
    }

    let mut backward = Array2::<f64>::zeros((n + 1, j));
    for i in (0..n).rev() {
        for k in 0..j {
            let carried = if i + 1 < n {
                p[[i, k]] * backward[[i + 1, k]]
            } else {
                0.0
            };
            backward[[i, k]] = carried + u[[i, k]] * z[i];
        }
    }

    let mut mu = Array1::<f64>::zeros(m);
    for (row, &i) in inds.iter().enumerate() {
        let mut acc = 0.0;
        for k in 0..j {
            if i > 0 {
                acc += u_star[[row, k]] * forward[[i, k]];
            }
            if i < n {
                acc += v_star[[row, k]] * backward[[i, k]];
            }
        }
        mu[row] = acc;
    }
    Ok(mu)
}
