//! Dense materialisation of semiseparable matrices
//!
//! These routines are O(N²) or worse and exist for diagnostics and tests:
//! checking a factorization against the matrix it claims to factor, or
//! feeding small problems to a dense reference implementation.

use crate::error::{check_len, CeleriteResult};
use crate::factor::Factorization;
use crate::system::SemiseparableSystem;
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView2};

/// Dense `K = diag(a) + tril(U Vᵀ ∘ Φ) + triu(V Uᵀ ∘ Φᵀ)`
pub fn to_dense(system: &SemiseparableSystem<'_>) -> Array2<f64> {
    let n_obs = system.len();
    let mut k = Array2::<f64>::zeros((n_obs, n_obs));
    fill_lower(&mut k, system.u(), system.v(), system.p());

    for n in 0..n_obs {
        k[[n, n]] = system.a()[n];
        for m in 0..n {
            k[[m, n]] = k[[n, m]];
        }
    }
    k
}

/// Dense unit lower-triangular factor `I + L`
pub fn unit_lower_factor(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    w: &ArrayView2<f64>,
) -> CeleriteResult<Array2<f64>> {
    let n_obs = u.nrows();
    check_len("W", 0, n_obs, w.nrows())?;
    check_len("W", 1, u.ncols(), w.ncols())?;
    check_len("P", 0, n_obs.saturating_sub(1), p.nrows())?;
    check_len("P", 1, u.ncols(), p.ncols())?;

    let mut l = Array2::<f64>::zeros((n_obs, n_obs));
    fill_lower(&mut l, u, w, p);
    for n in 0..n_obs {
        l[[n, n]] = 1.0;
    }
    Ok(l)
}

/// Dense `(I + L) · diag(d) · (I + L)ᵀ`
pub fn reconstruct(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    fact: &Factorization,
) -> CeleriteResult<Array2<f64>> {
    check_len("d", 0, u.nrows(), fact.d.len())?;
    let l = unit_lower_factor(u, p, &fact.w.view())?;
    let ld = &l * &fact.d.view().insert_axis(scirs2_core::ndarray_ext::Axis(0));
    Ok(ld.dot(&l.t()))
}

/// Dense lower-triangular Cholesky factor (reference implementation)
///
/// Returns `None` if the matrix is not positive definite.
pub fn dense_cholesky(k: &ArrayView2<f64>) -> Option<Array2<f64>> {
    let n_obs = k.nrows();
    let mut l = Array2::<f64>::zeros((n_obs, n_obs));

    for i in 0..n_obs {
        for j in 0..=i {
            let mut sum = k[[i, j]];
            for m in 0..j {
                sum -= l[[i, m]] * l[[j, m]];
            }
            if i == j {
                if !(sum > 0.0) {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Strictly lower part `X[n, m] = Σⱼ left[n, j] right[m, j] Φⱼ[n, m]`
fn fill_lower(
    out: &mut Array2<f64>,
    left: &ArrayView2<f64>,
    right: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
) {
    let (n_obs, rank) = (left.nrows(), left.ncols());
    let mut phi = Array1::<f64>::zeros(rank);

    for m in 0..n_obs {
        phi.fill(1.0);
        for n in (m + 1)..n_obs {
            let mut acc = 0.0;
            for j in 0..rank {
                phi[j] *= p[[n - 1, j]];
                acc += left[[n, j]] * right[[m, j]] * phi[j];
            }
            out[[n, m]] = acc;
        }
    }
}
