//! Product with the celerite matrix itself
//!
//! `K Y` needs no factorization: the strictly lower part is a forward sweep
//! over `V`, the strictly upper part a backward sweep over `U`.
//!
//! ```text
//! (K Y)_n = a_n y_n + u_n F_n + v_n G_n
//! F_n = p_{n-1} ∘ (F_{n-1} + v_{n-1}ᵀ y_{n-1})
//! G_n = p_n ∘ (G_{n+1} + u_{n+1}ᵀ y_{n+1})
//! ```

use celerite_core::error::{check_len, CeleriteResult};
use celerite_core::SemiseparableSystem;
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Compute `K Y` for `Y` of shape `[N, K]`
pub fn matmul(
    a: &ArrayView1<f64>,
    u: &ArrayView2<f64>,
    v: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    y: &ArrayView2<f64>,
) -> CeleriteResult<Array2<f64>> {
    let system = SemiseparableSystem::new(a.view(), u.view(), v.view(), p.view())?;
    matmul_system(&system, y)
}

/// Single-column form of [`matmul`]
pub fn matmul_vec(
    a: &ArrayView1<f64>,
    u: &ArrayView2<f64>,
    v: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    y: &ArrayView1<f64>,
) -> CeleriteResult<Array1<f64>> {
    let out = matmul(a, u, v, p, &y.view().insert_axis(Axis(1)))?;
    Ok(out.column(0).to_owned())
}

/// [`matmul`] for an already validated system
pub fn matmul_system(
    system: &SemiseparableSystem<'_>,
    y: &ArrayView2<f64>,
) -> CeleriteResult<Array2<f64>> {
    let n = system.len();
    let j = system.rank();
    check_len("Y", 0, n, y.nrows())?;
    let k = y.ncols();
    let (a, u, v, p) = (system.a(), system.u(), system.v(), system.p());

    let mut out = Array2::<f64>::zeros((n, k));
    for i in 0..n {
        for c in 0..k {
            out[[i, c]] = a[i] * y[[i, c]];
        }
    }

    let mut f = Array2::<f64>::zeros((j, k));
    for i in 1..n {
        for jj in 0..j {
            let pj = p[[i - 1, jj]];
            let vj = v[[i - 1, jj]];
            for c in 0..k {
                f[[jj, c]] = pj * (f[[jj, c]] + vj * y[[i - 1, c]]);
            }
        }
        for c in 0..k {
            for jj in 0..j {
                out[[i, c]] += u[[i, jj]] * f[[jj, c]];
            }
        }
    }

    f.fill(0.0);
    for i in (0..n.saturating_sub(1)).rev() {
        for jj in 0..j {
            let pj = p[[i, jj]];
            let uj = u[[i + 1, jj]];
            for c in 0..k {
                f[[jj, c]] = pj * (f[[jj, c]] + uj * y[[i + 1, c]]);
            }
        }
        for c in 0..k {
            for jj in 0..j {
                out[[i, c]] += v[[i, jj]] * f[[jj, c]];
            }
        }
    }

    Ok(out)
}
