//! Gaussian log-likelihood from a factorization

use crate::solve::norm;
use celerite_core::error::CeleriteResult;
use scirs2_core::ndarray_ext::{ArrayView1, ArrayView2};
use std::f64::consts::PI;

/// `ln |K| = Σ ln d_n`
pub fn log_det(d: &ArrayView1<f64>) -> f64 {
    d.iter().map(|x| x.ln()).sum()
}

/// Log-likelihood of `y` under a zero-mean Gaussian with covariance `K`
///
/// ```text
/// ln p(y) = −½ (yᵀ K⁻¹ y + ln |K| + N ln 2π)
/// ```
pub fn log_likelihood(
    u: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    y: &ArrayView1<f64>,
) -> CeleriteResult<f64> {
    let quad = norm(u, p, d, w, y)?;
    let n = d.len() as f64;
    Ok(-0.5 * (quad + log_det(d) + n * (2.0 * PI).ln()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use celerite_core::dense::{dense_cholesky, to_dense};
    use celerite_core::factor;
    use celerite_core::testing::random_system;
    use scirs2_core::ndarray_ext::Array1;

    #[test]
    fn test_log_likelihood_matches_dense() {
        let rs = random_system(18, 2, 33);
        let fact = factor(&rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view()).unwrap();
        let y = Array1::from_shape_fn(18, |i| (i as f64 * 0.5).sin());

        let ll = log_likelihood(
            &rs.u.view(),
            &rs.p.view(),
            &fact.d.view(),
            &fact.w.view(),
            &y.view(),
        )
        .unwrap();

        // Dense reference: forward substitution with the Cholesky factor
        let k = to_dense(&rs.system().unwrap());
        let chol = dense_cholesky(&k.view()).unwrap();
        let mut z = y.clone();
        for i in 0..18 {
            let mut acc = z[i];
            for m in 0..i {
                acc -= chol[[i, m]] * z[m];
            }
            z[i] = acc / chol[[i, i]];
        }
        let dense_log_det: f64 = (0..18).map(|i| 2.0 * chol[[i, i]].ln()).sum();
        let want = -0.5 * (z.dot(&z) + dense_log_det + 18.0 * (2.0 * PI).ln());

        assert!((ll - want).abs() < 1e-9, "{} vs {}", ll, want);
        assert!((log_det(&fact.d.view()) - dense_log_det).abs() < 1e-10);
    }

    #[test]
    fn test_log_det_of_identity() {
        let d = Array1::<f64>::ones(7);
        assert_eq!(log_det(&d.view()), 0.0);
    }
}
