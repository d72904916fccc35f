//! Forward celerite factorization
//!
//! Factors `K = diag(a) + low_rank(U, V, P)` as
//!
//! ```text
//! K = (I + L) · diag(d) · (I + L)ᵀ
//! L[n, m] = Σⱼ U[n, j] · W[m, j] · Φⱼ[n, m]      (n > m)
//! ```
//!
//! in a single left-to-right sweep. The only state carried between points
//! is the J×J correction `S`, so the cost is O(N·J²) instead of the O(N³)
//! of a dense Cholesky factorization.
//!
//! # Recurrence
//!
//! With `S₀ = 0`, for `n = 0 .. N-1`:
//!
//! ```text
//! S_n = (S_{n-1} + d_{n-1} w_{n-1}ᵀ w_{n-1}) ∘ (p_{n-1}ᵀ p_{n-1})      (n ≥ 1)
//! t_n = u_n S_n
//! d_n = a_n − t_n · u_nᵀ
//! w_n = (v_n − t_n) / d_n
//! ```
//!
//! # Example
//!
//! ```
//! use celerite_core::factor;
//! use scirs2_core::ndarray_ext::array;
//!
//! let a = array![1.0, 1.0];
//! let u = array![[1.0], [1.0]];
//! let v = array![[0.5], [0.5]];
//! let p = array![[0.9]];
//!
//! let fact = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap();
//! assert!((fact.d[1] - 0.7975).abs() < 1e-12);
//! ```

use crate::error::{CeleriteError, CeleriteResult};
use crate::state::{advance_state, dot, row_times_state};
use crate::system::SemiseparableSystem;
use scirs2_core::ndarray_ext::{s, Array1, Array2, Array3, ArrayView1, ArrayView2};

/// Output of a successful factorization
#[derive(Debug, Clone, PartialEq)]
pub struct Factorization {
    /// Pivots, all strictly positive
    pub d: Array1<f64>,
    /// Modified right factor, used in place of `V` by solves
    pub w: Array2<f64>,
}

impl Factorization {
    /// Number of observations
    pub fn len(&self) -> usize {
        self.d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.d.is_empty()
    }

    /// Rank of the low-rank coupling
    pub fn rank(&self) -> usize {
        self.w.ncols()
    }

    /// `ln |K| = Σ ln d_n`
    pub fn log_det(&self) -> f64 {
        self.d.iter().map(|d| d.ln()).sum()
    }
}

/// Every running correction `S_n` seen by a forward sweep
///
/// Entry `n` is the state used to compute `d_n` and `w_n` (so entry 0 is the
/// zero matrix). Caching the tape costs O(N·J²) memory and lets the adjoint
/// skip replaying the recurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTape {
    states: Array3<f64>,
}

impl StateTape {
    /// Wrap an `[N, J, J]` array of states
    pub fn from_states(states: Array3<f64>) -> Self {
        Self { states }
    }

    /// Number of recorded states (`N`)
    pub fn len(&self) -> usize {
        self.states.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// State used at point `n`
    pub fn state(&self, n: usize) -> ArrayView2<'_, f64> {
        self.states.slice(s![n, .., ..])
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.states
    }
}

/// Factorize the matrix described by `(a, U, V, P)`
///
/// # Errors
///
/// - [`CeleriteError::ShapeMismatch`] if the arguments disagree on `N` or `J`
/// - [`CeleriteError::NotPositiveDefinite`] at the first non-positive pivot
pub fn factor(
    a: &ArrayView1<f64>,
    u: &ArrayView2<f64>,
    v: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
) -> CeleriteResult<Factorization> {
    let system = SemiseparableSystem::new(a.view(), u.view(), v.view(), p.view())?;
    factor_system(&system)
}

/// Factorize an already validated system
pub fn factor_system(system: &SemiseparableSystem<'_>) -> CeleriteResult<Factorization> {
    sweep(system, None)
}

/// Factorize and keep every running correction for the adjoint
pub fn factor_with_tape(
    a: &ArrayView1<f64>,
    u: &ArrayView2<f64>,
    v: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
) -> CeleriteResult<(Factorization, StateTape)> {
    let system = SemiseparableSystem::new(a.view(), u.view(), v.view(), p.view())?;
    let (n, j) = (system.len(), system.rank());

    let mut states = Array3::<f64>::zeros((n, j, j));
    let fact = sweep(&system, Some(&mut states))?;
    Ok((fact, StateTape::from_states(states)))
}

fn sweep(
    system: &SemiseparableSystem<'_>,
    mut tape: Option<&mut Array3<f64>>,
) -> CeleriteResult<Factorization> {
    let (n_obs, rank) = (system.len(), system.rank());
    let (a, u, v, p) = (system.a(), system.u(), system.v(), system.p());

    log::debug!("celerite factor: N={}, J={}", n_obs, rank);

    let mut d = a.to_owned();
    let mut w = v.to_owned();
    let mut s = Array2::<f64>::zeros((rank, rank));
    let mut tmp = Array1::<f64>::zeros(rank);

    for n in 0..n_obs {
        if n > 0 {
            advance_state(&mut s, d[n - 1], &w.row(n - 1), &p.row(n - 1));
        }
        if let Some(states) = tape.as_deref_mut() {
            states.slice_mut(s![n, .., ..]).assign(&s);
        }

        row_times_state(&u.row(n), &s.view(), &mut tmp);
        let pivot = d[n] - dot(&tmp.view(), &u.row(n));

        // NaN fails this test as well
        if !(pivot > 0.0) {
            log::warn!(
                "celerite factor: non-positive pivot {} at index {} (N={})",
                pivot,
                n,
                n_obs
            );
            return Err(CeleriteError::NotPositiveDefinite { index: n, pivot });
        }
        d[n] = pivot;

        let mut w_row = w.row_mut(n);
        for k in 0..rank {
            w_row[k] = (w_row[k] - tmp[k]) / pivot;
        }
    }

    Ok(Factorization { d, w })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    #[test]
    fn test_two_point_by_hand() {
        let a = array![1.0, 1.0];
        let u = array![[1.0], [1.0]];
        let v = array![[0.5], [0.5]];
        let p = array![[0.9]];

        let fact = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap();

        // S₁ = 1 · 0.5² · 0.9² = 0.2025
        assert!((fact.d[0] - 1.0).abs() < 1e-15);
        assert!((fact.w[[0, 0]] - 0.5).abs() < 1e-15);
        assert!((fact.d[1] - 0.7975).abs() < 1e-14);
        assert!((fact.w[[1, 0]] - 0.2975 / 0.7975).abs() < 1e-14);
    }

    #[test]
    fn test_zero_rank_is_diagonal() {
        let a = array![2.0, 3.0, 4.0];
        let u = Array2::<f64>::zeros((3, 0));
        let p = Array2::<f64>::zeros((2, 0));

        let fact = factor(&a.view(), &u.view(), &u.view(), &p.view()).unwrap();
        assert_eq!(fact.d, a);
        assert_eq!(fact.w.shape(), &[3, 0]);
        assert!((fact.log_det() - (24.0f64).ln()).abs() < 1e-14);
    }

    #[test]
    fn test_empty_input() {
        let a = Array1::<f64>::zeros(0);
        let u = Array2::<f64>::zeros((0, 2));
        let p = Array2::<f64>::zeros((0, 2));

        let fact = factor(&a.view(), &u.view(), &u.view(), &p.view()).unwrap();
        assert!(fact.is_empty());
        assert_eq!(fact.rank(), 2);
    }

    #[test]
    fn test_not_positive_definite_index() {
        let a = array![1.0, 1.0, -5.0, 1.0];
        let u = Array2::<f64>::from_elem((4, 1), 0.1);
        let v = Array2::<f64>::from_elem((4, 1), 0.1);
        let p = Array2::<f64>::from_elem((3, 1), 0.5);

        for _ in 0..3 {
            let err = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap_err();
            assert!(matches!(
                err,
                CeleriteError::NotPositiveDefinite { index: 2, .. }
            ));
        }
    }

    #[test]
    fn test_nan_pivot_is_rejected() {
        let a = array![1.0, f64::NAN];
        let u = array![[1.0], [1.0]];
        let v = array![[0.5], [0.5]];
        let p = array![[0.9]];

        let err = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap_err();
        assert!(matches!(
            err,
            CeleriteError::NotPositiveDefinite { index: 1, .. }
        ));
    }

    #[test]
    fn test_tape_matches_plain_sweep() {
        let a = array![2.0, 2.5, 3.0];
        let u = array![[0.3, 0.1], [0.2, -0.4], [0.5, 0.2]];
        let v = array![[0.6, 0.2], [0.1, 0.3], [-0.2, 0.4]];
        let p = array![[0.8, 0.6], [0.7, 0.9]];

        let plain = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap();
        let (taped, tape) = factor_with_tape(&a.view(), &u.view(), &v.view(), &p.view()).unwrap();

        assert_eq!(plain, taped);
        assert_eq!(tape.len(), 3);
        assert!(tape.state(0).iter().all(|&x| x == 0.0));

        // S₁ = d₀ w₀ᵀ w₀ ∘ p₀ᵀ p₀
        let w0 = plain.w.row(0);
        let expected = plain.d[0] * w0[0] * w0[1] * 0.8 * 0.6;
        assert!((tape.state(1)[[0, 1]] - expected).abs() < 1e-15);
        assert!((tape.state(1)[[1, 0]] - expected).abs() < 1e-15);
    }
}
