//! Reverse-mode gradient of the celerite factorization
//!
//! For the forward recurrence (see `celerite_core::factor`)
//!
//! ```text
//! S_{n+1} = (S_n + d_n w_nᵀ w_n) ∘ (p_nᵀ p_n)
//! t_n     = u_n S_n
//! d_n     = a_n − t_n u_nᵀ
//! w_n     = (v_n − t_n) / d_n
//! ```
//!
//! the adjoint walks `n = N-1 .. 0` carrying `S̄`, the cotangent of the
//! running correction. At each point:
//!
//! 1. Pull `S̄_{n+1}` back through the state update into `p̄_n`, `d̄_n`,
//!    `w̄_n` and `S̄_n`
//! 2. Transpose the local relations: `v̄_n = w̄_n / d_n`,
//!    `d̄_n −= w̄_n·w_n / d_n`, `ā_n = d̄_n`,
//!    `t̄_n = −w̄_n / d_n − d̄_n u_n`, `ū_n = −d̄_n t_n + S_n t̄_nᵀ`
//! 3. Accumulate `S̄_n += u_nᵀ t̄_n`
//!
//! The traversal order is fixed, so gradients are bit-reproducible.

use crate::checkpoint::{AdjointConfig, StateReplay, StateSource};
use celerite_core::error::{check_len, CeleriteError, CeleriteResult};
use celerite_core::state::{dot, row_times_state, state_times_col};
use celerite_core::{Factorization, SemiseparableSystem, StateTape};
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2};

/// Upstream gradients on the outputs `(d, W)`
#[derive(Debug, Clone, PartialEq)]
pub struct FactorCotangent {
    /// ∂L/∂d, shape `[N]`
    pub d: Array1<f64>,
    /// ∂L/∂W, shape `[N, J]`
    pub w: Array2<f64>,
}

impl FactorCotangent {
    pub fn new(d: Array1<f64>, w: Array2<f64>) -> Self {
        Self { d, w }
    }

    /// All-zero cotangent for `n` points and rank `j`
    pub fn zeros(n: usize, j: usize) -> Self {
        Self {
            d: Array1::zeros(n),
            w: Array2::zeros((n, j)),
        }
    }
}

/// Gradients on the inputs `(a, U, V, P)`
#[derive(Debug, Clone, PartialEq)]
pub struct FactorGradients {
    /// ∂L/∂a, shape `[N]`
    pub a: Array1<f64>,
    /// ∂L/∂U, shape `[N, J]`
    pub u: Array2<f64>,
    /// ∂L/∂V, shape `[N, J]`
    pub v: Array2<f64>,
    /// ∂L/∂P, shape `[N-1, J]`
    pub p: Array2<f64>,
}

impl FactorGradients {
    fn zeros(n: usize, j: usize) -> Self {
        Self {
            a: Array1::zeros(n),
            u: Array2::zeros((n, j)),
            v: Array2::zeros((n, j)),
            p: Array2::zeros((n.saturating_sub(1), j)),
        }
    }
}

/// Gradient of `factor` with the default [`AdjointConfig`]
///
/// Running corrections are replayed from `(d, W, P)`; nothing from the
/// forward sweep beyond its outputs is needed. The inputs must be the ones
/// `d` and `W` were computed from, and that factorization must have
/// succeeded.
///
/// # Errors
///
/// [`CeleriteError::ShapeMismatch`] if any argument disagrees with `N` or `J`.
#[allow(clippy::too_many_arguments)]
pub fn factor_grad(
    a: &ArrayView1<f64>,
    u: &ArrayView2<f64>,
    v: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    grad_d: &ArrayView1<f64>,
    grad_w: &ArrayView2<f64>,
) -> CeleriteResult<FactorGradients> {
    factor_grad_with_config(
        a,
        u,
        v,
        p,
        d,
        w,
        grad_d,
        grad_w,
        &AdjointConfig::default(),
    )
}

/// Gradient of `factor` with an explicit replay configuration
#[allow(clippy::too_many_arguments)]
pub fn factor_grad_with_config(
    a: &ArrayView1<f64>,
    u: &ArrayView2<f64>,
    v: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    grad_d: &ArrayView1<f64>,
    grad_w: &ArrayView2<f64>,
    config: &AdjointConfig,
) -> CeleriteResult<FactorGradients> {
    let system = SemiseparableSystem::new(a.view(), u.view(), v.view(), p.view())?;
    check_outputs(&system, d, w, grad_d, grad_w)?;

    let mut replay = StateReplay::new(d.view(), w.view(), p.view(), config.strategy)?;
    let verify = config.verify_replay.then_some(config.replay_tolerance);
    backward_sweep(&system, d, w, grad_d, grad_w, &mut replay, verify)
}

/// Gradient of `factor` using the states cached by `factor_with_tape`
pub fn factor_grad_with_tape(
    system: &SemiseparableSystem<'_>,
    fact: &Factorization,
    tape: &StateTape,
    cotangent: &FactorCotangent,
) -> CeleriteResult<FactorGradients> {
    let (d, w) = (fact.d.view(), fact.w.view());
    let (grad_d, grad_w) = (cotangent.d.view(), cotangent.w.view());
    check_outputs(system, &d, &w, &grad_d, &grad_w)?;
    let states = tape.as_array().shape();
    check_len("tape", 0, system.len(), states[0])?;
    check_len("tape", 1, system.rank(), states[1])?;
    check_len("tape", 2, system.rank(), states[2])?;

    let mut source = tape;
    backward_sweep(system, &d, &w, &grad_d, &grad_w, &mut source, None)
}

fn check_outputs(
    system: &SemiseparableSystem<'_>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    grad_d: &ArrayView1<f64>,
    grad_w: &ArrayView2<f64>,
) -> CeleriteResult<()> {
    let (n, j) = (system.len(), system.rank());
    check_len("d", 0, n, d.len())?;
    check_len("W", 0, n, w.nrows())?;
    check_len("W", 1, j, w.ncols())?;
    check_len("grad_d", 0, n, grad_d.len())?;
    check_len("grad_W", 0, n, grad_w.nrows())?;
    check_len("grad_W", 1, j, grad_w.ncols())?;
    Ok(())
}

fn backward_sweep<S: StateSource>(
    system: &SemiseparableSystem<'_>,
    d: &ArrayView1<f64>,
    w: &ArrayView2<f64>,
    grad_d: &ArrayView1<f64>,
    grad_w: &ArrayView2<f64>,
    states: &mut S,
    verify: Option<f64>,
) -> CeleriteResult<FactorGradients> {
    let (n_obs, rank) = (system.len(), system.rank());
    let (a, u, v, p) = (system.a(), system.u(), system.v(), system.p());

    log::debug!("celerite factor_grad: N={}, J={}", n_obs, rank);

    let mut grads = FactorGradients::zeros(n_obs, rank);
    let mut s = Array2::<f64>::zeros((rank, rank));
    let mut bs = Array2::<f64>::zeros((rank, rank));
    let mut t = Array1::<f64>::zeros(rank);
    let mut bt = Array1::<f64>::zeros(rank);
    let mut st = Array1::<f64>::zeros(rank);
    let mut bw = Array1::<f64>::zeros(rank);

    for n in (0..n_obs).rev() {
        states.load(n, &mut s)?;
        let (dn, wn, un) = (d[n], w.row(n), u.row(n));
        let mut bd = grad_d[n];
        bw.assign(&grad_w.row(n));

        row_times_state(&un, &s.view(), &mut t);

        if let Some(tol) = verify {
            let expected = a[n] - dot(&t.view(), &un);
            if (expected - dn).abs() > tol * dn.abs().max(1.0) {
                return Err(CeleriteError::InvalidInput(format!(
                    "saved pivot d[{}] = {} does not match the inputs (expected {})",
                    n, dn, expected
                )));
            }
            for k in 0..rank {
                let expected = (v[[n, k]] - t[k]) / dn;
                if (expected - wn[k]).abs() > tol * wn[k].abs().max(1.0) {
                    return Err(CeleriteError::InvalidInput(format!(
                        "saved W[{}, {}] = {} does not match the inputs (expected {})",
                        n, k, wn[k], expected
                    )));
                }
            }
        }

        // Pull S̄_{n+1} back through S_{n+1} = (S_n + d_n w_nᵀ w_n) ∘ (p_nᵀ p_n)
        if n + 1 < n_obs {
            let pn = p.row(n);
            let mut gp = grads.p.row_mut(n);
            for k in 0..rank {
                for l in 0..rank {
                    let m = s[[k, l]] + dn * wn[k] * wn[l];
                    let gq = bs[[k, l]] * m;
                    gp[k] += gq * pn[l];
                    gp[l] += gq * pn[k];

                    let gm = bs[[k, l]] * pn[k] * pn[l];
                    bs[[k, l]] = gm;
                    bd += gm * wn[k] * wn[l];
                    bw[k] += dn * gm * wn[l];
                    bw[l] += dn * gm * wn[k];
                }
            }
        } else {
            bs.fill(0.0);
        }

        // w_n = (v_n − t_n) / d_n
        bd -= dot(&bw.view(), &wn) / dn;
        for k in 0..rank {
            grads.v[[n, k]] = bw[k] / dn;
            bt[k] = -bw[k] / dn - bd * un[k];
        }

        // d_n = a_n − t_n u_nᵀ
        grads.a[n] = bd;

        // t_n = u_n S_n
        state_times_col(&s.view(), &bt.view(), &mut st);
        for k in 0..rank {
            grads.u[[n, k]] = st[k] - bd * t[k];
            for l in 0..rank {
                bs[[k, l]] += un[k] * bt[l];
            }
        }
    }

    Ok(grads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use celerite_core::{factor, factor_with_tape};
    use scirs2_core::ndarray_ext::array;

    #[test]
    fn test_single_point_gradients() {
        // N = 1: d = a, w = v / a
        let a = array![2.0];
        let u = array![[0.3]];
        let v = array![[0.8]];
        let p = Array2::<f64>::zeros((0, 1));
        let fact = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap();

        let grad_d = array![1.5];
        let grad_w = array![[0.5]];
        let g = factor_grad(
            &a.view(),
            &u.view(),
            &v.view(),
            &p.view(),
            &fact.d.view(),
            &fact.w.view(),
            &grad_d.view(),
            &grad_w.view(),
        )
        .unwrap();

        // ∂/∂a (1.5 a + 0.5 v / a) = 1.5 − 0.5 v / a²
        assert!((g.a[0] - (1.5 - 0.5 * 0.8 / 4.0)).abs() < 1e-15);
        assert!((g.v[[0, 0]] - 0.25).abs() < 1e-15);
        assert_eq!(g.u[[0, 0]], 0.0);
        assert_eq!(g.p.shape(), &[0, 1]);
    }

    #[test]
    fn test_two_point_gradient_on_last_pivot() {
        // d₁ = a₁ − u₁² d₀ w₀² p₀² = a₁ − u₁² v₀² p₀² / a₀
        let a = array![1.0, 1.0];
        let u = array![[1.0], [1.0]];
        let v = array![[0.5], [0.5]];
        let p = array![[0.9]];
        let fact = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap();

        let grad_d = array![0.0, 1.0];
        let grad_w = Array2::<f64>::zeros((2, 1));
        let g = factor_grad(
            &a.view(),
            &u.view(),
            &v.view(),
            &p.view(),
            &fact.d.view(),
            &fact.w.view(),
            &grad_d.view(),
            &grad_w.view(),
        )
        .unwrap();

        let s1 = 0.25 * 0.81;
        assert!((g.a[1] - 1.0).abs() < 1e-15);
        assert!((g.a[0] - s1).abs() < 1e-14);
        assert!((g.u[[1, 0]] + 2.0 * s1).abs() < 1e-14);
        assert!((g.u[[0, 0]]).abs() < 1e-15);
        assert!((g.v[[0, 0]] + 2.0 * 0.5 * 0.81).abs() < 1e-14);
        assert!((g.p[[0, 0]] + 2.0 * 0.25 * 0.9).abs() < 1e-14);
    }

    #[test]
    fn test_rejects_mismatched_cotangent() {
        let a = array![1.0, 1.0];
        let u = array![[1.0], [1.0]];
        let v = array![[0.5], [0.5]];
        let p = array![[0.9]];
        let fact = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap();

        let grad_d = array![1.0];
        let grad_w = Array2::<f64>::zeros((2, 1));
        let err = factor_grad(
            &a.view(),
            &u.view(),
            &v.view(),
            &p.view(),
            &fact.d.view(),
            &fact.w.view(),
            &grad_d.view(),
            &grad_w.view(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CeleriteError::ShapeMismatch {
                argument: "grad_d",
                ..
            }
        ));
    }

    #[test]
    fn test_tape_of_wrong_rank_is_rejected() {
        let rs_small = celerite_core::testing::random_system(4, 1, 3);
        let rs_wide = celerite_core::testing::random_system(4, 2, 3);
        let (fact, _) = factor_with_tape(
            &rs_small.a.view(),
            &rs_small.u.view(),
            &rs_small.v.view(),
            &rs_small.p.view(),
        )
        .unwrap();
        let (_, wide_tape) = factor_with_tape(
            &rs_wide.a.view(),
            &rs_wide.u.view(),
            &rs_wide.v.view(),
            &rs_wide.p.view(),
        )
        .unwrap();

        let err = factor_grad_with_tape(
            &rs_small.system().unwrap(),
            &fact,
            &wide_tape,
            &FactorCotangent::zeros(4, 1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CeleriteError::ShapeMismatch {
                argument: "tape",
                axis: 1,
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_verify_replay_rejects_corrupted_last_w_row() {
        // W[N-1] never feeds a replayed state, only the direct check sees it
        let rs = celerite_core::testing::random_system(6, 2, 12);
        let mut fact = factor(&rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view()).unwrap();
        fact.w[[5, 1]] += 0.05;

        let config = AdjointConfig {
            verify_replay: true,
            ..AdjointConfig::default()
        };
        let cot = FactorCotangent::zeros(6, 2);
        let err = factor_grad_with_config(
            &rs.a.view(),
            &rs.u.view(),
            &rs.v.view(),
            &rs.p.view(),
            &fact.d.view(),
            &fact.w.view(),
            &cot.d.view(),
            &cot.w.view(),
            &config,
        )
        .unwrap_err();
        match err {
            CeleriteError::InvalidInput(msg) => assert!(msg.contains("W[5, 1]"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_verify_replay_accepts_own_outputs() {
        let rs = celerite_core::testing::random_system(30, 3, 4);
        let fact = factor(&rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view()).unwrap();
        let config = AdjointConfig {
            verify_replay: true,
            ..AdjointConfig::default()
        };
        let cot = FactorCotangent::new(Array1::ones(30), Array2::ones((30, 3)));
        assert!(factor_grad_with_config(
            &rs.a.view(),
            &rs.u.view(),
            &rs.v.view(),
            &rs.p.view(),
            &fact.d.view(),
            &fact.w.view(),
            &cot.d.view(),
            &cot.w.view(),
            &config,
        )
        .is_ok());
    }

    #[test]
    fn test_verify_replay_rejects_foreign_outputs() {
        let a = array![1.0, 1.0];
        let u = array![[1.0], [1.0]];
        let v = array![[0.5], [0.5]];
        let p = array![[0.9]];
        let mut fact = factor(&a.view(), &u.view(), &v.view(), &p.view()).unwrap();
        fact.d[1] += 0.1;

        let config = AdjointConfig {
            verify_replay: true,
            ..AdjointConfig::default()
        };
        let cot = FactorCotangent::zeros(2, 1);
        let err = factor_grad_with_config(
            &a.view(),
            &u.view(),
            &v.view(),
            &p.view(),
            &fact.d.view(),
            &fact.w.view(),
            &cot.d.view(),
            &cot.w.view(),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, CeleriteError::InvalidInput(_)));
    }
}
