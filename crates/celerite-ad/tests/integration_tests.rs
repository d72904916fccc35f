//! Integration tests for celerite-ad
//!
//! These tests verify the adjoint against finite differences and against
//! every way of recovering the running corrections.

use anyhow::Result;
use celerite_ad::gradcheck::{check_factor_gradient, GradCheckConfig};
use celerite_ad::{
    factor_grad, factor_grad_with_config, factor_grad_with_tape, AdjointConfig,
    CheckpointStrategy, FactorCotangent, FactorOp, VjpOp,
};
use celerite_core::testing::random_system;
use celerite_core::{factor, factor_with_tape};
use scirs2_core::ndarray_ext::{Array1, Array2};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

const N: usize = 10;
const J: usize = 2;

/// One-hot cotangents: checks every output element against every input element
#[test]
fn test_full_jacobian_against_finite_differences() -> Result<()> {
    let rs = random_system(N, J, 1234);
    let config = GradCheckConfig {
        epsilon: 1e-6,
        atol: 1e-5,
        ..GradCheckConfig::default()
    };

    for n in 0..N {
        let mut cot = FactorCotangent::zeros(N, J);
        cot.d[n] = 1.0;
        let report = check_factor_gradient(
            &rs.a.view(),
            &rs.u.view(),
            &rs.v.view(),
            &rs.p.view(),
            &cot,
            &config,
        )?;
        assert!(report.passed(), "d[{}]: {:?}", n, report);
        assert!(report.max_abs_diff() < 1e-5);

        for k in 0..J {
            let mut cot = FactorCotangent::zeros(N, J);
            cot.w[[n, k]] = 1.0;
            let report = check_factor_gradient(
                &rs.a.view(),
                &rs.u.view(),
                &rs.v.view(),
                &rs.p.view(),
                &cot,
                &config,
            )?;
            assert!(report.passed(), "W[{}, {}]: {:?}", n, k, report);
            assert!(report.max_abs_diff() < 1e-5);
        }
    }
    Ok(())
}

/// Dense cotangents on a few different random systems
#[test]
fn test_gradcheck_random_systems() -> Result<()> {
    for seed in [3, 14, 15, 92] {
        let rs = random_system(N, J, seed);
        let cot = FactorCotangent::new(
            Array1::from_shape_fn(N, |i| ((i as f64) * 0.7 + seed as f64).sin()),
            Array2::from_shape_fn((N, J), |(i, k)| ((i * J + k) as f64 * 0.3).cos()),
        );
        let report = check_factor_gradient(
            &rs.a.view(),
            &rs.u.view(),
            &rs.v.view(),
            &rs.p.view(),
            &cot,
            &GradCheckConfig::default(),
        )?;
        assert!(report.passed(), "seed {}: {:?}", seed, report);
    }
    Ok(())
}

/// Every checkpoint strategy and the cached tape give identical gradients
/// U and V drawn independently, signed entries, no kernel structure
#[test]
fn test_gradcheck_independent_u_and_v() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(2718);
    let u = Array2::from_shape_fn((N, J), |_| rng.random_range(-1.0..1.0));
    let v = Array2::from_shape_fn((N, J), |_| rng.random_range(-1.0..1.0));
    let p = Array2::from_shape_fn((N - 1, J), |_| rng.random_range(0.1..0.5));
    // off-diagonal row sums stay below 2J, so this diagonal keeps K positive definite
    let a = Array1::from_elem(N, 2.0 * J as f64 + 1.0);
    assert_ne!(u, v);

    let cot = FactorCotangent::new(
        Array1::from_shape_fn(N, |_| rng.random_range(-1.0..1.0)),
        Array2::from_shape_fn((N, J), |_| rng.random_range(-1.0..1.0)),
    );
    let report = check_factor_gradient(
        &a.view(),
        &u.view(),
        &v.view(),
        &p.view(),
        &cot,
        &GradCheckConfig::default(),
    )?;
    assert!(report.passed(), "{:?}", report);

    let fact = factor(&a.view(), &u.view(), &v.view(), &p.view())?;
    let grads = factor_grad(
        &a.view(),
        &u.view(),
        &v.view(),
        &p.view(),
        &fact.d.view(),
        &fact.w.view(),
        &cot.d.view(),
        &cot.w.view(),
    )?;
    // with U != V the two input gradients carry different information
    assert!((&grads.u - &grads.v).iter().any(|x| x.abs() > 1e-8));
    Ok(())
}

#[test]
fn test_strategies_are_bit_identical() -> Result<()> {
    let rs = random_system(64, 3, 77);
    let (fact, tape) = factor_with_tape(&rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view())?;
    let cot = FactorCotangent::new(
        Array1::from_shape_fn(64, |i| 1.0 / (1.0 + i as f64)),
        Array2::from_shape_fn((64, 3), |(i, k)| (i as f64 - 2.0 * k as f64) * 0.01),
    );

    let reference = factor_grad_with_tape(&rs.system()?, &fact, &tape, &cot)?;

    for strategy in [
        CheckpointStrategy::All,
        CheckpointStrategy::Sqrt,
        CheckpointStrategy::Uniform { interval: 1 },
        CheckpointStrategy::Uniform { interval: 9 },
    ] {
        let config = AdjointConfig {
            strategy,
            verify_replay: true,
            ..AdjointConfig::default()
        };
        let grads = factor_grad_with_config(
            &rs.a.view(),
            &rs.u.view(),
            &rs.v.view(),
            &rs.p.view(),
            &fact.d.view(),
            &fact.w.view(),
            &cot.d.view(),
            &cot.w.view(),
            &config,
        )?;
        assert_eq!(grads, reference, "strategy {:?}", strategy);
    }
    Ok(())
}

/// Repeated backward passes are bit-for-bit identical
#[test]
fn test_adjoint_is_deterministic() -> Result<()> {
    let rs = random_system(200, 4, 5);
    let op = FactorOp::forward(&rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view())?;
    let cot = FactorCotangent::new(Array1::ones(200), Array2::ones((200, 4)));

    let first = op.vjp(&cot)?;
    for _ in 0..3 {
        assert_eq!(op.vjp(&cot)?, first);
    }
    Ok(())
}

/// Gradient of the log-determinant: ∂ ln|K| / ∂a_n = (K⁻¹)_nn
#[test]
fn test_log_det_gradient_is_inverse_diagonal() -> Result<()> {
    let rs = random_system(12, 2, 8);
    let fact = factor(&rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view())?;

    let grad_d = fact.d.mapv(|d| 1.0 / d);
    let grad_w = Array2::<f64>::zeros((12, 2));
    let grads = factor_grad(
        &rs.a.view(),
        &rs.u.view(),
        &rs.v.view(),
        &rs.p.view(),
        &fact.d.view(),
        &fact.w.view(),
        &grad_d.view(),
        &grad_w.view(),
    )?;

    let dense = celerite_core::dense::to_dense(&rs.system()?);
    let inv = invert_spd(&dense);
    for n in 0..12 {
        assert!(
            (grads.a[n] - inv[[n, n]]).abs() < 1e-10,
            "n={}: {} vs {}",
            n,
            grads.a[n],
            inv[[n, n]]
        );
    }
    Ok(())
}

/// Zero rank: the factorization is the identity map on `a`
#[test]
fn test_zero_rank_gradients() -> Result<()> {
    let a = Array1::from_vec(vec![1.0, 2.0, 3.0]);
    let empty = Array2::<f64>::zeros((3, 0));
    let p = Array2::<f64>::zeros((2, 0));
    let op = FactorOp::forward(&a.view(), &empty.view(), &empty.view(), &p.view())?;

    let cot = FactorCotangent::new(Array1::from_vec(vec![4.0, 5.0, 6.0]), empty.clone());
    let grads = op.vjp(&cot)?;
    assert_eq!(grads.a, cot.d);
    assert_eq!(grads.u.shape(), &[3, 0]);
    assert_eq!(grads.p.shape(), &[2, 0]);
    Ok(())
}

fn invert_spd(k: &Array2<f64>) -> Array2<f64> {
    // Gauss-Jordan; the test matrices are small and well conditioned
    let n = k.nrows();
    let mut m = k.clone();
    let mut inv = Array2::<f64>::eye(n);
    for col in 0..n {
        let pivot = m[[col, col]];
        for c in 0..n {
            m[[col, c]] /= pivot;
            inv[[col, c]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let f = m[[row, col]];
                for c in 0..n {
                    m[[row, c]] -= f * m[[col, c]];
                    inv[[row, c]] -= f * inv[[col, c]];
                }
            }
        }
    }
    inv
}
