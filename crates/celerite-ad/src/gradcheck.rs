//! Gradient checking utilities
//!
//! Verifies the analytic adjoint against finite differences of the scalar
//!
//! ```text
//! L(a, U, V, P) = ⟨ḡ_d, d⟩ + ⟨ḡ_W, W⟩
//! ```
//!
//! whose gradient is exactly what `factor_grad` returns for the cotangent
//! `(ḡ_d, ḡ_W)`.
//!
//! # Finite Difference Methods
//!
//! - **Central difference**: `f'(x) ≈ [f(x+h) - f(x-h)] / (2h)` (more accurate)
//! - **Forward difference**: `f'(x) ≈ [f(x+h) - f(x)] / h` (faster)
//!
//! # Example
//!
//! ```
//! use celerite_ad::gradcheck::{check_factor_gradient, GradCheckConfig};
//! use celerite_ad::FactorCotangent;
//! use celerite_core::testing::random_system;
//! use scirs2_core::ndarray_ext::{Array1, Array2};
//!
//! let rs = random_system(8, 2, 0);
//! let cot = FactorCotangent::new(Array1::ones(8), Array2::ones((8, 2)));
//! let report = check_factor_gradient(
//!     &rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view(),
//!     &cot, &GradCheckConfig::default(),
//! )?;
//! assert!(report.passed());
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::adjoint::{factor_grad, FactorCotangent, FactorGradients};
use anyhow::{anyhow, Result};
use celerite_core::factor;
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2};

/// Gradient checking configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GradCheckConfig {
    /// Step size for finite differences (default: 1e-6)
    pub epsilon: f64,

    /// Relative tolerance for gradient comparison (default: 1e-4)
    pub rtol: f64,

    /// Absolute tolerance for gradient comparison (default: 1e-5)
    pub atol: f64,

    /// Use central difference (more accurate but 2x slower)
    pub use_central_diff: bool,

    /// Log every mismatching element
    pub verbose: bool,
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            rtol: 1e-4,
            atol: 1e-5,
            use_central_diff: true,
            verbose: false,
        }
    }
}

/// Result of gradient checking for one input
#[derive(Debug, Clone)]
pub struct GradCheckResult {
    /// Maximum absolute difference between analytical and numerical gradients
    pub max_abs_diff: f64,

    /// Maximum relative difference
    pub max_rel_diff: f64,

    /// Whether the gradient check passed
    pub passed: bool,

    /// Number of elements checked
    pub num_elements: usize,

    /// Number of elements that failed the check
    pub num_failures: usize,
}

/// Gradient check of every input of the factorization
#[derive(Debug, Clone)]
pub struct FactorGradCheck {
    pub a: GradCheckResult,
    pub u: GradCheckResult,
    pub v: GradCheckResult,
    pub p: GradCheckResult,
}

impl FactorGradCheck {
    /// Whether all four inputs passed
    pub fn passed(&self) -> bool {
        self.a.passed && self.u.passed && self.v.passed && self.p.passed
    }

    /// Largest absolute difference across all inputs
    pub fn max_abs_diff(&self) -> f64 {
        [&self.a, &self.u, &self.v, &self.p]
            .iter()
            .map(|r| r.max_abs_diff)
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy)]
enum Input {
    A,
    U,
    V,
    P,
}

#[derive(Clone)]
struct Inputs {
    a: Array1<f64>,
    u: Array2<f64>,
    v: Array2<f64>,
    p: Array2<f64>,
}

impl Inputs {
    fn len(&self, which: Input) -> usize {
        match which {
            Input::A => self.a.len(),
            Input::U => self.u.len(),
            Input::V => self.v.len(),
            Input::P => self.p.len(),
        }
    }

    fn element_mut(&mut self, which: Input, idx: usize) -> Option<&mut f64> {
        match which {
            Input::A => self.a.iter_mut().nth(idx),
            Input::U => self.u.iter_mut().nth(idx),
            Input::V => self.v.iter_mut().nth(idx),
            Input::P => self.p.iter_mut().nth(idx),
        }
    }

    fn perturbed(&self, which: Input, idx: usize, delta: f64) -> Result<Self> {
        let mut out = self.clone();
        let value = out
            .element_mut(which, idx)
            .ok_or_else(|| anyhow!("Index error"))?;
        *value += delta;
        Ok(out)
    }
}

/// Check the adjoint of `factor` against finite differences
///
/// # Arguments
///
/// * `a`, `u`, `v`, `p` - Point at which to check
/// * `cotangent` - Upstream gradient `(ḡ_d, ḡ_W)`
/// * `config` - Gradient checking configuration
///
/// # Errors
///
/// Fails if the factorization or its adjoint fails at the point or at any
/// perturbed point (a step that leaves the positive-definite cone).
pub fn check_factor_gradient(
    a: &ArrayView1<f64>,
    u: &ArrayView2<f64>,
    v: &ArrayView2<f64>,
    p: &ArrayView2<f64>,
    cotangent: &FactorCotangent,
    config: &GradCheckConfig,
) -> Result<FactorGradCheck> {
    let fact = factor(a, u, v, p)?;
    let analytical: FactorGradients = factor_grad(
        a,
        u,
        v,
        p,
        &fact.d.view(),
        &fact.w.view(),
        &cotangent.d.view(),
        &cotangent.w.view(),
    )?;

    let inputs = Inputs {
        a: a.to_owned(),
        u: u.to_owned(),
        v: v.to_owned(),
        p: p.to_owned(),
    };

    Ok(FactorGradCheck {
        a: check_input(&inputs, Input::A, analytical.a.iter(), cotangent, config)?,
        u: check_input(&inputs, Input::U, analytical.u.iter(), cotangent, config)?,
        v: check_input(&inputs, Input::V, analytical.v.iter(), cotangent, config)?,
        p: check_input(&inputs, Input::P, analytical.p.iter(), cotangent, config)?,
    })
}

fn objective(inputs: &Inputs, cotangent: &FactorCotangent) -> Result<f64> {
    let fact = factor(
        &inputs.a.view(),
        &inputs.u.view(),
        &inputs.v.view(),
        &inputs.p.view(),
    )?;
    let on_d: f64 = fact.d.iter().zip(cotangent.d.iter()).map(|(x, g)| x * g).sum();
    let on_w: f64 = fact.w.iter().zip(cotangent.w.iter()).map(|(x, g)| x * g).sum();
    Ok(on_d + on_w)
}

/// Compute one numerical partial derivative
fn numerical_partial(
    inputs: &Inputs,
    which: Input,
    idx: usize,
    base: f64,
    cotangent: &FactorCotangent,
    config: &GradCheckConfig,
) -> Result<f64> {
    let h = config.epsilon;
    let f_plus = objective(&inputs.perturbed(which, idx, h)?, cotangent)?;

    if config.use_central_diff {
        let f_minus = objective(&inputs.perturbed(which, idx, -h)?, cotangent)?;
        Ok((f_plus - f_minus) / (2.0 * h))
    } else {
        Ok((f_plus - base) / h)
    }
}

/// Compare analytical and numerical gradients for one input
fn check_input<'g>(
    inputs: &Inputs,
    which: Input,
    analytical: impl Iterator<Item = &'g f64>,
    cotangent: &FactorCotangent,
    config: &GradCheckConfig,
) -> Result<GradCheckResult> {
    let base = if config.use_central_diff {
        0.0
    } else {
        objective(inputs, cotangent)?
    };

    let mut max_abs_diff = 0.0_f64;
    let mut max_rel_diff = 0.0_f64;
    let mut num_failures = 0;
    let num_elements = inputs.len(which);

    for (idx, &a_val) in analytical.enumerate() {
        let n_val = numerical_partial(inputs, which, idx, base, cotangent, config)?;

        let abs_diff = (a_val - n_val).abs();
        let rel_diff = if n_val.abs() > f64::EPSILON {
            abs_diff / n_val.abs()
        } else {
            abs_diff
        };

        max_abs_diff = max_abs_diff.max(abs_diff);
        max_rel_diff = max_rel_diff.max(rel_diff);

        // Check if this element fails
        if abs_diff > config.atol && rel_diff > config.rtol {
            num_failures += 1;

            if config.verbose {
                log::info!(
                    "Gradient mismatch for {:?}[{}]: analytical={}, numerical={}, abs_diff={:.2e}, rel_diff={:.2e}",
                    which,
                    idx,
                    a_val,
                    n_val,
                    abs_diff,
                    rel_diff
                );
            }
        }
    }

    let passed = num_failures == 0;
    if config.verbose {
        log::info!(
            "Gradient check for {:?}: {} ({}/{} failures, max abs {:.2e}, max rel {:.2e})",
            which,
            if passed { "passed" } else { "failed" },
            num_failures,
            num_elements,
            max_abs_diff,
            max_rel_diff
        );
    }

    Ok(GradCheckResult {
        max_abs_diff,
        max_rel_diff,
        passed,
        num_elements,
        num_failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use celerite_core::testing::random_system;

    #[test]
    fn test_gradcheck_small_system() {
        let rs = random_system(10, 2, 1234);
        let cot = FactorCotangent::new(
            Array1::from_shape_fn(10, |i| 1.0 + 0.1 * i as f64),
            Array2::from_shape_fn((10, 2), |(i, k)| 0.5 - 0.05 * (i * 2 + k) as f64),
        );

        let report = check_factor_gradient(
            &rs.a.view(),
            &rs.u.view(),
            &rs.v.view(),
            &rs.p.view(),
            &cot,
            &GradCheckConfig::default(),
        )
        .unwrap();

        assert!(report.passed(), "{:?}", report);
        assert!(report.max_abs_diff() < 1e-5);
        assert_eq!(report.a.num_elements, 10);
        assert_eq!(report.u.num_elements, 20);
        assert_eq!(report.p.num_elements, 18);
    }

    #[test]
    fn test_gradcheck_forward_difference() {
        let rs = random_system(5, 1, 9);
        let cot = FactorCotangent::new(Array1::ones(5), Array2::zeros((5, 1)));
        let config = GradCheckConfig {
            epsilon: 1e-7,
            use_central_diff: false,
            rtol: 1e-3,
            atol: 1e-4,
            ..GradCheckConfig::default()
        };

        let report = check_factor_gradient(
            &rs.a.view(),
            &rs.u.view(),
            &rs.v.view(),
            &rs.p.view(),
            &cot,
            &config,
        )
        .unwrap();
        assert!(report.passed(), "{:?}", report);
    }

    #[test]
    fn test_gradcheck_detects_wrong_gradient() {
        let rs = random_system(6, 1, 21);
        let inputs = Inputs {
            a: rs.a.clone(),
            u: rs.u.clone(),
            v: rs.v.clone(),
            p: rs.p.clone(),
        };
        let cot = FactorCotangent::new(Array1::ones(6), Array2::zeros((6, 1)));

        // ∂(Σ d)/∂a₀ is 1 plus the coupling terms, never 0
        let wrong = Array1::<f64>::zeros(6);
        let result = check_input(
            &inputs,
            Input::A,
            wrong.iter(),
            &cot,
            &GradCheckConfig::default(),
        )
        .unwrap();

        assert!(!result.passed);
        assert!(result.num_failures > 0);
        assert!(result.max_abs_diff > 0.5);
    }
}
