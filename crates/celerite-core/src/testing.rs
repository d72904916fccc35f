//! Reproducible random positive-definite systems
//!
//! Used by the test suites and benchmarks of the celerite crates. The
//! generated matrix is a sum of `J` scaled exponential kernels plus white
//! noise,
//!
//! ```text
//! K[n, m] = δₙₘ σ²ₙ + Σⱼ αⱼ sₙ sₘ exp(−cⱼ |xₙ − xₘ|)
//! ```
//!
//! which is positive definite for any positive `αⱼ`, `cⱼ`, `sₙ`, `σₙ`.

use crate::error::CeleriteResult;
use crate::system::SemiseparableSystem;
use scirs2_core::ndarray_ext::{Array1, Array2};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

/// Owned inputs `(a, U, V, P)` of one factorization call
#[derive(Debug, Clone, PartialEq)]
pub struct RandomSystem {
    pub a: Array1<f64>,
    pub u: Array2<f64>,
    pub v: Array2<f64>,
    pub p: Array2<f64>,
}

impl RandomSystem {
    /// Borrow as a validated system
    pub fn system(&self) -> CeleriteResult<SemiseparableSystem<'_>> {
        SemiseparableSystem::new(self.a.view(), self.u.view(), self.v.view(), self.p.view())
    }
}

/// Draw a positive-definite system with `n` points and rank `j`
pub fn random_system(n: usize, j: usize, seed: u64) -> RandomSystem {
    let mut rng = StdRng::seed_from_u64(seed);

    let amps: Vec<f64> = (0..j).map(|_| rng.random_range(0.2..1.5)).collect();
    let rates: Vec<f64> = (0..j).map(|_| rng.random_range(0.5..3.0)).collect();

    let mut x = Vec::with_capacity(n);
    let mut t = 0.0;
    for _ in 0..n {
        t += rng.random_range(0.01..0.3);
        x.push(t);
    }
    let scales: Vec<f64> = (0..n).map(|_| rng.random_range(0.5..1.5)).collect();
    let noise: Vec<f64> = (0..n).map(|_| rng.random_range(0.3..0.8)).collect();

    let u = Array2::from_shape_fn((n, j), |(i, k)| amps[k] * scales[i]);
    let v = Array2::from_shape_fn((n, j), |(i, _)| scales[i]);
    let p = Array2::from_shape_fn((n.saturating_sub(1), j), |(i, k)| {
        (-rates[k] * (x[i + 1] - x[i])).exp()
    });
    let a = Array1::from_shape_fn(n, |i| {
        noise[i] * noise[i] + amps.iter().map(|&amp| amp * scales[i] * scales[i]).sum::<f64>()
    });

    RandomSystem { a, u, v, p }
}
