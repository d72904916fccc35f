//! Gaussian-process likelihood, log-determinant gradient and prediction
//!
//! Run with: cargo run -p celerite --example gp_likelihood --features tracing

use anyhow::Result;
use celerite::prelude::*;
use celerite::tracing_support::{
    init_tracing, record_factorization, record_gradients, record_log_likelihood, TracingConfig,
};
use scirs2_core::ndarray_ext::Array1;
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn main() -> Result<()> {
    init_tracing(TracingConfig::default())?;

    println!("=== celerite Gaussian process example ===\n");

    // Irregularly sampled noisy sinusoid
    let mut rng = StdRng::seed_from_u64(1234);
    let mut x: Vec<f64> = (0..500).map(|_| rng.random_range(0.0..20.0)).collect();
    x.sort_by(|a, b| a.total_cmp(b));
    let x = Array1::from_vec(x);
    let yerr = Array1::from_shape_fn(x.len(), |_| rng.random_range(0.1..0.3));
    let y = Array1::from_shape_fn(x.len(), |i| x[i].sin() + yerr[i] * rng.random_range(-1.0..1.0));
    let diag = yerr.mapv(|e| e * e);

    // Kernel: one underdamped oscillator plus a slow trend
    let sho = SHOTerm::new(1.0, 3.0, 1.0)?.coefficients();
    let trend = RealTerm::new(0.2, 0.05)?.coefficients();
    let kernel = TermCoefficients::new(
        trend.ar.clone(),
        trend.cr.clone(),
        sho.ac.clone(),
        sho.bc.clone(),
        sho.cc.clone(),
        sho.dc.clone(),
    )?;
    let m = kernel.celerite_matrices(&x.view(), &diag.view())?;
    println!("N = {}, J = {}", x.len(), kernel.rank());

    // Forward pass
    let op = FactorOp::forward(&m.a.view(), &m.u.view(), &m.v.view(), &m.p.view())?;
    let fact = op.outputs();
    let ll = log_likelihood(
        &m.u.view(),
        &m.p.view(),
        &fact.d.view(),
        &fact.w.view(),
        &y.view(),
    )?;
    let summary = record_factorization(fact);
    record_log_likelihood(x.len(), ll);
    println!("log-likelihood: {:.6}", ll);
    println!("log-determinant: {:.6}", summary.log_det);
    println!("pivot ratio: {:.3e}", summary.pivot_ratio());

    // ∂ ln|K| / ∂a is the diagonal of K⁻¹
    let cot = FactorCotangent::new(fact.d.mapv(|d| 1.0 / d), op.zero_w());
    let grads = op.vjp(&cot)?;
    let norms = record_gradients(&grads);
    println!("|∂ln|K|/∂(a, U, V, P)|: {:.4}", norms.total_norm());
    println!(
        "∂ln|K|/∂a: min {:.4}, max {:.4}",
        grads.a.iter().cloned().fold(f64::INFINITY, f64::min),
        grads.a.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    );

    // Predict on a regular grid
    let alpha = solve_vec(
        &m.u.view(),
        &m.p.view(),
        &fact.d.view(),
        &fact.w.view(),
        &y.view(),
    )?;
    let t = Array1::linspace(-1.0, 21.0, 12);
    let cm = kernel.conditional_matrices(&x.view(), &t.view())?;
    let mu = conditional_mean(
        &m.u.view(),
        &m.v.view(),
        &m.p.view(),
        &alpha.view(),
        &cm.u_star.view(),
        &cm.v_star.view(),
        &cm.inds,
    )?;

    println!("\n   t        mean     sin(t)");
    for (tv, mv) in t.iter().zip(mu.iter()) {
        println!("{:6.2}  {:9.4}  {:9.4}", tv, mv, tv.sin());
    }

    // Independent systems in one call
    let systems = [m.system()?, m.system()?];
    let results = factor_batch(&systems);
    println!(
        "\nbatch: {} of {} systems factorized",
        results.iter().filter(|r| r.is_ok()).count(),
        results.len()
    );

    Ok(())
}
