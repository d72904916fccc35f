//! Vector-Jacobian Product (VJP) wrapper for the factorization
//!
//! A differentiable-programming layer needs two things from an operator:
//! its outputs, and a rule mapping output cotangents to input cotangents.
//! [`FactorOp`] records one forward call and provides that rule through
//! [`VjpOp`], without any registration or dispatch machinery.
//!
//! # Example
//!
//! ```
//! use celerite_ad::{FactorCotangent, FactorOp, VjpOp};
//! use scirs2_core::ndarray_ext::array;
//!
//! // Forward pass
//! let op = FactorOp::forward(
//!     &array![1.0, 1.0].view(),
//!     &array![[1.0], [1.0]].view(),
//!     &array![[0.5], [0.5]].view(),
//!     &array![[0.9]].view(),
//! )?;
//! let log_det = op.outputs().log_det();
//!
//! // Backward pass for L = ln|K|: ∂L/∂d = 1 / d
//! let cot = FactorCotangent::new(op.outputs().d.mapv(|d| 1.0 / d), op.zero_w());
//! let grads = op.vjp(&cot)?;
//! assert_eq!(grads.a.len(), 2);
//! # let _ = log_det;
//! # Ok::<(), celerite_core::CeleriteError>(())
//! ```

use crate::adjoint::{factor_grad_with_config, factor_grad_with_tape};
use crate::adjoint::{FactorCotangent, FactorGradients};
use crate::checkpoint::AdjointConfig;
use celerite_core::{
    factor, factor_with_tape, CeleriteResult, Factorization, SemiseparableSystem, StateTape,
};
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2};

/// Trait for operations that support VJP (backward differentiation)
pub trait VjpOp {
    /// Cotangent of the outputs (∂L/∂output)
    type Cotangent;

    /// Cotangent of the inputs (∂L/∂input)
    type Gradients;

    /// Compute the VJP (backward pass) given the output gradient
    fn vjp(&self, cotangent: &Self::Cotangent) -> CeleriteResult<Self::Gradients>;
}

/// One recorded forward call of the factorization
///
/// Owns copies of the inputs and outputs, so the operator stays valid after
/// the caller's buffers are gone.
#[derive(Debug, Clone)]
pub struct FactorOp {
    a: Array1<f64>,
    u: Array2<f64>,
    v: Array2<f64>,
    p: Array2<f64>,
    output: Factorization,
    tape: Option<StateTape>,
    config: AdjointConfig,
}

impl FactorOp {
    /// Run the forward pass; the backward pass replays the states
    pub fn forward(
        a: &ArrayView1<f64>,
        u: &ArrayView2<f64>,
        v: &ArrayView2<f64>,
        p: &ArrayView2<f64>,
    ) -> CeleriteResult<Self> {
        let output = factor(a, u, v, p)?;
        Ok(Self {
            a: a.to_owned(),
            u: u.to_owned(),
            v: v.to_owned(),
            p: p.to_owned(),
            output,
            tape: None,
            config: AdjointConfig::default(),
        })
    }

    /// Run the forward pass and cache every state for the backward pass
    pub fn forward_cached(
        a: &ArrayView1<f64>,
        u: &ArrayView2<f64>,
        v: &ArrayView2<f64>,
        p: &ArrayView2<f64>,
    ) -> CeleriteResult<Self> {
        let (output, tape) = factor_with_tape(a, u, v, p)?;
        Ok(Self {
            a: a.to_owned(),
            u: u.to_owned(),
            v: v.to_owned(),
            p: p.to_owned(),
            output,
            tape: Some(tape),
            config: AdjointConfig::default(),
        })
    }

    /// Replace the replay configuration (ignored when states are cached)
    pub fn with_config(mut self, config: AdjointConfig) -> Self {
        self.config = config;
        self
    }

    /// Outputs `(d, W)` of the forward pass
    pub fn outputs(&self) -> &Factorization {
        &self.output
    }

    /// Whether the backward pass reads cached states
    pub fn is_cached(&self) -> bool {
        self.tape.is_some()
    }

    /// Zero cotangent for `W`, handy when only `d` feeds the loss
    pub fn zero_w(&self) -> Array2<f64> {
        Array2::zeros(self.output.w.raw_dim())
    }

    /// Number of inputs `(a, U, V, P)`
    pub fn num_inputs(&self) -> usize {
        4
    }

    /// Number of outputs `(d, W)`
    pub fn num_outputs(&self) -> usize {
        2
    }

    pub fn name(&self) -> &str {
        "celerite_factor"
    }
}

impl VjpOp for FactorOp {
    type Cotangent = FactorCotangent;
    type Gradients = FactorGradients;

    fn vjp(&self, cotangent: &FactorCotangent) -> CeleriteResult<FactorGradients> {
        match &self.tape {
            Some(tape) => {
                let system = SemiseparableSystem::new(
                    self.a.view(),
                    self.u.view(),
                    self.v.view(),
                    self.p.view(),
                )?;
                factor_grad_with_tape(&system, &self.output, tape, cotangent)
            }
            None => factor_grad_with_config(
                &self.a.view(),
                &self.u.view(),
                &self.v.view(),
                &self.p.view(),
                &self.output.d.view(),
                &self.output.w.view(),
                &cotangent.d.view(),
                &cotangent.w.view(),
                &self.config,
            ),
        }
    }
}
