//! # celerite-ad
//!
//! Reverse-mode differentiation of the celerite factorization.
//!
//! This crate provides:
//! - The hand-derived adjoint of the forward recurrence ([`factor_grad`])
//! - Segment-wise replay of the running corrections ([`checkpoint`])
//! - A recorded forward call with a VJP rule ([`FactorOp`], [`VjpOp`])
//! - Finite-difference gradient checking ([`gradcheck`])
//!
//! ## Quick Start
//!
//! ```
//! use celerite_ad::factor_grad;
//! use celerite_core::factor;
//! use scirs2_core::ndarray_ext::array;
//!
//! let (a, u, v, p) = (
//!     array![1.0, 1.0],
//!     array![[1.0], [1.0]],
//!     array![[0.5], [0.5]],
//!     array![[0.9]],
//! );
//! let fact = factor(&a.view(), &u.view(), &v.view(), &p.view())?;
//!
//! // L = Σ d: upstream gradient of ones on d, zeros on W
//! let grad_d = array![1.0, 1.0];
//! let grad_w = array![[0.0], [0.0]];
//! let grads = factor_grad(
//!     &a.view(), &u.view(), &v.view(), &p.view(),
//!     &fact.d.view(), &fact.w.view(), &grad_d.view(), &grad_w.view(),
//! )?;
//! assert_eq!(grads.p.shape(), &[1, 1]);
//! # Ok::<(), celerite_core::CeleriteError>(())
//! ```

#![deny(warnings)]

pub mod adjoint;
pub mod checkpoint;
pub mod gradcheck;
pub mod vjp;

pub use adjoint::{
    factor_grad, factor_grad_with_config, factor_grad_with_tape, FactorCotangent,
    FactorGradients,
};
pub use checkpoint::{AdjointConfig, CheckpointStrategy, StateReplay, StateSource};
pub use vjp::{FactorOp, VjpOp};
