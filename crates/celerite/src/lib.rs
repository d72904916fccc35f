//! # celerite - O(N) Gaussian-process linear algebra
//!
//! This is the **meta crate** that re-exports all celerite components for
//! convenient access.
//!
//! ## Quick Start
//!
//! ```
//! use celerite::prelude::*;
//! use scirs2_core::ndarray_ext::Array1;
//!
//! let x = Array1::linspace(0.0, 5.0, 40);
//! let diag = Array1::from_elem(40, 0.1);
//! let m = RealTerm::new(1.0, 0.5)?
//!     .coefficients()
//!     .celerite_matrices(&x.view(), &diag.view())?;
//!
//! let op = FactorOp::forward(&m.a.view(), &m.u.view(), &m.v.view(), &m.p.view())?;
//! let cot = FactorCotangent::new(op.outputs().d.mapv(|d| 1.0 / d), op.zero_w());
//! let grads = op.vjp(&cot)?;
//! assert_eq!(grads.a.len(), 40);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Factorization ([`core`])
//!
//! `factor(a, U, V, P) -> (d, W)`, shape validation, dense diagnostics and
//! batched execution.
//!
//! ### Gradients ([`ad`])
//!
//! `factor_grad`, checkpointed state replay, the [`FactorOp`](ad::FactorOp)
//! wrapper and finite-difference gradient checking.
//!
//! ### Downstream operations ([`ops`])
//!
//! Solves, products, log-likelihood, conditional mean and kernel terms.
//!
//! ## Features
//!
//! - `parallel`: Factorize batches of systems on the thread pool
//! - `serde`: Serialize configuration structs and kernel terms
//! - `tracing`: Install a `tracing-subscriber` with [`tracing_support`]

#![deny(warnings)]

pub use celerite_ad as ad;
pub use celerite_core as core;
pub use celerite_ops as ops;

pub mod tracing_support;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use celerite::prelude::*;
    //!
    //! let config = AdjointConfig::default();
    //! assert_eq!(config.strategy, CheckpointStrategy::Sqrt);
    //! ```

    // Factorization
    pub use crate::core::{
        factor, factor_batch, factor_system, factor_with_tape, CeleriteError, CeleriteResult,
        Factorization, SemiseparableSystem, StateTape,
    };

    // Gradients
    pub use crate::ad::{
        factor_grad, factor_grad_with_config, factor_grad_with_tape, AdjointConfig,
        CheckpointStrategy, FactorCotangent, FactorGradients, FactorOp, VjpOp,
    };

    // Downstream operations
    pub use crate::ops::terms::{
        ComplexTerm, Matern32Term, RealTerm, SHOTerm, Term, TermCoefficients,
    };
    pub use crate::ops::{
        conditional_mean, dot_tril, log_det, log_likelihood, matmul, norm, searchsorted, solve,
        solve_vec,
    };
}
