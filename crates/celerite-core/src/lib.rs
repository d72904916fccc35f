//! # celerite-core
//!
//! O(N) Cholesky-like factorization of celerite (semiseparable) covariance
//! matrices.
//!
//! This crate provides:
//! - A shape-checked view of the structured inputs ([`SemiseparableSystem`])
//! - The forward factorization ([`factor`](fn@factor), [`factor_with_tape`])
//! - Dense materialisation for diagnostics ([`dense`])
//! - Batched factorization of independent systems ([`factor_batch`])
//!
//! Gradients live in `celerite-ad`; solves, products and likelihoods that
//! consume a [`Factorization`] live in `celerite-ops`.
//!
//! ## Quick Start
//!
//! ```
//! use celerite_core::{factor, CeleriteError};
//! use scirs2_core::ndarray_ext::array;
//!
//! let a = array![1.0, 1.0, 1.0];
//! let u = array![[0.5], [0.5], [0.5]];
//! let v = array![[0.5], [0.5], [0.5]];
//! let p = array![[0.9], [0.9]];
//!
//! let fact = factor(&a.view(), &u.view(), &v.view(), &p.view())?;
//! assert!(fact.d.iter().all(|&d| d > 0.0));
//! # Ok::<(), CeleriteError>(())
//! ```
//!
//! ## Precision
//!
//! Everything is `f64`. The recurrence accumulates many small corrections
//! and single precision loses positive definiteness long before the matrix
//! actually does.

#![deny(warnings)]

pub mod batch;
pub mod dense;
pub mod error;
pub mod factor;
pub mod state;
pub mod system;
pub mod testing;

pub use batch::factor_batch;
#[cfg(feature = "parallel")]
pub use batch::factor_batch_parallel;
pub use error::{CeleriteError, CeleriteResult};
pub use factor::{factor, factor_system, factor_with_tape, Factorization, StateTape};
pub use system::SemiseparableSystem;
