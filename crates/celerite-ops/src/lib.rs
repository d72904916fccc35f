//! # celerite-ops
//!
//! O(N) linear algebra on top of a celerite factorization.
//!
//! Everything here consumes the artefacts returned by
//! [`celerite_core::factor`] (the pivots `d` and the modified factor `W`)
//! together with the structured inputs `U`, `V` and `P`. No routine ever
//! materialises an N×N matrix.
//!
//! | operation | result | module |
//! |-----------|--------|--------|
//! | [`solve`](fn@solve) | `K⁻¹ Y` | [`solve`](mod@solve) |
//! | [`norm`] | `yᵀ K⁻¹ y` | [`solve`](mod@solve) |
//! | [`dot_tril`](fn@dot_tril) | `(I + L) diag(√d) Y` | [`dot_tril`](mod@dot_tril) |
//! | [`matmul`](fn@matmul) | `K Y` | [`matmul`](mod@matmul) |
//! | [`log_likelihood`] | Gaussian log-likelihood | [`likelihood`] |
//! | [`conditional_mean`] | `K(t, x) z` | [`conditional`] |
//!
//! [`terms`] builds `(a, U, V, P)` from kernel hyperparameters.
//!
//! ## Quick Start
//!
//! ```
//! use celerite_core::factor;
//! use celerite_ops::terms::{SHOTerm, Term};
//! use celerite_ops::{log_likelihood, solve_vec};
//! use scirs2_core::ndarray_ext::Array1;
//!
//! let x = Array1::linspace(0.0, 10.0, 50);
//! let y = x.mapv(f64::sin);
//! let diag = Array1::from_elem(50, 0.01);
//!
//! let term = SHOTerm::new(1.0, 2.0, 1.5)?;
//! let m = term.coefficients().celerite_matrices(&x.view(), &diag.view())?;
//! let fact = factor(&m.a.view(), &m.u.view(), &m.v.view(), &m.p.view())?;
//!
//! let alpha = solve_vec(&m.u.view(), &m.p.view(), &fact.d.view(), &fact.w.view(), &y.view())?;
//! let ll = log_likelihood(&m.u.view(), &m.p.view(), &fact.d.view(), &fact.w.view(), &y.view())?;
//! assert_eq!(alpha.len(), 50);
//! assert!(ll.is_finite());
//! # Ok::<(), celerite_core::CeleriteError>(())
//! ```

#![deny(warnings)]

pub mod conditional;
pub mod dot_tril;
pub mod likelihood;
pub mod matmul;
mod shapes;
pub mod solve;
pub mod terms;

pub use conditional::{conditional_mean, searchsorted};
pub use dot_tril::{dot_tril, dot_tril_vec};
pub use likelihood::{log_det, log_likelihood};
pub use matmul::{matmul, matmul_vec};
pub use solve::{norm, solve, solve_vec};
