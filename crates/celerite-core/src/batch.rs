//! Factorization of many independent systems
//!
//! The recurrence itself is sequential, but separate systems (for example
//! the log-likelihoods of independent light curves) share nothing and can be
//! factorized concurrently. Each call owns its buffers, so no locking is
//! involved.

use crate::error::CeleriteResult;
use crate::factor::{factor_system, Factorization};
use crate::system::SemiseparableSystem;

/// Factorize each system in order, one result per system
///
/// A failing system does not stop the others.
pub fn factor_batch(systems: &[SemiseparableSystem<'_>]) -> Vec<CeleriteResult<Factorization>> {
    log::debug!("celerite factor_batch: {} systems", systems.len());
    systems.iter().map(factor_system).collect()
}

/// Parallel version of [`factor_batch`]
///
/// Results come back in the same order as `systems`.
#[cfg(feature = "parallel")]
pub fn factor_batch_parallel(
    systems: &[SemiseparableSystem<'_>],
) -> Vec<CeleriteResult<Factorization>> {
    use scirs2_core::parallel_ops::*;

    log::debug!("celerite factor_batch_parallel: {} systems", systems.len());
    systems.par_iter().map(factor_system).collect()
}
