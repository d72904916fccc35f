//! Structured records of factorizations and gradients
//!
//! The lower crates only log through the `log` facade (sweep sizes at
//! `debug`, checkpoint replays at `trace`, failed pivots at `warn`). This
//! module adds one structured event per factorization, gradient or
//! likelihood evaluation, emitted under the `celerite` target. With the
//! `tracing` feature off the recorders only compute their summaries.
//!
//! ```
//! use celerite::prelude::*;
//! use celerite::tracing_support::{record_factorization, FactorSummary};
//! use scirs2_core::ndarray_ext::array;
//!
//! let fact = factor(
//!     &array![2.0, 2.0].view(),
//!     &array![[1.0], [1.0]].view(),
//!     &array![[0.5], [0.5]].view(),
//!     &array![[0.9]].view(),
//! )?;
//! let summary: FactorSummary = record_factorization(&fact);
//! assert_eq!(summary.n, 2);
//! assert!(summary.min_pivot > 0.0);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! `CELERITE_LOG_FORMAT` picks the subscriber output (`pretty`, `compact`
//! or `json`) and `RUST_LOG` the filter.

use crate::ad::FactorGradients;
use crate::core::Factorization;
use anyhow::Result;
use std::str::FromStr;
#[cfg(feature = "tracing")]
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Environment variable selecting [`LogFormat`]
pub const LOG_FORMAT_ENV: &str = "CELERITE_LOG_FORMAT";

/// Subscriber output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format `{}`", other),
        }
    }
}

/// Subscriber settings for [`init_tracing`]
#[derive(Debug, Clone, PartialEq)]
pub struct TracingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `"celerite=info,celerite_ad=trace"`
    pub filter: String,
    pub ansi: bool,
}

impl TracingConfig {
    /// Read `CELERITE_LOG_FORMAT` and `RUST_LOG`
    ///
    /// An unknown format falls back to [`LogFormat::Pretty`].
    pub fn from_env() -> Self {
        let format = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "celerite=info,warn".to_string());
        Self {
            format,
            filter,
            ansi: format != LogFormat::Json,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Install the global subscriber; fails if one is already set
#[cfg(feature = "tracing")]
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)?;
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_ansi(config.ansi).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_ansi(config.ansi).boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };
    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;
    Ok(())
}

#[cfg(not(feature = "tracing"))]
pub fn init_tracing(_config: TracingConfig) -> Result<()> {
    Ok(())
}

/// Scalar digest of a [`Factorization`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorSummary {
    pub n: usize,
    pub rank: usize,
    pub log_det: f64,
    /// Smallest pivot; `+∞` for an empty factorization
    pub min_pivot: f64,
    pub max_pivot: f64,
}

impl FactorSummary {
    pub fn of(fact: &Factorization) -> Self {
        Self {
            n: fact.len(),
            rank: fact.rank(),
            log_det: fact.log_det(),
            min_pivot: fact.d.iter().cloned().fold(f64::INFINITY, f64::min),
            max_pivot: fact.d.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// `max_pivot / min_pivot`
    pub fn pivot_ratio(&self) -> f64 {
        self.max_pivot / self.min_pivot
    }
}

/// Frobenius norms of the four input gradients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSummary {
    pub a_norm: f64,
    pub u_norm: f64,
    pub v_norm: f64,
    pub p_norm: f64,
}

impl GradientSummary {
    pub fn of(grads: &FactorGradients) -> Self {
        Self {
            a_norm: frobenius(grads.a.iter()),
            u_norm: frobenius(grads.u.iter()),
            v_norm: frobenius(grads.v.iter()),
            p_norm: frobenius(grads.p.iter()),
        }
    }

    /// Norm of all gradients stacked into one vector
    pub fn total_norm(&self) -> f64 {
        [self.a_norm, self.u_norm, self.v_norm, self.p_norm]
            .iter()
            .map(|x| x * x)
            .sum::<f64>()
            .sqrt()
    }
}

fn frobenius<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.map(|v| v * v).sum::<f64>().sqrt()
}

/// Summarize a factorization and emit it as one event
pub fn record_factorization(fact: &Factorization) -> FactorSummary {
    let summary = FactorSummary::of(fact);
    #[cfg(feature = "tracing")]
    tracing::info!(
        target: "celerite",
        n = summary.n,
        rank = summary.rank,
        log_det = summary.log_det,
        min_pivot = summary.min_pivot,
        max_pivot = summary.max_pivot,
        "factorization"
    );
    summary
}

/// Summarize input gradients and emit them as one event
pub fn record_gradients(grads: &FactorGradients) -> GradientSummary {
    let summary = GradientSummary::of(grads);
    #[cfg(feature = "tracing")]
    tracing::info!(
        target: "celerite",
        a_norm = summary.a_norm,
        u_norm = summary.u_norm,
        v_norm = summary.v_norm,
        p_norm = summary.p_norm,
        total_norm = summary.total_norm(),
        "gradients"
    );
    summary
}

/// Emit a log-likelihood value for `n` observations
#[cfg(feature = "tracing")]
pub fn record_log_likelihood(n: usize, value: f64) {
    if value.is_finite() {
        tracing::info!(target: "celerite", n, log_likelihood = value, "log_likelihood");
    } else {
        tracing::warn!(target: "celerite", n, log_likelihood = value, "non-finite log_likelihood");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn record_log_likelihood(_n: usize, _value: f64) {}
