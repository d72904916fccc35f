//! # State replay with checkpointing
//!
//! The adjoint sweep needs every running correction `S_n`, in descending
//! order. They can be rebuilt from the saved pivots and modified factor
//! alone, because the forward update only reads `d`, `W` and `P`:
//!
//! ```text
//! S_n = (S_{n-1} + d_{n-1} w_{n-1}ᵀ w_{n-1}) ∘ (p_{n-1}ᵀ p_{n-1})
//! ```
//!
//! The replay trades computation for memory:
//! 1. One forward replay stores `S` at the start of every segment
//! 2. The backward sweep recomputes one segment at a time, on demand
//! 3. Peak memory is O((N / interval + interval)·J²) instead of O(N·J²)
//!
//! The replay uses the same arithmetic as the forward sweep, so the rebuilt
//! states are bit-identical to the ones the factorization saw.

use celerite_core::error::{check_len, CeleriteResult};
use celerite_core::state::advance_state;
use celerite_core::StateTape;
use scirs2_core::ndarray_ext::{Array2, ArrayView1, ArrayView2};

/// Configuration for the adjoint sweep
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdjointConfig {
    /// How the running corrections are recovered during the backward sweep
    pub strategy: CheckpointStrategy,

    /// Recompute each pivot and each row of `W` from the inputs and the
    /// replayed state and reject saved outputs that do not belong to the
    /// inputs
    pub verify_replay: bool,

    /// Relative tolerance for `verify_replay`
    pub replay_tolerance: f64,
}

impl Default for AdjointConfig {
    fn default() -> Self {
        Self {
            strategy: CheckpointStrategy::Sqrt,
            verify_replay: false,
            replay_tolerance: 1e-8,
        }
    }
}

/// Strategy for selecting which states to checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CheckpointStrategy {
    /// Keep every state (single segment, O(N·J²) memory)
    All,

    /// Checkpoint every `interval` points
    Uniform { interval: usize },

    /// Checkpoint every ⌈√N⌉ points (O(√N·J²) memory, one extra forward replay)
    Sqrt,
}

impl CheckpointStrategy {
    /// Segment length for a sweep over `n` points (never zero)
    pub fn interval(&self, n: usize) -> usize {
        let interval = match *self {
            CheckpointStrategy::All => n,
            CheckpointStrategy::Uniform { interval } => interval,
            CheckpointStrategy::Sqrt => (n as f64).sqrt().ceil() as usize,
        };
        interval.max(1)
    }
}

/// Source of the running corrections during the backward sweep
///
/// Requests arrive with strictly decreasing `n`.
pub trait StateSource {
    /// Copy `S_n` into `out` (J×J)
    fn load(&mut self, n: usize, out: &mut Array2<f64>) -> CeleriteResult<()>;
}

impl StateSource for &StateTape {
    fn load(&mut self, n: usize, out: &mut Array2<f64>) -> CeleriteResult<()> {
        out.assign(&self.state(n));
        Ok(())
    }
}

/// Segment-wise replay of the running corrections from `(d, W, P)`
#[derive(Debug)]
pub struct StateReplay<'a> {
    d: ArrayView1<'a, f64>,
    w: ArrayView2<'a, f64>,
    p: ArrayView2<'a, f64>,
    interval: usize,
    checkpoints: Vec<Array2<f64>>,
    segment: Vec<Array2<f64>>,
    segment_start: Option<usize>,
}

impl<'a> StateReplay<'a> {
    /// Run the checkpointing forward replay
    pub fn new(
        d: ArrayView1<'a, f64>,
        w: ArrayView2<'a, f64>,
        p: ArrayView2<'a, f64>,
        strategy: CheckpointStrategy,
    ) -> CeleriteResult<Self> {
        let n_obs = d.len();
        let rank = w.ncols();
        check_len("W", 0, n_obs, w.nrows())?;
        check_len("P", 0, n_obs.saturating_sub(1), p.nrows())?;
        check_len("P", 1, rank, p.ncols())?;

        let interval = strategy.interval(n_obs);
        let mut checkpoints = Vec::with_capacity(n_obs.div_ceil(interval));
        let mut s = Array2::<f64>::zeros((rank, rank));

        for n in 0..n_obs {
            if n > 0 {
                advance_state(&mut s, d[n - 1], &w.row(n - 1), &p.row(n - 1));
            }
            if n % interval == 0 {
                checkpoints.push(s.clone());
            }
        }

        log::debug!(
            "celerite state replay: N={}, J={}, interval={}, checkpoints={}",
            n_obs,
            rank,
            interval,
            checkpoints.len()
        );

        Ok(Self {
            d,
            w,
            p,
            interval,
            checkpoints,
            segment: Vec::new(),
            segment_start: None,
        })
    }

    /// Segment length in use
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Number of stored checkpoints
    pub fn num_checkpoints(&self) -> usize {
        self.checkpoints.len()
    }

    fn replay_segment(&mut self, start: usize) {
        let end = (start + self.interval).min(self.d.len());
        let mut s = self.checkpoints[start / self.interval].clone();

        self.segment.clear();
        self.segment.push(s.clone());
        for n in (start + 1)..end {
            advance_state(&mut s, self.d[n - 1], &self.w.row(n - 1), &self.p.row(n - 1));
            self.segment.push(s.clone());
        }
        self.segment_start = Some(start);

        log::trace!("celerite state replay: segment [{}, {})", start, end);
    }
}

impl StateSource for StateReplay<'_> {
    fn load(&mut self, n: usize, out: &mut Array2<f64>) -> CeleriteResult<()> {
        let start = (n / self.interval) * self.interval;
        if self.segment_start != Some(start) {
            self.replay_segment(start);
        }
        out.assign(&self.segment[n - start]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celerite_core::factor_with_tape;
    use celerite_core::testing::random_system;

    #[test]
    fn test_interval_selection() {
        assert_eq!(CheckpointStrategy::All.interval(100), 100);
        assert_eq!(CheckpointStrategy::All.interval(0), 1);
        assert_eq!(CheckpointStrategy::Sqrt.interval(100), 10);
        assert_eq!(CheckpointStrategy::Sqrt.interval(101), 11);
        assert_eq!(CheckpointStrategy::Uniform { interval: 0 }.interval(10), 1);
        assert_eq!(CheckpointStrategy::Uniform { interval: 7 }.interval(10), 7);
    }

    #[test]
    fn test_config_default() {
        let config = AdjointConfig::default();
        assert_eq!(config.strategy, CheckpointStrategy::Sqrt);
        assert!(!config.verify_replay);
    }

    #[test]
    fn test_replay_matches_tape_for_every_strategy() {
        let rs = random_system(37, 3, 11);
        let (fact, tape) =
            factor_with_tape(&rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view()).unwrap();

        for strategy in [
            CheckpointStrategy::All,
            CheckpointStrategy::Sqrt,
            CheckpointStrategy::Uniform { interval: 1 },
            CheckpointStrategy::Uniform { interval: 5 },
            CheckpointStrategy::Uniform { interval: 100 },
        ] {
            let mut replay =
                StateReplay::new(fact.d.view(), fact.w.view(), rs.p.view(), strategy).unwrap();
            let mut out = Array2::zeros((3, 3));

            for n in (0..37).rev() {
                replay.load(n, &mut out).unwrap();
                assert_eq!(out, tape.state(n), "strategy {:?}, n={}", strategy, n);
            }
        }
    }

    #[test]
    fn test_checkpoint_count() {
        let rs = random_system(20, 2, 3);
        let (fact, _) =
            factor_with_tape(&rs.a.view(), &rs.u.view(), &rs.v.view(), &rs.p.view()).unwrap();

        let replay = StateReplay::new(
            fact.d.view(),
            fact.w.view(),
            rs.p.view(),
            CheckpointStrategy::Uniform { interval: 6 },
        )
        .unwrap();
        assert_eq!(replay.interval(), 6);
        assert_eq!(replay.num_checkpoints(), 4);
    }
}
