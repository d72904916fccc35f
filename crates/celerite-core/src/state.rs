//! J×J helpers for the running correction `S`
//!
//! Every step of the forward sweep (and of the replay used by the adjoint)
//! performs the same three small dense operations. They are written as plain
//! loops over caller-owned buffers so a sweep allocates nothing per step.

use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2};

/// Advance the running correction past point `n - 1`
///
/// ```text
/// S ← (S + d_{n-1} · w_{n-1}ᵀ w_{n-1}) ∘ (p_{n-1}ᵀ p_{n-1})
/// ```
pub fn advance_state(
    s: &mut Array2<f64>,
    d_prev: f64,
    w_prev: &ArrayView1<f64>,
    p_prev: &ArrayView1<f64>,
) {
    let j = s.nrows();
    for k in 0..j {
        let dwk = d_prev * w_prev[k];
        for l in 0..j {
            s[[k, l]] = (s[[k, l]] + dwk * w_prev[l]) * p_prev[k] * p_prev[l];
        }
    }
}

/// `out ← u · S` (row vector times matrix)
pub fn row_times_state(u: &ArrayView1<f64>, s: &ArrayView2<f64>, out: &mut Array1<f64>) {
    let j = out.len();
    for l in 0..j {
        let mut acc = 0.0;
        for k in 0..j {
            acc += u[k] * s[[k, l]];
        }
        out[l] = acc;
    }
}

/// `out ← S · b` (matrix times column vector)
pub fn state_times_col(s: &ArrayView2<f64>, b: &ArrayView1<f64>, out: &mut Array1<f64>) {
    let j = out.len();
    for k in 0..j {
        let mut acc = 0.0;
        for l in 0..j {
            acc += s[[k, l]] * b[l];
        }
        out[k] = acc;
    }
}

/// Plain dot product of two equally long vectors
pub fn dot(x: &ArrayView1<f64>, y: &ArrayView1<f64>) -> f64 {
    x.iter().zip(y.iter()).map(|(a, b)| a * b).sum()
}
