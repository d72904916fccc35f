//! Celerite kernel terms
//!
//! A celerite kernel is a sum of real and complex exponentials,
//!
//! ```text
//! k(τ) = Σ ar_j e^{−cr_j τ} + Σ e^{−cc_j τ} (ac_j cos(dc_j τ) + bc_j sin(dc_j τ)),   τ ≥ 0
//! ```
//!
//! Every term reduces to [`TermCoefficients`], which knows how to build the
//! structured inputs `(a, U, V, P)` for sorted points. A real exponential
//! contributes one column to `U`, `V` and `P`; a complex one contributes two:
//!
//! ```text
//! U = [a cos(dx) + b sin(dx),  a sin(dx) − b cos(dx)]
//! V = [cos(dx), sin(dx)]
//! P = [e^{−c Δx}, e^{−c Δx}]
//! ```
//!
//! Real columns come first, then the complex pairs.

use celerite_core::error::{check_len, CeleriteError, CeleriteResult};
use celerite_core::SemiseparableSystem;
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayViewMut1};

/// A kernel term that reduces to celerite coefficients
pub trait Term {
    fn coefficients(&self) -> TermCoefficients;
}

/// Coefficients of the real and complex exponentials of a kernel
#[derive(Debug, Clone, PartialEq)]
pub struct TermCoefficients {
    pub ar: Array1<f64>,
    pub cr: Array1<f64>,
    pub ac: Array1<f64>,
    pub bc: Array1<f64>,
    pub cc: Array1<f64>,
    pub dc: Array1<f64>,
}

/// Structured inputs `(a, U, V, P)` built from a kernel
#[derive(Debug, Clone, PartialEq)]
pub struct CeleriteMatrices {
    pub a: Array1<f64>,
    pub u: Array2<f64>,
    pub v: Array2<f64>,
    pub p: Array2<f64>,
}

impl CeleriteMatrices {
    /// Borrow as a validated system
    pub fn system(&self) -> CeleriteResult<SemiseparableSystem<'_>> {
        SemiseparableSystem::new(self.a.view(), self.u.view(), self.v.view(), self.p.view())
    }
}

/// Test-point factors for [`conditional_mean`](crate::conditional_mean)
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalMatrices {
    pub u_star: Array2<f64>,
    pub v_star: Array2<f64>,
    pub inds: Vec<usize>,
}

impl TermCoefficients {
    /// Coefficients with real exponentials only
    pub fn real(ar: Array1<f64>, cr: Array1<f64>) -> CeleriteResult<Self> {
        Self::new(ar, cr, Array1::zeros(0), Array1::zeros(0), Array1::zeros(0), Array1::zeros(0))
    }

    /// Coefficients with complex exponentials only
    pub fn complex(
        ac: Array1<f64>,
        bc: Array1<f64>,
        cc: Array1<f64>,
        dc: Array1<f64>,
    ) -> CeleriteResult<Self> {
        Self::new(Array1::zeros(0), Array1::zeros(0), ac, bc, cc, dc)
    }

    /// Check that the real and complex coefficient groups have equal lengths
    pub fn new(
        ar: Array1<f64>,
        cr: Array1<f64>,
        ac: Array1<f64>,
        bc: Array1<f64>,
        cc: Array1<f64>,
        dc: Array1<f64>,
    ) -> CeleriteResult<Self> {
        check_len("cr", 0, ar.len(), cr.len())?;
        check_len("bc", 0, ac.len(), bc.len())?;
        check_len("cc", 0, ac.len(), cc.len())?;
        check_len("dc", 0, ac.len(), dc.len())?;
        Ok(Self {
            ar,
            cr,
            ac,
            bc,
            cc,
            dc,
        })
    }

    /// Number of real exponentials
    pub fn num_real(&self) -> usize {
        self.ar.len()
    }

    /// Number of complex exponentials
    pub fn num_complex(&self) -> usize {
        self.ac.len()
    }

    /// Width `J` of `U`, `V` and `P`
    pub fn rank(&self) -> usize {
        self.num_real() + 2 * self.num_complex()
    }

    /// Kernel value at lag `tau`
    pub fn value(&self, tau: f64) -> f64 {
        let tau = tau.abs();
        let real: f64 = self
            .ar
            .iter()
            .zip(self.cr.iter())
            .map(|(a, c)| a * (-c * tau).exp())
            .sum();
        let complex: f64 = (0..self.num_complex())
            .map(|k| {
                let arg = self.dc[k] * tau;
                (-self.cc[k] * tau).exp() * (self.ac[k] * arg.cos() + self.bc[k] * arg.sin())
            })
            .sum();
        real + complex
    }

    /// Build `(a, U, V, P)` at sorted points `x` with extra diagonal `diag`
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `diag` and `x` differ in length, `InvalidInput` if
    /// `x` is not sorted.
    pub fn celerite_matrices(
        &self,
        x: &ArrayView1<f64>,
        diag: &ArrayView1<f64>,
    ) -> CeleriteResult<CeleriteMatrices> {
        let n = x.len();
        let j = self.rank();
        check_len("diag", 0, n, diag.len())?;
        check_sorted(x)?;

        let rates = self.decay_rates();
        let k0 = self.ar.sum() + self.ac.sum();

        let a = diag.mapv(|dn| dn + k0);
        let mut u = Array2::<f64>::zeros((n, j));
        let mut v = Array2::<f64>::zeros((n, j));
        for i in 0..n {
            self.write_factors(x[i], u.row_mut(i), v.row_mut(i));
        }
        let p = Array2::from_shape_fn((n.saturating_sub(1), j), |(i, k)| {
            (-rates[k] * (x[i + 1] - x[i])).exp()
        });

        Ok(CeleriteMatrices { a, u, v, p })
    }

    /// Test-point factors `(U*, V*, inds)` for predictions at `t`
    ///
    /// `U*` carries the decay from the training point before each test
    /// point and `V*` the decay to the training point after it. Rows with
    /// no such neighbour are zero.
    pub fn conditional_matrices(
        &self,
        x: &ArrayView1<f64>,
        t: &ArrayView1<f64>,
    ) -> CeleriteResult<ConditionalMatrices> {
        check_sorted(x)?;
        let n = x.len();
        let m = t.len();
        let j = self.rank();
        let rates = self.decay_rates();
        let inds = crate::conditional::searchsorted(x, t);

        let mut u_star = Array2::<f64>::zeros((m, j));
        let mut v_star = Array2::<f64>::zeros((m, j));
        let mut u_row = Array1::<f64>::zeros(j);
        let mut v_row = Array1::<f64>::zeros(j);

        for (row, (&tv, &i)) in t.iter().zip(inds.iter()).enumerate() {
            self.write_factors(tv, u_row.view_mut(), v_row.view_mut());
            if i > 0 {
                let dt = tv - x[i - 1];
                for k in 0..j {
                    u_star[[row, k]] = u_row[k] * (-rates[k] * dt).exp();
                }
            }
            if i < n {
                let dt = x[i] - tv;
                for k in 0..j {
                    v_star[[row, k]] = v_row[k] * (-rates[k] * dt).exp();
                }
            }
        }

        Ok(ConditionalMatrices {
            u_star,
            v_star,
            inds,
        })
    }

    /// Decay rate of every column
    fn decay_rates(&self) -> Vec<f64> {
        let mut rates: Vec<f64> = self.cr.to_vec();
        for &c in self.cc.iter() {
            rates.push(c);
            rates.push(c);
        }
        rates
    }

    fn write_factors(&self, x: f64, mut u: ArrayViewMut1<f64>, mut v: ArrayViewMut1<f64>) {
        let jr = self.num_real();
        for k in 0..jr {
            u[k] = self.ar[k];
            v[k] = 1.0;
        }
        for k in 0..self.num_complex() {
            let (sin, cos) = (self.dc[k] * x).sin_cos();
            let col = jr + 2 * k;
            u[col] = self.ac[k] * cos + self.bc[k] * sin;
            u[col + 1] = self.ac[k] * sin - self.bc[k] * cos;
            v[col] = cos;
            v[col + 1] = sin;
        }
    }
}

impl Term for TermCoefficients {
    fn coefficients(&self) -> TermCoefficients {
        self.clone()
    }
}

fn check_sorted(x: &ArrayView1<f64>) -> CeleriteResult<()> {
    for i in 1..x.len() {
        if !(x[i] >= x[i - 1]) {
            return Err(CeleriteError::InvalidInput(format!(
                "coordinates must be sorted: x[{}] = {} follows x[{}] = {}",
                i,
                x[i],
                i - 1,
                x[i - 1]
            )));
        }
    }
    Ok(())
}

fn require_positive(name: &str, value: f64) -> CeleriteResult<()> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(CeleriteError::InvalidInput(format!(
            "{} must be positive and finite, got {}",
            name, value
        )));
    }
    Ok(())
}

/// `k(τ) = a e^{−c τ}`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RealTerm {
    pub a: f64,
    pub c: f64,
}

impl RealTerm {
    pub fn new(a: f64, c: f64) -> CeleriteResult<Self> {
        require_positive("a", a)?;
        require_positive("c", c)?;
        Ok(Self { a, c })
    }

    /// Log-parameterised constructor
    pub fn from_log(log_a: f64, log_c: f64) -> CeleriteResult<Self> {
        Self::new(log_a.exp(), log_c.exp())
    }
}

impl Term for RealTerm {
    fn coefficients(&self) -> TermCoefficients {
        TermCoefficients {
            ar: Array1::from_elem(1, self.a),
            cr: Array1::from_elem(1, self.c),
            ac: Array1::zeros(0),
            bc: Array1::zeros(0),
            cc: Array1::zeros(0),
            dc: Array1::zeros(0),
        }
    }
}

/// `k(τ) = e^{−c τ} (a cos(d τ) + b sin(d τ))`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComplexTerm {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl ComplexTerm {
    /// `b` may take either sign; `a`, `c` and `d` must be positive
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> CeleriteResult<Self> {
        require_positive("a", a)?;
        require_positive("c", c)?;
        require_positive("d", d)?;
        if !b.is_finite() {
            return Err(CeleriteError::InvalidInput(format!("b must be finite, got {}", b)));
        }
        Ok(Self { a, b, c, d })
    }

    pub fn from_log(log_a: f64, b: f64, log_c: f64, log_d: f64) -> CeleriteResult<Self> {
        Self::new(log_a.exp(), b, log_c.exp(), log_d.exp())
    }
}

impl Term for ComplexTerm {
    fn coefficients(&self) -> TermCoefficients {
        TermCoefficients {
            ar: Array1::zeros(0),
            cr: Array1::zeros(0),
            ac: Array1::from_elem(1, self.a),
            bc: Array1::from_elem(1, self.b),
            cc: Array1::from_elem(1, self.c),
            dc: Array1::from_elem(1, self.d),
        }
    }
}

/// Stochastically driven damped harmonic oscillator
///
/// Power spectrum `S(ω) = √(2/π) S0 ω0⁴ / ((ω² − ω0²)² + ω0² ω² / Q²)`.
/// Overdamped oscillators (`Q < 1/2`) reduce to two real exponentials,
/// underdamped ones (`Q > 1/2`) to one complex exponential. The critically
/// damped `Q = 1/2` has no exact celerite form and is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SHOTerm {
    pub s0: f64,
    pub q: f64,
    pub w0: f64,
}

impl SHOTerm {
    pub fn new(s0: f64, q: f64, w0: f64) -> CeleriteResult<Self> {
        require_positive("S0", s0)?;
        require_positive("Q", q)?;
        require_positive("w0", w0)?;
        if q == 0.5 {
            return Err(CeleriteError::InvalidInput(
                "critically damped oscillator (Q = 1/2) is not supported".to_string(),
            ));
        }
        Ok(Self { s0, q, w0 })
    }

    pub fn from_log(log_s0: f64, log_q: f64, log_w0: f64) -> CeleriteResult<Self> {
        Self::new(log_s0.exp(), log_q.exp(), log_w0.exp())
    }
}

impl Term for SHOTerm {
    fn coefficients(&self) -> TermCoefficients {
        let (s0, q, w0) = (self.s0, self.q, self.w0);
        let empty = || Array1::<f64>::zeros(0);

        if q < 0.5 {
            let f = (1.0 - 4.0 * q * q).sqrt();
            let amp = 0.5 * s0 * w0 * q;
            let rate = 0.5 * w0 / q;
            TermCoefficients {
                ar: Array1::from_vec(vec![amp * (1.0 + 1.0 / f), amp * (1.0 - 1.0 / f)]),
                cr: Array1::from_vec(vec![rate * (1.0 - f), rate * (1.0 + f)]),
                ac: empty(),
                bc: empty(),
                cc: empty(),
                dc: empty(),
            }
        } else {
            let f = (4.0 * q * q - 1.0).sqrt();
            let rate = 0.5 * w0 / q;
            TermCoefficients {
                ar: empty(),
                cr: empty(),
                ac: Array1::from_elem(1, s0 * w0 * q),
                bc: Array1::from_elem(1, s0 * w0 * q / f),
                cc: Array1::from_elem(1, rate),
                dc: Array1::from_elem(1, rate * f),
            }
        }
    }
}

/// Approximate Matérn-3/2 kernel `σ² (1 + √3 τ/ρ) e^{−√3 τ/ρ}`
///
/// Represented as a complex term with a small frequency `eps`; the
/// approximation error vanishes as `eps → 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matern32Term {
    pub sigma: f64,
    pub rho: f64,
    pub eps: f64,
}

impl Matern32Term {
    pub fn new(sigma: f64, rho: f64) -> CeleriteResult<Self> {
        Self::with_eps(sigma, rho, 0.01)
    }

    pub fn with_eps(sigma: f64, rho: f64, eps: f64) -> CeleriteResult<Self> {
        require_positive("sigma", sigma)?;
        require_positive("rho", rho)?;
        require_positive("eps", eps)?;
        Ok(Self { sigma, rho, eps })
    }

    pub fn from_log(log_sigma: f64, log_rho: f64) -> CeleriteResult<Self> {
        Self::new(log_sigma.exp(), log_rho.exp())
    }
}

impl Term for Matern32Term {
    fn coefficients(&self) -> TermCoefficients {
        let w0 = 3.0_f64.sqrt() / self.rho;
        let var = self.sigma * self.sigma;
        TermCoefficients {
            ar: Array1::zeros(0),
            cr: Array1::zeros(0),
            ac: Array1::from_elem(1, var),
            bc: Array1::from_elem(1, var * w0 / self.eps),
            cc: Array1::from_elem(1, w0),
            dc: Array1::from_elem(1, self.eps),
        }
    }
}
