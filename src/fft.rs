//! Double-precision FFT plans used by band design and the transforms.
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Forward and normalized inverse transforms of one fixed length.
///
/// Everything runs in `f64` so that atom tails can be resolved well below
/// single-precision rounding noise before coefficients are stored as `f32`.
///
/// # Example
/// ```
/// use gaborstream::fft::FftPlan;
/// use num_complex::Complex64;
///
/// let plan = FftPlan::new(256);
/// let mut spectrum = vec![Complex64::new(0.0, 0.0); 256];
/// spectrum[0] = Complex64::new(256.0, 0.0);
/// plan.inverse(&mut spectrum);
/// assert!(spectrum.iter().all(|v| (v.re - 1.0).abs() < 1e-12));
/// ```
#[derive(Clone)]
pub struct FftPlan {
    fwd: Arc<dyn Fft<f64>>,
    inv: Arc<dyn Fft<f64>>,
    len: usize,
}

impl FftPlan {
    /// Plan transforms of `len` points. Powers of two are fastest.
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fwd: planner.plan_fft_forward(len),
            inv: planner.plan_fft_inverse(len),
            len,
        }
    }

    /// Transform length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the plan has zero points.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unnormalized forward transform, in place.
    pub fn forward(&self, data: &mut [Complex64]) {
        self.fwd.process(data);
    }

    /// Inverse transform scaled by `1 / len`, in place, so that it undoes
    /// [`forward`](Self::forward).
    pub fn inverse(&self, data: &mut [Complex64]) {
        self.inv.process(data);
        let norm = (self.len as f64).recip();
        data.iter_mut().for_each(|v| *v *= norm);
    }
}

impl fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftPlan").field("len", &self.len).finish()
    }
}

/// Plans of many lengths, created on first use and kept so that repeated
/// transforms of the same length reuse their twiddle tables.
#[derive(Debug, Clone, Default)]
pub struct FftPlans {
    plans: HashMap<usize, FftPlan>,
}

impl FftPlans {
    pub fn new() -> Self {
        Self::default()
    }

    /// The plan for `len` points.
    pub fn plan(&mut self, len: usize) -> FftPlan {
        self.plans.entry(len).or_insert_with(|| FftPlan::new(len)).clone()
    }

    /// Take over the plans of `other` that are missing here.
    pub fn merge(&mut self, other: FftPlans) {
        for (len, plan) in other.plans {
            self.plans.entry(len).or_insert(plan);
        }
    }

    /// Number of distinct lengths planned so far.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
