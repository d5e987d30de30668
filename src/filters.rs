//! Filterbank design: band responses and atom footprints.
//!
//! The squared magnitude responses of all bands form a partition of unity
//! on the frequency circle. Bandpass bands are analytic (positive
//! frequencies only) and sit on a logarithmic ladder; each one is the
//! difference of two smooth steps placed half-way between neighbouring
//! ladder centers, so neighbouring bands telescope to exactly one. Every
//! bandpass response is faded out around Nyquist by a taper that is
//! odd-symmetric about 0.5, the top band having no upper step, and the
//! lowpass band is defined as the exact complement of what the ladder
//! covers on both halves of the circle. With analysis and synthesis atoms
//! equal, this makes the filterbank a tight frame:
//!
//! `lowpass(f) + sum_b [band_b(f) + band_b(-f)] = 1`
//!
//! Atoms are never stored at the full sample rate. [`design_kernel`] only
//! measures where a band's response and atom are significant; the
//! transforms evaluate the responses directly on their FFT grids.

use crate::convert::ladder_step_below;
use crate::fft::FftPlans;
use crate::Params;
use num_complex::Complex64;
use std::f64::consts::{LN_2, PI};
use std::ops::Range;

/// Relative atom amplitude below which an atom counts as decayed.
pub const SUPPORT_TOLERANCE: f64 = 1e-8;

/// Relative response amplitude below which a band is treated as empty.
pub const BANDWIDTH_TOLERANCE: f64 = 1e-7;

/// Longest atom half-length, in samples, that a band may have.
pub const MAX_SUPPORT_LEN: usize = 1 << 20;

/// Upper bound on the width of the Nyquist taper. Keeps the bandpass
/// responses at zero well before the circle wraps back to DC.
const NYQUIST_TAPER_MAX_SCALE: f64 = 0.05;

const MIN_FOLD_LEN: usize = 64;
const BISECTION_STEPS: usize = 64;
const MAX_REACH_OCTAVES: f64 = 64.0;

/// Smooth step rising from 0 to 1 around `x = 0`.
///
/// The transition has a Gaussian-shaped derivative of width `scale`, and
/// `smooth_step(x, s) + smooth_step(-x, s) == 1`.
///
/// # Example
/// ```
/// use gaborstream::filters::smooth_step;
///
/// assert_eq!(smooth_step(0.0, 1.0), 0.5);
/// assert!((smooth_step(-1.0, 1.0) - 0.078_649_603_5).abs() < 1e-10);
/// ```
pub fn smooth_step(x: f64, scale: f64) -> f64 {
    0.5 * libm::erfc(-x / scale)
}

/// Which response of the ladder a band uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Bandpass response of one ladder step.
    Bandpass(i64),
    /// The lowpass complement.
    Lowpass,
}

/// Logarithmic band ladder derived from [`Params`].
///
/// Ladder step `k` is centered at `ff_ref * 2^(k / bands_per_octave)`.
/// Steps `bottom..=top` are the bandpass bands.
#[derive(Debug, Clone, Copy)]
pub struct Ladder {
    ref_log2: f64,
    spacing: f64,
    scale: f64,
    nyquist_scale: f64,
    /// Highest ladder step; its band runs through Nyquist.
    pub top: i64,
    /// Lowest ladder step; `ff_min` lies between it and the next one up.
    pub bottom: i64,
}

impl Ladder {
    /// Lay out the ladder for already validated parameters.
    pub fn new(params: &Params) -> Self {
        let bpo = params.bands_per_octave;
        let spacing = 1.0 / bpo as f64;
        let scale = params.overlap * spacing;
        let top = ladder_step_below(params.ff_ref, bpo, 0.5) - 1;
        let bottom = ladder_step_below(params.ff_ref, bpo, params.ff_min).min(top);
        Self {
            ref_log2: params.ff_ref.log2(),
            spacing,
            scale,
            nyquist_scale: (0.5 * LN_2 * scale).min(NYQUIST_TAPER_MAX_SCALE),
            top,
            bottom,
        }
    }

    /// Number of bandpass bands.
    pub fn len(&self) -> usize {
        (self.top - self.bottom + 1) as usize
    }

    /// Whether the ladder has no bands. Never true for a constructed ladder.
    pub fn is_empty(&self) -> bool {
        self.top < self.bottom
    }

    /// Lower edge of ladder step `step`, in log2 frequency.
    pub fn lower_edge(&self, step: i64) -> f64 {
        self.ref_log2 + (step as f64 - 0.5) * self.spacing
    }

    /// Center of ladder step `step`, clipped to Nyquist.
    pub fn center(&self, step: i64) -> f64 {
        (self.ref_log2 + step as f64 * self.spacing).exp2().min(0.5)
    }

    fn nyquist_taper(&self, f: f64) -> f64 {
        smooth_step(0.5 - f, self.nyquist_scale)
    }

    /// Squared response of bandpass step `step` at frequency `f` in `[0, 1)`.
    ///
    /// Frequencies above 0.5 are the negative half of the circle.
    pub fn bandpass_power(&self, step: i64, f: f64) -> f64 {
        if f <= 0.0 {
            return 0.0;
        }
        let u = f.log2();
        let lo = self.lower_edge(step);
        let psi = if step >= self.top {
            smooth_step(u - lo, self.scale)
        } else {
            let hi = self.lower_edge(step + 1);
            // evaluate on the side where both steps are small
            if u < 0.5 * (lo + hi) {
                smooth_step(u - lo, self.scale) - smooth_step(u - hi, self.scale)
            } else {
                smooth_step(hi - u, self.scale) - smooth_step(lo - u, self.scale)
            }
        };
        psi.max(0.0) * self.nyquist_taper(f)
    }

    /// Squared response of the lowpass band at frequency `f` in `[0, 1)`.
    ///
    /// Whatever the tapered ladder leaves uncovered at `f` and at its
    /// mirror `1 - f`; even, so its atom is real.
    pub fn lowpass_power(&self, f: f64) -> f64 {
        let edge = self.lower_edge(self.bottom);
        let below = |g: f64| {
            if g <= 0.0 {
                1.0
            } else {
                smooth_step(edge - g.log2(), self.scale)
            }
        };
        below(f) * self.nyquist_taper(f) + below(1.0 - f) * smooth_step(f - 0.5, self.nyquist_scale)
    }

    /// Squared response of `response` at frequency `f`, wrapped onto `[0, 1)`.
    pub fn power(&self, response: Response, f: f64) -> f64 {
        let f = f.rem_euclid(1.0);
        match response {
            Response::Bandpass(step) => self.bandpass_power(step, f),
            Response::Lowpass => self.lowpass_power(f),
        }
    }

    /// Amplitude response of `response` at frequency `f`.
    pub fn amplitude(&self, response: Response, f: f64) -> f64 {
        self.power(response, f).max(0.0).sqrt()
    }

    /// Rough time-domain width (in samples) of the atom for `response`.
    pub fn time_scale(&self, response: Response) -> f64 {
        let step = match response {
            Response::Bandpass(step) => step,
            Response::Lowpass => self.bottom,
        };
        let edge = self.lower_edge(step).exp2();
        1.0 / (2.0 * PI * edge * LN_2 * self.scale)
    }
}

/// Where one band's atom is significant, together with its decimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    /// Lowest significant frequency. Negative for the lowpass band, whose
    /// support wraps around DC.
    pub f_lo: f64,
    /// Highest significant frequency.
    pub f_hi: f64,
    /// Atom half-length in samples.
    pub half_len: usize,
    /// Coefficient time step in signal samples (a power of two).
    pub step: i64,
}

impl Kernel {
    /// Signed bins of a `len`-point FFT grid covered by the band.
    ///
    /// At most `len / step` bins are returned, so folding them onto
    /// `len / step` points never maps two bins to the same slot.
    pub fn bins(&self, len: usize) -> Range<i64> {
        support_bins(self.f_lo, self.f_hi, len / self.step as usize, len)
    }
}

fn support_bins(f_lo: f64, f_hi: f64, fold_len: usize, len: usize) -> Range<i64> {
    let lo = (f_lo * len as f64).ceil() as i64;
    let hi = (f_hi * len as f64).floor() as i64 + 1;
    lo..hi.min(lo + fold_len as i64)
}

/// Measure the band whose squared response is `response` on `ladder`.
///
/// The frequency support is found by bisection on the response, the
/// decimation is the largest power of two under which that support does
/// not alias, and the atom's half-length is read off the atom sampled at
/// that decimation: the support's bins are folded onto a short grid and
/// inverse transformed, doubling the grid until the atom decays inside
/// its first quarter.
///
/// # Arguments
/// * `band` - Band index, only used for error reporting
/// * `ladder` - Band layout
/// * `response` - Response of the band on the ladder
/// * `plans` - FFT plan cache
///
/// # Errors
/// Returns [`Error::KernelTooLong`](crate::Error::KernelTooLong) if the atom
/// does not decay within [`MAX_SUPPORT_LEN`] samples.
pub fn design_kernel(
    band: usize,
    ladder: &Ladder,
    response: Response,
    plans: &mut FftPlans,
) -> crate::Result<Kernel> {
    let too_long = crate::Error::KernelTooLong {
        band,
        max_len: MAX_SUPPORT_LEN,
    };
    let time_scale = ladder.time_scale(response);
    if !(time_scale <= MAX_SUPPORT_LEN as f64) {
        return Err(too_long);
    }

    let (f_lo, f_hi) = frequency_support(ladder, response);
    let step = decimation(f_hi - f_lo);

    let estimate = (32.0 * time_scale / step as f64).ceil() as usize;
    let mut fold_len = estimate.next_power_of_two().max(MIN_FOLD_LEN);
    loop {
        let len = fold_len * step as usize;
        let mut atom = vec![Complex64::new(0.0, 0.0); fold_len];
        for m in support_bins(f_lo, f_hi, fold_len, len) {
            let slot = m.rem_euclid(fold_len as i64) as usize;
            atom[slot] += ladder.amplitude(response, m as f64 / len as f64);
        }
        plans.plan(fold_len).inverse(&mut atom);

        if let Some(last) = last_significant(&atom) {
            let half_len = (last + 1) * step as usize;
            if half_len > MAX_SUPPORT_LEN {
                return Err(too_long);
            }
            return Ok(Kernel {
                f_lo,
                f_hi,
                half_len,
                step,
            });
        }
        if len >= 4 * MAX_SUPPORT_LEN {
            return Err(too_long);
        }
        fold_len *= 2;
    }
}

/// Frequency interval where the amplitude is above [`BANDWIDTH_TOLERANCE`]
/// of its peak.
fn frequency_support(ladder: &Ladder, response: Response) -> (f64, f64) {
    let amplitude = |f: f64| ladder.amplitude(response, f);
    match response {
        Response::Lowpass => {
            let threshold = amplitude(0.0) * BANDWIDTH_TOLERANCE;
            let f_hi = if amplitude(0.5) >= threshold {
                0.5
            } else {
                crossing(amplitude, 0.0, 0.5, threshold)
            };
            (-f_hi, f_hi)
        }
        Response::Bandpass(step) => {
            let center = ladder.center(step);
            let threshold = amplitude(center) * BANDWIDTH_TOLERANCE;

            let edge = 1.0 - f64::EPSILON;
            let f_hi = if amplitude(edge) >= threshold {
                edge
            } else {
                crossing(amplitude, center, edge, threshold)
            };

            // the lower side is searched in log frequency
            let u_center = center.log2();
            let mut reach = 1.0;
            while reach < MAX_REACH_OCTAVES && amplitude((u_center - reach).exp2()) >= threshold {
                reach *= 2.0;
            }
            let u_lo = crossing(
                |u| amplitude(u.exp2()),
                u_center,
                u_center - reach,
                threshold,
            );
            (u_lo.exp2(), f_hi)
        }
    }
}

/// Last point between `inside` (at or above `threshold`) and `outside`
/// (below it) where `f` is still at least `threshold`.
fn crossing(f: impl Fn(f64) -> f64, mut inside: f64, mut outside: f64, threshold: f64) -> f64 {
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (inside + outside);
        if f(mid) >= threshold {
            inside = mid;
        } else {
            outside = mid;
        }
    }
    inside
}

/// Largest power-of-two decimation under which a support of `width` does
/// not alias.
fn decimation(width: f64) -> i64 {
    let mut step = 1i64;
    while (2 * step) as f64 * width <= 1.0 {
        step *= 2;
    }
    step
}

/// Offset of the last atom sample above tolerance, or `None` if the atom
/// has not decayed within a quarter of the period (time aliasing risk).
fn last_significant(atom: &[Complex64]) -> Option<usize> {
    let n = atom.len();
    let peak = atom.iter().map(|h| h.norm()).fold(0.0, f64::max);
    let threshold = peak * SUPPORT_TOLERANCE;

    let last = (1..n / 2)
        .rev()
        .find(|&t| atom[t].norm() >= threshold || atom[n - t].norm() >= threshold)
        .unwrap_or(0);

    (last < n / 4).then_some(last)
}
