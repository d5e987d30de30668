//! Streaming analysis and resynthesis.
//!
//! Band `b` with atom `h`, half-length `L` and decimation `D` has
//! coefficients
//!
//! `c_b[k] = sum_n x[n] * conj(h[n - k*D])`,  `|n - k*D| <= L`
//!
//! and the signal is rebuilt as
//!
//! `y[n] = sum_b g_b * Re(sum_k c_b[k] * h[n - k*D])`
//!
//! with `g_b = 2D` for the analytic bandpass bands and `g_b = D` for the
//! real lowpass band. Since the squared responses sum to one, `y == x`
//! wherever all contributing coefficients are complete.
//!
//! Both directions run on FFT frames shared by a group of bands. A frame
//! is a power of two long, starts at a multiple of every member's
//! decimation and leaves room for the longest member atom on both sides of
//! the samples it handles, so circular correlation over it equals the
//! linear one. A band reads only the bins of its support, folded onto
//! `len / D` points: one short inverse FFT then yields its coefficients at
//! the decimated rate, and one short forward FFT spreads stored
//! coefficients back onto the frame.
use crate::analyzer::Group;
use crate::fft::{FftPlan, FftPlans};
use crate::utils::{ceil_div, floor_div, valid_signal};
use crate::{Analyzer, Coef, Coefs};
use num_complex::Complex64;
use std::ops::Range;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Contributions of one frame to one band, starting at local index `first`.
struct BandUpdate {
    band: usize,
    first: i64,
    values: Vec<Coef>,
}

/// One FFT frame of a group, handling samples `span`.
struct Frame {
    /// Sample time of frame point 0.
    origin: i64,
    span: Range<i64>,
    plan: FftPlan,
    /// Fold plan of each group member, in member order.
    folds: Vec<FftPlan>,
}

impl Frame {
    fn len(&self) -> usize {
        self.plan.len()
    }

    /// Local indices of the coefficients of a band that `span` touches.
    fn coef_range(&self, half_len: usize, step: i64) -> Range<i64> {
        let half = half_len as i64;
        ceil_div(self.span.start - half, step)..floor_div(self.span.end - 1 + half, step) + 1
    }

    /// Slot of coefficient `k` on the band's folded grid.
    fn slot(&self, k: i64, step: i64) -> usize {
        (k - self.origin / step) as usize
    }
}

fn wrap(m: i64, len: usize) -> usize {
    m.rem_euclid(len as i64) as usize
}

impl Analyzer {
    /// Cut `span` into the frames `group` processes it with.
    fn frames(&self, group: &Group, span: Range<i64>, plans: &mut FftPlans) -> Vec<Frame> {
        let hop = group.hop() as i64;
        let mut frames = Vec::new();
        let mut start = span.start;
        while start < span.end {
            let end = span.end.min(start + hop);
            let len = ((end - start) as usize + group.overhead()).next_power_of_two();
            let origin = floor_div(start - group.margin - group.align, group.align) * group.align;
            let folds = group
                .members
                .iter()
                .map(|&b| plans.plan(len / self.bands()[b].kernel.step as usize))
                .collect();
            frames.push(Frame {
                origin,
                span: start..end,
                plan: plans.plan(len),
                folds,
            });
            start = end;
        }
        frames
    }

    fn analyze_band(&self, b: usize, fold: &FftPlan, frame: &Frame, spectrum: &[Complex64]) -> BandUpdate {
        let kernel = &self.bands()[b].kernel;
        let step = kernel.step;
        let len = frame.len();
        let fold_len = fold.len();

        let mut folded = vec![ZERO; fold_len];
        let amplitudes = self.amplitudes(b, len);
        for (m, &a) in kernel.bins(len).zip(amplitudes.iter()) {
            folded[wrap(m, fold_len)] += spectrum[wrap(m, len)] * a;
        }
        fold.inverse(&mut folded);

        // fold.inverse scales by D / len, the correlation needs 1 / len
        let scale = (step as f64).recip();
        let coefs = frame.coef_range(kernel.half_len, step);
        let values = coefs
            .clone()
            .map(|k| {
                let c = folded[frame.slot(k, step)] * scale;
                Coef::new(c.re as f32, c.im as f32)
            })
            .collect();

        BandUpdate {
            band: b,
            first: coefs.start,
            values,
        }
    }

    /// Add band `b`'s stored coefficients around `frame` to `spectrum`.
    fn synthesize_band(
        &self,
        coefs: &Coefs,
        b: usize,
        fold: &FftPlan,
        frame: &Frame,
        spectrum: &mut [Complex64],
    ) {
        let band = &self.bands()[b];
        let kernel = &band.kernel;
        let step = kernel.step;
        let len = frame.len();
        let fold_len = fold.len();

        let mut folded = vec![ZERO; fold_len];
        let mut present = false;
        coefs.bands[b].for_each(frame.coef_range(kernel.half_len, step), |k, c| {
            folded[frame.slot(k, step)] = Complex64::new(c.re as f64, c.im as f64);
            present = true;
        });
        if !present {
            return;
        }
        fold.forward(&mut folded);

        let amplitudes = self.amplitudes(b, len);
        for (m, &a) in kernel.bins(len).zip(amplitudes.iter()) {
            spectrum[wrap(m, len)] += folded[wrap(m, fold_len)] * (band.synthesis_gain * a);
        }
    }

    /// Add the contribution of a signal chunk to `coefs`.
    ///
    /// `signal` holds samples `signal_begin..signal_begin + signal.len()`
    /// of a zero-padded signal. Every coefficient whose atom overlaps the
    /// chunk is incremented, so feeding consecutive chunks gives the same
    /// result as one call over their concatenation. Feeding the same
    /// samples twice counts them twice.
    ///
    /// Each call transforms at least one frame per band group, whose
    /// length grows with the longest atom; chunks of about
    /// [`analysis_support_len`](Self::analysis_support_len) samples or more
    /// keep that overhead small.
    ///
    /// # Errors
    /// * [`Error::BoundMismatch`](crate::Error::BoundMismatch) if `coefs`
    ///   belongs to a different analyzer
    /// * [`Error::NonFiniteSignal`](crate::Error::NonFiniteSignal) if the
    ///   chunk contains NaN or infinity; `coefs` is left untouched
    pub fn analyze(&self, signal: &[f32], signal_begin: i64, coefs: &mut Coefs) -> crate::Result<()> {
        coefs.check_bound(self)?;
        valid_signal(signal)?;
        if signal.is_empty() {
            return Ok(());
        }
        let span = signal_begin..signal_begin + signal.len() as i64;
        log::trace!("analyze: samples {}..{}", span.start, span.end);

        let mut plans = self.plan_cache();
        for group in self.groups() {
            for frame in self.frames(group, span.clone(), &mut plans) {
                let mut spectrum = vec![ZERO; frame.len()];
                for t in frame.span.clone() {
                    let x = signal[(t - signal_begin) as usize] as f64;
                    spectrum[(t - frame.origin) as usize] = Complex64::new(x, 0.0);
                }
                frame.plan.forward(&mut spectrum);

                let updates: Vec<BandUpdate> = {
                    #[cfg(feature = "parallel")]
                    {
                        use rayon::prelude::*;
                        group
                            .members
                            .par_iter()
                            .zip(&frame.folds)
                            .map(|(&b, fold)| self.analyze_band(b, fold, &frame, &spectrum))
                            .collect()
                    }
                    #[cfg(not(feature = "parallel"))]
                    {
                        group
                            .members
                            .iter()
                            .zip(&frame.folds)
                            .map(|(&b, fold)| self.analyze_band(b, fold, &frame, &spectrum))
                            .collect()
                    }
                };

                for update in updates {
                    let store = &mut coefs.bands[update.band];
                    for (k, value) in (update.first..).zip(update.values) {
                        *store.get_or_insert(k) += value;
                    }
                }
            }
        }
        self.keep_plans(plans);
        Ok(())
    }

    /// Reconstruct samples `signal_begin..signal_begin + signal.len()` from
    /// `coefs`, overwriting `signal`.
    ///
    /// Missing coefficients count as zero. The output is exact where every
    /// coefficient within [`synthesis_support_len`](Self::synthesis_support_len)
    /// is complete and unmodified.
    ///
    /// # Errors
    /// Returns [`Error::BoundMismatch`](crate::Error::BoundMismatch) if
    /// `coefs` belongs to a different analyzer.
    pub fn synthesize(&self, coefs: &Coefs, signal_begin: i64, signal: &mut [f32]) -> crate::Result<()> {
        coefs.check_bound(self)?;
        if signal.is_empty() {
            return Ok(());
        }
        let span = signal_begin..signal_begin + signal.len() as i64;
        log::trace!("synthesize: samples {}..{}", span.start, span.end);

        let mut out = vec![0.0f64; signal.len()];
        let mut plans = self.plan_cache();
        for group in self.groups() {
            for frame in self.frames(group, span.clone(), &mut plans) {
                let len = frame.len();
                let mut spectrum: Vec<Complex64> = {
                    #[cfg(feature = "parallel")]
                    {
                        use rayon::prelude::*;
                        group
                            .members
                            .par_iter()
                            .zip(&frame.folds)
                            .fold(
                                || vec![ZERO; len],
                                |mut acc, (&b, fold)| {
                                    self.synthesize_band(coefs, b, fold, &frame, &mut acc);
                                    acc
                                },
                            )
                            .reduce(
                                || vec![ZERO; len],
                                |mut acc, part| {
                                    acc.iter_mut().zip(&part).for_each(|(a, p)| *a += *p);
                                    acc
                                },
                            )
                    }
                    #[cfg(not(feature = "parallel"))]
                    {
                        let mut acc = vec![ZERO; len];
                        for (&b, fold) in group.members.iter().zip(&frame.folds) {
                            self.synthesize_band(coefs, b, fold, &frame, &mut acc);
                        }
                        acc
                    }
                };
                frame.plan.inverse(&mut spectrum);

                for t in frame.span.clone() {
                    out[(t - signal_begin) as usize] += spectrum[(t - frame.origin) as usize].re;
                }
            }
        }
        self.keep_plans(plans);

        for (y, v) in signal.iter_mut().zip(&out) {
            *y = *v as f32;
        }
        Ok(())
    }
}
