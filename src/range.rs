//! Bulk access to rectangular regions of a [`Coefs`] store.
//!
//! A region is a half-open band range (clamped to the store's bands) and a
//! half-open range of global sample times. All operations walk the region
//! in the same order: ascending band, then ascending sample time.
use crate::{Coef, Coefs};
use std::ops::Range;

/// Coordinates of one coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoefMeta {
    /// Band index.
    pub band: i32,
    /// Global sample time the coefficient is centered on.
    pub sample_time: i64,
}

/// How [`Coefs::write`] treats coordinates that have no coefficient yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Create missing coefficients.
    #[default]
    Fill,
    /// Skip missing coefficients; they consume no input.
    OnlyOverwrite,
}

const ZERO: Coef = Coef::new(0.0, 0.0);

impl Coefs {
    /// Copy out the existing coefficients of a region.
    ///
    /// # Example
    /// ```
    /// use gaborstream::{Analyzer, Coefs, Params};
    ///
    /// let analyzer = Analyzer::new(&Params::new(6, 0.05).with_ff_ref(0.1)).unwrap();
    /// let mut coefs = Coefs::new(&analyzer);
    /// assert!(coefs.read(0..100, 0..1000).is_empty());
    ///
    /// coefs.fill(0..1, 0..16, |_, c| c);
    /// let step = analyzer.band_decimation(0).unwrap() as usize;
    /// assert_eq!(coefs.read(0..1, 0..16).len(), 16 / step);
    /// ```
    pub fn read(&self, bands: Range<i32>, times: Range<i64>) -> Vec<Coef> {
        let mut out = Vec::new();
        self.visit(bands, times, |_, c| out.push(c));
        out
    }

    /// Like [`read`](Self::read), also returning each coefficient's coordinates.
    pub fn read_with_meta(&self, bands: Range<i32>, times: Range<i64>) -> (Vec<Coef>, Vec<CoefMeta>) {
        let mut values = Vec::new();
        let mut metas = Vec::new();
        self.visit(bands, times, |meta, c| {
            values.push(c);
            metas.push(meta);
        });
        (values, metas)
    }

    /// Replace every existing coefficient in a region by `f(meta, value)`.
    ///
    /// Missing coordinates are neither visited nor created.
    pub fn process(
        &mut self,
        bands: Range<i32>,
        times: Range<i64>,
        mut f: impl FnMut(CoefMeta, Coef) -> Coef,
    ) {
        for b in self.clamp_bands(bands) {
            let step = self.step(b);
            let local = self.local_range(b, &times);
            self.bands[b].for_each_mut(local, |k, c| {
                *c = f(meta(b, k, step), *c);
            });
        }
    }

    /// Like [`process`](Self::process), but missing coordinates are visited
    /// with a zero value and created from the result.
    pub fn fill(
        &mut self,
        bands: Range<i32>,
        times: Range<i64>,
        mut f: impl FnMut(CoefMeta, Coef) -> Coef,
    ) {
        for b in self.clamp_bands(bands) {
            let step = self.step(b);
            let local = self.local_range(b, &times);
            let band = &mut self.bands[b];
            for k in local {
                let c = band.get_or_insert(k);
                *c = f(meta(b, k, step), *c);
            }
        }
    }

    /// Assign `input` to a region position by position in traversal order.
    ///
    /// When `input` runs out, the remaining coordinates get zero; surplus
    /// input is ignored.
    pub fn write(&mut self, bands: Range<i32>, times: Range<i64>, input: &[Coef], mode: WriteMode) {
        let mut input = input.iter();
        let f = |_: CoefMeta, _: Coef| input.next().copied().unwrap_or(ZERO);
        match mode {
            WriteMode::Fill => self.fill(bands, times, f),
            WriteMode::OnlyOverwrite => self.process(bands, times, f),
        }
    }

    /// Like [`write`](Self::write), but each value comes with the
    /// coordinates it is meant for.
    ///
    /// The first position whose metadata differs from the coordinate being
    /// written, or where either input runs out, is set to zero together
    /// with every later coordinate, and `false` is returned.
    pub fn write_with_meta(
        &mut self,
        bands: Range<i32>,
        times: Range<i64>,
        input: &[Coef],
        input_meta: &[CoefMeta],
        mode: WriteMode,
    ) -> bool {
        let mut input = input.iter().zip(input_meta);
        let mut in_sync = true;
        let f = |meta: CoefMeta, _: Coef| {
            if in_sync {
                match input.next() {
                    Some((&c, &m)) if m == meta => return c,
                    _ => in_sync = false,
                }
            }
            ZERO
        };
        match mode {
            WriteMode::Fill => self.fill(bands, times, f),
            WriteMode::OnlyOverwrite => self.process(bands, times, f),
        }
        if !in_sync {
            log::trace!("write_with_meta: input out of step with region");
        }
        in_sync
    }

    fn visit(&self, bands: Range<i32>, times: Range<i64>, mut f: impl FnMut(CoefMeta, Coef)) {
        for b in self.clamp_bands(bands) {
            let step = self.step(b);
            self.bands[b].for_each(self.local_range(b, &times), |k, c| f(meta(b, k, step), c));
        }
    }
}

fn meta(band: usize, k: i64, step: i64) -> CoefMeta {
    CoefMeta {
        band: band as i32,
        sample_time: k * step,
    }
}
