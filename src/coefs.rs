//! Sparse streaming storage for filterbank coefficients.
//!
//! Each band keeps its coefficients in fixed slices of [`SLICE_LEN`]
//! consecutive band-local time slots, indexed by an ordered map. Slots are
//! created on demand by analysis or `fill`, and freed from the front by
//! [`Coefs::forget_before`].
use crate::{utils::ceil_div, Analyzer, Coef, Params};
use std::collections::BTreeMap;
use std::ops::Range;

/// Number of band-local coefficient slots per storage slice.
pub const SLICE_LEN: usize = 64;

const ZERO: Coef = Coef::new(0.0, 0.0);

#[derive(Debug, Clone, PartialEq)]
struct Slice {
    /// Bit `i` set when slot `i` holds a coefficient.
    present: u64,
    values: [Coef; SLICE_LEN],
}

impl Slice {
    fn new() -> Self {
        Self {
            present: 0,
            values: [ZERO; SLICE_LEN],
        }
    }
}

fn split(k: i64) -> (i64, usize) {
    (
        k.div_euclid(SLICE_LEN as i64),
        k.rem_euclid(SLICE_LEN as i64) as usize,
    )
}

/// Coefficients of a single band, keyed by band-local time index.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct BandCoefs {
    slices: BTreeMap<i64, Box<Slice>>,
}

impl BandCoefs {
    pub fn get(&self, k: i64) -> Option<Coef> {
        let (s, i) = split(k);
        self.slices
            .get(&s)
            .filter(|slice| slice.present & (1 << i) != 0)
            .map(|slice| slice.values[i])
    }

    /// Mutable access to the coefficient at `k`, creating it at zero.
    pub fn get_or_insert(&mut self, k: i64) -> &mut Coef {
        let (s, i) = split(k);
        let slice = self.slices.entry(s).or_insert_with(|| Box::new(Slice::new()));
        slice.present |= 1 << i;
        &mut slice.values[i]
    }

    /// Visit every existing coefficient with local index in `range`, in
    /// ascending order.
    pub fn for_each(&self, range: Range<i64>, mut f: impl FnMut(i64, Coef)) {
        if range.is_empty() {
            return;
        }
        let (first, _) = split(range.start);
        let (last, _) = split(range.end - 1);
        for (&s, slice) in self.slices.range(first..=last) {
            let base = s * SLICE_LEN as i64;
            let mut bits = slice.present;
            while bits != 0 {
                let i = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                let k = base + i as i64;
                if range.contains(&k) {
                    f(k, slice.values[i]);
                }
            }
        }
    }

    /// Like [`for_each`](Self::for_each) with mutable access.
    pub fn for_each_mut(&mut self, range: Range<i64>, mut f: impl FnMut(i64, &mut Coef)) {
        if range.is_empty() {
            return;
        }
        let (first, _) = split(range.start);
        let (last, _) = split(range.end - 1);
        for (&s, slice) in self.slices.range_mut(first..=last) {
            let base = s * SLICE_LEN as i64;
            let mut bits = slice.present;
            while bits != 0 {
                let i = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                let k = base + i as i64;
                if range.contains(&k) {
                    f(k, &mut slice.values[i]);
                }
            }
        }
    }

    /// Drop coefficients with local index below `k_limit`.
    ///
    /// Whole slices before the limit are always freed. The slice holding
    /// `k_limit` is trimmed only for a clean cut.
    pub fn forget_before(&mut self, k_limit: i64, clean_cut: bool) {
        let (s, i) = split(k_limit);
        self.slices = self.slices.split_off(&s);
        if !clean_cut || i == 0 {
            return;
        }
        if let Some(slice) = self.slices.get_mut(&s) {
            let below = (1u64 << i) - 1;
            slice.present &= !below;
            for v in &mut slice.values[..i] {
                *v = ZERO;
            }
            if slice.present == 0 {
                self.slices.remove(&s);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slices
            .values()
            .map(|slice| slice.present.count_ones() as usize)
            .sum()
    }

    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }
}

/// Coefficient store for one stream.
///
/// A store is bound to the layout of the [`Analyzer`] it was created from:
/// passing it together with an analyzer built from different [`Params`]
/// fails with [`Error::BoundMismatch`](crate::Error::BoundMismatch).
/// Coefficients are addressed by band and by global sample time; band `b`
/// holds a coefficient every `band_decimation(b)` samples.
///
/// # Example
/// ```
/// use gaborstream::{Analyzer, Coefs, Params};
///
/// let analyzer = Analyzer::new(&Params::new(6, 0.05).with_ff_ref(0.1)).unwrap();
/// let mut coefs = Coefs::new(&analyzer);
/// analyzer.analyze(&[1.0; 256], 0, &mut coefs).unwrap();
/// assert!(!coefs.is_empty());
///
/// coefs.forget_before(&analyzer, i64::MAX, true).unwrap();
/// assert!(coefs.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Coefs {
    params: Params,
    steps: Vec<i64>,
    pub(crate) bands: Vec<BandCoefs>,
}

impl Coefs {
    /// Create an empty store laid out for `analyzer`.
    pub fn new(analyzer: &Analyzer) -> Self {
        let steps = analyzer.decimations();
        Self {
            params: *analyzer.params(),
            bands: vec![BandCoefs::default(); steps.len()],
            steps,
        }
    }

    pub(crate) fn check_bound(&self, analyzer: &Analyzer) -> crate::Result<()> {
        if self.params != *analyzer.params() {
            return Err(crate::Error::BoundMismatch);
        }
        Ok(())
    }

    /// Number of bands, lowpass included.
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Number of coefficients currently stored.
    pub fn len(&self) -> usize {
        self.bands.iter().map(BandCoefs::len).sum()
    }

    /// Whether the store holds no coefficients.
    pub fn is_empty(&self) -> bool {
        self.bands.iter().all(|b| b.slice_count() == 0)
    }

    /// Drop every coefficient.
    pub fn clear(&mut self) {
        for band in &mut self.bands {
            *band = BandCoefs::default();
        }
    }

    /// Discard coefficients whose sample time is before `limit`.
    ///
    /// With `clean_cut`, every such coefficient is removed. Without it, only
    /// storage slices lying wholly before `limit` are freed, which is
    /// cheaper but may keep up to one slice per band of older
    /// coefficients. Coefficients at or after `limit` are never touched,
    /// so synthesis from `limit + synthesis_support_len()` onward is
    /// unaffected.
    ///
    /// # Errors
    /// Returns [`Error::BoundMismatch`](crate::Error::BoundMismatch) if the
    /// store was created from a different analyzer.
    pub fn forget_before(
        &mut self,
        analyzer: &Analyzer,
        limit: i64,
        clean_cut: bool,
    ) -> crate::Result<()> {
        self.check_bound(analyzer)?;
        let before = self.len();
        for (band, &step) in self.bands.iter_mut().zip(&self.steps) {
            band.forget_before(ceil_div(limit, step), clean_cut);
        }
        log::trace!(
            "forget_before({limit}, clean_cut={clean_cut}): {} -> {} coefficients",
            before,
            self.len()
        );
        Ok(())
    }

    /// Decimation of band `b`, assumed in range.
    pub(crate) fn step(&self, b: usize) -> i64 {
        self.steps[b]
    }

    /// Clamp a band range to the bands of this store.
    pub(crate) fn clamp_bands(&self, bands: Range<i32>) -> Range<usize> {
        let count = self.bands.len() as i64;
        let start = (bands.start as i64).clamp(0, count) as usize;
        let end = (bands.end as i64).clamp(0, count) as usize;
        start..end.max(start)
    }

    /// Band-local index range of band `b` whose sample times lie in `times`.
    pub(crate) fn local_range(&self, b: usize, times: &Range<i64>) -> Range<i64> {
        if times.is_empty() {
            return 0..0;
        }
        let step = self.steps[b];
        ceil_div(times.start, step)..ceil_div(times.end, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f32) -> Coef {
        Coef::new(re, 0.0)
    }

    fn band_with(ks: impl IntoIterator<Item = i64>) -> BandCoefs {
        let mut band = BandCoefs::default();
        for k in ks {
            *band.get_or_insert(k) = c(k as f32);
        }
        band
    }

    fn keys(band: &BandCoefs) -> Vec<i64> {
        let mut out = Vec::new();
        band.for_each(i64::MIN..i64::MAX, |k, _| out.push(k));
        out
    }

    #[test]
    fn test_insert_and_get() {
        let mut band = BandCoefs::default();
        assert_eq!(band.get(5), None);
        *band.get_or_insert(5) += c(1.5);
        *band.get_or_insert(5) += c(1.0);
        *band.get_or_insert(-70) = c(-1.0);
        assert_eq!(band.get(5), Some(c(2.5)));
        assert_eq!(band.get(-70), Some(c(-1.0)));
        assert_eq!(band.get(4), None);
        assert_eq!(band.len(), 2);
        assert_eq!(band.slice_count(), 2);
    }

    #[test]
    fn test_for_each_order_and_bounds() {
        let band = band_with([130, -1, 0, 63, 64, -65, 7]);
        assert_eq!(keys(&band), vec![-65, -1, 0, 7, 63, 64, 130]);

        let mut seen = Vec::new();
        band.for_each(0..64, |k, v| {
            assert_eq!(v, c(k as f32));
            seen.push(k)
        });
        assert_eq!(seen, vec![0, 7, 63]);

        seen.clear();
        band.for_each(5..5, |k, _| seen.push(k));
        assert!(seen.is_empty());
    }

    #[test]
    fn test_for_each_mut_updates() {
        let mut band = band_with(0..10);
        band.for_each_mut(3..6, |_, v| *v = c(100.0));
        assert_eq!(band.get(2), Some(c(2.0)));
        assert_eq!(band.get(3), Some(c(100.0)));
        assert_eq!(band.get(5), Some(c(100.0)));
        assert_eq!(band.get(6), Some(c(6.0)));
    }

    #[test]
    fn test_forget_clean_cut() {
        let mut band = band_with(0..200);
        band.forget_before(70, true);
        assert_eq!(keys(&band), (70..200).collect::<Vec<_>>());
        // values at or after the limit survive untouched
        assert_eq!(band.get(70), Some(c(70.0)));
    }

    #[test]
    fn test_forget_coarse_keeps_straddling_slice() {
        let mut band = band_with(0..200);
        band.forget_before(70, false);
        assert_eq!(keys(&band), (64..200).collect::<Vec<_>>());
        band.forget_before(128, false);
        assert_eq!(keys(&band), (128..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_forget_removes_emptied_slice() {
        let mut band = band_with([1, 2, 3]);
        band.forget_before(10, true);
        assert_eq!(band.slice_count(), 0);
        assert_eq!(band.len(), 0);
    }

    #[test]
    fn test_forget_monotone() {
        let mut a = band_with(-100..300);
        a.forget_before(20, true);
        a.forget_before(150, true);
        let mut b = band_with(-100..300);
        b.forget_before(150, true);
        assert_eq!(a, b);

        // a lower limit afterwards is a no-op
        a.forget_before(-1000, true);
        assert_eq!(a, b);
    }
}
