//! The filterbank descriptor.
//!
//! An [`Analyzer`] is derived once from [`Params`] and never changes. It
//! owns every band's center frequency, decimation and atom footprint, and
//! is shared by reference between all stores and transform calls.
use crate::convert::ladder_frequency;
use crate::fft::FftPlans;
use crate::filters::{design_kernel, Kernel, Ladder, Response};
use crate::Params;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Shortest FFT frame the transforms use.
const MIN_FRAME_LEN: usize = 1024;

/// Classification of a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandKind {
    /// A bandpass band on the logarithmic ladder.
    Bandpass,
    /// The bandpass band centered exactly on `ff_ref`.
    Reference,
    /// The lowpass (DC) band, always the last band.
    Lowpass,
}

#[derive(Debug, Clone)]
pub(crate) struct Band {
    pub kind: BandKind,
    pub ff: f64,
    pub response: Response,
    pub kernel: Kernel,
    /// Scale applied to `Re(coef * atom)` during synthesis.
    pub synthesis_gain: f64,
    /// Index of the group this band is transformed with.
    pub group: usize,
    /// Amplitude response on `kernel.bins(frame_len)` of its group.
    pub spectrum: Vec<f64>,
}

impl Band {
    fn amplitudes(&self, ladder: &Ladder, len: usize) -> Vec<f64> {
        self.kernel
            .bins(len)
            .map(|m| ladder.amplitude(self.response, m as f64 / len as f64))
            .collect()
    }
}

/// Bands whose atoms are short enough to share one FFT frame length.
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub members: Vec<usize>,
    /// Longest frame, a power of two.
    pub frame_len: usize,
    /// Longest member atom half-length.
    pub margin: i64,
    /// Largest member decimation; frames start at multiples of it.
    pub align: i64,
}

impl Group {
    fn new(bands: &[Band], members: Vec<usize>, frame_len: usize) -> Self {
        let margin = members
            .iter()
            .map(|&b| bands[b].kernel.half_len as i64)
            .max()
            .unwrap_or(0);
        let align = members
            .iter()
            .map(|&b| bands[b].kernel.step)
            .max()
            .unwrap_or(1);
        let mut group = Self {
            members,
            frame_len,
            margin,
            align,
        };
        group.frame_len = frame_len.max((2 * group.overhead()).next_power_of_two());
        group
    }

    /// Frame points not available for new samples: room for an atom on
    /// each side plus alignment slack.
    pub fn overhead(&self) -> usize {
        (2 * self.margin + 3 * self.align) as usize
    }

    /// Samples handled per full frame.
    pub fn hop(&self) -> usize {
        self.frame_len - self.overhead()
    }
}

/// Immutable constant-Q Gabor filterbank.
///
/// Bandpass bands are numbered from the highest center frequency down;
/// the lowpass band follows them.
///
/// # Example
/// ```
/// use gaborstream::{Analyzer, Params};
///
/// let analyzer = Analyzer::new(&Params::new(12, 0.02).with_ff_ref(0.1)).unwrap();
/// assert_eq!(analyzer.bandpass_bands_begin(), 0);
/// assert_eq!(analyzer.band_lowpass(), analyzer.bandpass_bands_end());
/// let ff = analyzer.band_ff(analyzer.band_ref()).unwrap();
/// assert!((ff - 0.1).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer {
    params: Params,
    ladder: Ladder,
    bands: Vec<Band>,
    groups: Vec<Group>,
    band_ref: i32,
    support_len: usize,
    plans: Arc<Mutex<FftPlans>>,
}

impl Analyzer {
    /// Build the filterbank described by `params`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`](crate::Error::InvalidParameter) for
    /// out-of-range parameters and
    /// [`Error::KernelTooLong`](crate::Error::KernelTooLong) when a band's atom
    /// would exceed the design limit.
    pub fn new(params: &Params) -> crate::Result<Self> {
        params.validate()?;

        let ladder = Ladder::new(params);
        let n_bandpass = ladder.len();
        let mut plans = FftPlans::new();

        // the lowpass atom is the longest, so impossible layouts fail here first
        let kernel = design_kernel(n_bandpass, &ladder, Response::Lowpass, &mut plans)?;
        let lowpass = Band {
            kind: BandKind::Lowpass,
            ff: 0.0,
            response: Response::Lowpass,
            synthesis_gain: kernel.step as f64,
            kernel,
            group: 0,
            spectrum: Vec::new(),
        };

        let mut bands = Vec::with_capacity(n_bandpass + 1);
        for b in 0..n_bandpass {
            let step = ladder.top - b as i64;
            let response = Response::Bandpass(step);
            let kernel = design_kernel(b, &ladder, response, &mut plans)?;
            // analytic band: its mirror image comes from taking twice the real part
            let synthesis_gain = 2.0 * kernel.step as f64;
            bands.push(Band {
                kind: if step == 0 {
                    BandKind::Reference
                } else {
                    BandKind::Bandpass
                },
                ff: ladder_frequency(params.ff_ref, params.bands_per_octave, step),
                response,
                kernel,
                synthesis_gain,
                group: 0,
                spectrum: Vec::new(),
            });
        }

        bands.push(lowpass);

        let groups = group_bands(&mut bands, &ladder);
        let support_len = bands.iter().map(|b| b.kernel.half_len).max().unwrap_or(0);

        // step 0 sits at index `top`; below the ladder that would land on
        // or past the lowpass slot, so skip over it
        let band_ref = if ladder.top >= n_bandpass as i64 {
            ladder.top + 1
        } else {
            ladder.top
        };

        log::debug!(
            "analyzer: {} bandpass bands ({:.5}..{:.5}), decimation {}..{}, support {} samples, {} frame groups",
            n_bandpass,
            bands[n_bandpass - 1].ff,
            bands[0].ff,
            bands[0].kernel.step,
            bands[n_bandpass].kernel.step,
            support_len,
            groups.len(),
        );

        Ok(Self {
            params: *params,
            ladder,
            bands,
            groups,
            band_ref: band_ref as i32,
            support_len,
            plans: Arc::new(Mutex::new(plans)),
        })
    }

    /// Parameters this filterbank was built from.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Total number of bands, lowpass included.
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// First bandpass band (the highest in frequency).
    pub fn bandpass_bands_begin(&self) -> i32 {
        0
    }

    /// One past the last bandpass band.
    pub fn bandpass_bands_end(&self) -> i32 {
        self.bands.len() as i32 - 1
    }

    /// Index of the lowpass band.
    pub fn band_lowpass(&self) -> i32 {
        self.bandpass_bands_end()
    }

    /// Index of the band centered on `ff_ref`.
    ///
    /// When `ff_ref` lies outside the bandpass range the index is
    /// extrapolated along the ladder: negative above it, at least
    /// [`band_count`](Self::band_count) below it. It never names an
    /// existing band then, so band queries on it fail with
    /// [`Error::BandIndexOutOfRange`](crate::Error::BandIndexOutOfRange).
    pub fn band_ref(&self) -> i32 {
        self.band_ref
    }

    /// Center frequency of band `band` as a fraction of the sample rate.
    /// The lowpass band reports 0.
    pub fn band_ff(&self, band: i32) -> crate::Result<f64> {
        Ok(self.band(band)?.ff)
    }

    /// Decimation of band `band`: its coefficient spacing in signal samples.
    pub fn band_decimation(&self, band: i32) -> crate::Result<i64> {
        Ok(self.band(band)?.kernel.step)
    }

    /// Classification of band `band`.
    pub fn band_kind(&self, band: i32) -> crate::Result<BandKind> {
        Ok(self.band(band)?.kind)
    }

    /// Half-length of band `band`'s atom in signal samples.
    pub fn band_support_len(&self, band: i32) -> crate::Result<usize> {
        Ok(self.band(band)?.kernel.half_len)
    }

    /// Signal samples needed on each side of a coefficient's time to
    /// compute it, over all bands.
    pub fn analysis_support_len(&self) -> usize {
        self.support_len
    }

    /// Coefficient time span, in samples on each side, that contributes to
    /// one reconstructed sample. Equal to the analysis support because
    /// synthesis reuses the analysis atoms.
    pub fn synthesis_support_len(&self) -> usize {
        self.support_len
    }

    pub(crate) fn bands(&self) -> &[Band] {
        &self.bands
    }

    #[cfg(test)]
    pub(crate) fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    pub(crate) fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub(crate) fn decimations(&self) -> Vec<i64> {
        self.bands.iter().map(|b| b.kernel.step).collect()
    }

    /// Amplitude response of band `b` on its support bins of a `len`-point frame.
    pub(crate) fn amplitudes(&self, b: usize, len: usize) -> Cow<'_, [f64]> {
        let band = &self.bands[b];
        if self.groups[band.group].frame_len == len {
            Cow::Borrowed(&band.spectrum)
        } else {
            Cow::Owned(band.amplitudes(&self.ladder, len))
        }
    }

    /// Snapshot of the shared plan cache.
    pub(crate) fn plan_cache(&self) -> FftPlans {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return plans created during a call to the shared cache.
    pub(crate) fn keep_plans(&self, plans: FftPlans) {
        let mut cache = self.plans.lock().unwrap_or_else(PoisonError::into_inner);
        if plans.len() > cache.len() {
            cache.merge(plans);
        }
    }

    fn band(&self, band: i32) -> crate::Result<&Band> {
        usize::try_from(band)
            .ok()
            .and_then(|b| self.bands.get(b))
            .ok_or(crate::Error::BandIndexOutOfRange {
                band,
                count: self.bands.len(),
            })
    }
}

/// Group bands by the frame length their atoms call for, and tabulate
/// each band's response on its group's frame.
fn group_bands(bands: &mut [Band], ladder: &Ladder) -> Vec<Group> {
    let mut by_len: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (b, band) in bands.iter().enumerate() {
        let kernel = &band.kernel;
        let len = (2 * (2 * kernel.half_len + 3 * kernel.step as usize))
            .next_power_of_two()
            .max(MIN_FRAME_LEN);
        by_len.entry(len).or_default().push(b);
    }

    let shared: &[Band] = bands;
    let groups: Vec<Group> = by_len
        .into_iter()
        .map(|(len, members)| Group::new(shared, members, len))
        .collect();

    for (g, group) in groups.iter().enumerate() {
        for &b in &group.members {
            let band = &mut bands[b];
            band.group = g;
            band.spectrum = band.amplitudes(ladder, group.frame_len);
        }
    }
    groups
}

const _: () = {
    fn _assert_send_sync<T: Send + Sync>() {}
    fn _check() {
        _assert_send_sync::<Analyzer>();
    }
};
