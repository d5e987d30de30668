//! Filterbank parameters.
use crate::convert::hz_to_ff;

/// Parameters that fully determine an [`Analyzer`](crate::Analyzer)'s filterbank.
///
/// Frequencies are given as fractions of the sample rate. The struct is
/// plain data; [`Params::validate`] is run by the analyzer constructor.
///
/// # Example
/// ```
/// use gaborstream::Params;
///
/// let params = Params::new(24, 100.0 / 48000.0)
///     .with_ff_ref(440.0 / 48000.0)
///     .with_overlap(0.7);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Params {
    /// Number of bandpass bands per octave.
    pub bands_per_octave: u32,
    /// Lower limit of the analysis range. The bandpass ladder extends low
    /// enough that `ff_min` falls between its two lowest bands.
    pub ff_min: f64,
    /// Reference frequency. One bandpass band is centered exactly here.
    pub ff_ref: f64,
    /// Width of the transition between neighbouring bands, in units of
    /// the band spacing. Larger values give wider bands and, up to a few
    /// band spacings, shorter atoms; past that the lowest bands spread
    /// far enough into DC that atom lengths level off.
    pub overlap: f64,
}

impl Params {
    /// Create parameters with the default reference (A4 at 44.1 kHz) and overlap.
    ///
    /// # Arguments
    /// * `bands_per_octave` - Number of bandpass bands per octave
    /// * `ff_min` - Lowest frequency of interest, as a fraction of the sample rate
    pub fn new(bands_per_octave: u32, ff_min: f64) -> Self {
        Self {
            bands_per_octave,
            ff_min,
            ..Self::default()
        }
    }

    /// Create parameters from frequencies in Hz.
    ///
    /// # Arguments
    /// * `bands_per_octave` - Number of bandpass bands per octave
    /// * `fmin` - Lowest frequency of interest in Hz
    /// * `fref` - Reference frequency in Hz (e.g. 440.0)
    /// * `sr` - Sample rate in Hz
    pub fn from_hz(bands_per_octave: u32, fmin: f64, fref: f64, sr: u32) -> Self {
        Self {
            bands_per_octave,
            ff_min: hz_to_ff(fmin, sr),
            ff_ref: hz_to_ff(fref, sr),
            ..Self::default()
        }
    }

    /// Set the reference frequency.
    pub fn with_ff_ref(mut self, ff_ref: f64) -> Self {
        self.ff_ref = ff_ref;
        self
    }

    /// Set the overlap factor.
    pub fn with_overlap(mut self, overlap: f64) -> Self {
        self.overlap = overlap;
        self
    }

    /// Set the lowest frequency of interest.
    pub fn with_ff_min(mut self, ff_min: f64) -> Self {
        self.ff_min = ff_min;
        self
    }

    /// Check every field against its valid range.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`](crate::Error::InvalidParameter)
    /// naming the first offending field.
    pub fn validate(&self) -> crate::Result<()> {
        if self.bands_per_octave == 0 {
            return Err(invalid(
                "bands_per_octave",
                self.bands_per_octave,
                "must be greater than zero",
            ));
        }
        if !(self.ff_min > 0.0 && self.ff_min < 0.5) {
            return Err(invalid("ff_min", self.ff_min, "must be in (0, 0.5)"));
        }
        if !(self.ff_ref > 0.0 && self.ff_ref < 0.5) {
            return Err(invalid("ff_ref", self.ff_ref, "must be in (0, 0.5)"));
        }
        if !(self.overlap > 0.0 && self.overlap.is_finite()) {
            return Err(invalid("overlap", self.overlap, "must be positive and finite"));
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            bands_per_octave: 12,
            ff_min: 20.0 / 44100.0,
            ff_ref: 440.0 / 44100.0,
            overlap: 0.7,
        }
    }
}

fn invalid(name: &'static str, value: impl ToString, reason: &str) -> crate::Error {
    crate::Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_default_is_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let p = Params::new(48, 0.01).with_ff_ref(0.02).with_overlap(1.5);
        assert_eq!(p.bands_per_octave, 48);
        assert_eq!(p.ff_min, 0.01);
        assert_eq!(p.ff_ref, 0.02);
        assert_eq!(p.overlap, 1.5);
    }

    #[test]
    fn test_from_hz() {
        let p = Params::from_hz(12, 200.0, 440.0, 48000);
        assert!((p.ff_min - 200.0 / 48000.0).abs() < 1e-15);
        assert!((p.ff_ref - 440.0 / 48000.0).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_bad_fields() {
        let bad = [
            Params::new(0, 0.01),
            Params::new(12, 0.0),
            Params::new(12, 0.5),
            Params::new(12, f64::NAN),
            Params::new(12, 0.01).with_ff_ref(0.7),
            Params::new(12, 0.01).with_ff_ref(-0.1),
            Params::new(12, 0.01).with_overlap(0.0),
            Params::new(12, 0.01).with_overlap(f64::INFINITY),
        ];
        for p in bad {
            assert!(
                matches!(p.validate(), Err(Error::InvalidParameter { .. })),
                "accepted {:?}",
                p
            );
        }
    }

    #[test]
    fn test_error_names_field() {
        let err = Params::new(12, 0.01).with_overlap(-1.0).validate().unwrap_err();
        match err {
            Error::InvalidParameter { name, .. } => assert_eq!(name, "overlap"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
