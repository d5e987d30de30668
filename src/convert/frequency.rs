/// Convert a frequency in Hz to a fraction of the sample rate.
///
/// # Example
/// ```
/// use gaborstream::convert::hz_to_ff;
///
/// assert_eq!(hz_to_ff(24000.0, 48000), 0.5);
/// ```
pub fn hz_to_ff(hz: f64, sr: u32) -> f64 {
    hz / sr as f64
}

/// Convert a fraction of the sample rate to a frequency in Hz.
pub fn ff_to_hz(ff: f64, sr: u32) -> f64 {
    ff * sr as f64
}

/// Center frequency of ladder step `step` relative to `ff_ref`.
///
/// Steps are `1 / bands_per_octave` octaves apart; step 0 is `ff_ref`
/// itself and positive steps go up in frequency.
///
/// # Example
/// ```
/// use gaborstream::convert::ladder_frequency;
///
/// let ff = ladder_frequency(0.01, 12, 12);
/// assert!((ff - 0.02).abs() < 1e-12);
/// ```
pub fn ladder_frequency(ff_ref: f64, bands_per_octave: u32, step: i64) -> f64 {
    ff_ref * 2.0_f64.powf(step as f64 / bands_per_octave as f64)
}

/// Largest ladder step whose center frequency does not exceed `ff`.
///
/// A small tolerance keeps frequencies that sit exactly on a ladder step
/// (up to rounding in `log2`) on that step.
pub fn ladder_step_below(ff_ref: f64, bands_per_octave: u32, ff: f64) -> i64 {
    let steps = bands_per_octave as f64 * (ff / ff_ref).log2();
    (steps + 1e-9).floor() as i64
}
