/// Convert a sample time to seconds.
pub fn samples_to_time(sample_time: i64, sr: u32) -> f64 {
    sample_time as f64 / sr as f64
}

/// Convert seconds to the nearest sample time.
pub fn time_to_samples(seconds: f64, sr: u32) -> i64 {
    (seconds * sr as f64).round() as i64
}
