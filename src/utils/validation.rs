/// Validate a signal chunk.
///
/// Empty chunks are valid (streaming callers may hand over nothing), but
/// every sample must be finite.
///
/// # Example
/// ```
/// use gaborstream::utils::valid_signal;
///
/// assert!(valid_signal(&[0.0, 0.5, -0.5]).is_ok());
/// assert!(valid_signal(&[]).is_ok());
/// assert!(valid_signal(&[0.0, f32::NAN]).is_err());
/// ```
pub fn valid_signal(y: &[f32]) -> crate::Result<()> {
    if !y.iter().all(|&v| v.is_finite()) {
        return Err(crate::Error::NonFiniteSignal);
    }
    Ok(())
}

/// Mean squared difference over the common prefix of two signals.
pub fn mse(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    sum / n as f32
}

/// Largest absolute difference over the common prefix of two signals.
pub fn max_abs_error(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max)
}
