//! Resampling coefficients onto a regular time grid for display.
use crate::utils::round_div;
use crate::Coefs;
use ndarray::Array2;
use std::ops::Range;

/// Magnitudes of a region sampled on a regular grid.
///
/// Row `i` is band `bands.start + i` (after clamping to the store's
/// bands); column `j` is the magnitude of that band's coefficient nearest
/// to sample time `t0 + j * hop`, or 0 where no coefficient is stored.
///
/// # Arguments
/// * `coefs` - Coefficient store
/// * `bands` - Band range, clamped like the range operations
/// * `t0` - Sample time of the first column
/// * `hop` - Samples between columns
/// * `n_frames` - Number of columns
///
/// # Errors
/// Returns [`Error::InvalidParameter`](crate::Error::InvalidParameter) if
/// `hop` is not positive.
///
/// # Example
/// ```
/// use gaborstream::{render, Analyzer, Coefs, Params};
///
/// let analyzer = Analyzer::new(&Params::new(6, 0.05).with_ff_ref(0.1)).unwrap();
/// let coefs = Coefs::new(&analyzer);
/// let grid = render::magnitude_grid(&coefs, 0..4, 0, 32, 10).unwrap();
/// assert_eq!(grid.shape(), &[4, 10]);
/// ```
pub fn magnitude_grid(
    coefs: &Coefs,
    bands: Range<i32>,
    t0: i64,
    hop: i64,
    n_frames: usize,
) -> crate::Result<Array2<f32>> {
    if hop <= 0 {
        return Err(crate::Error::InvalidParameter {
            name: "hop",
            value: hop.to_string(),
            reason: "must be positive".to_string(),
        });
    }

    let bands = coefs.clamp_bands(bands);
    let mut grid = Array2::<f32>::zeros((bands.len(), n_frames));

    for (row, b) in bands.enumerate() {
        let step = coefs.step(b);
        let band = &coefs.bands[b];
        for col in 0..n_frames {
            let t = t0 + col as i64 * hop;
            if let Some(c) = band.get(round_div(t, step)) {
                grid[[row, col]] = c.norm();
            }
        }
    }

    Ok(grid)
}

/// Convert a magnitude grid to decibels relative to `ref_amplitude`.
///
/// Values are floored at `amin` before taking logarithms; with `top_db`
/// the result is clipped to at most that far below its maximum.
pub fn amplitude_to_db(
    amplitude: &Array2<f32>,
    ref_amplitude: f32,
    amin: f32,
    top_db: Option<f32>,
) -> Array2<f32> {
    let log_ref = 20.0 * ref_amplitude.max(amin).log10();
    let mut db = amplitude.mapv(|a| 20.0 * a.max(amin).log10() - log_ref);

    if let Some(top) = top_db {
        let max_db = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        db.mapv_inplace(|v| v.max(max_db - top));
    }

    db
}
