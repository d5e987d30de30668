/// Smallest integer `q` with `q * d >= a`, for `d > 0`.
///
/// Rounds toward positive infinity for negative numerators as well, which
/// `/` on `i64` does not.
///
/// # Example
/// ```
/// use gaborstream::utils::ceil_div;
///
/// assert_eq!(ceil_div(7, 4), 2);
/// assert_eq!(ceil_div(-7, 4), -1);
/// assert_eq!(ceil_div(-8, 4), -2);
/// ```
pub fn ceil_div(a: i64, d: i64) -> i64 {
    debug_assert!(d > 0);
    a.div_euclid(d) + i64::from(a.rem_euclid(d) != 0)
}

/// Largest integer `q` with `q * d <= a`, for `d > 0`.
pub fn floor_div(a: i64, d: i64) -> i64 {
    debug_assert!(d > 0);
    a.div_euclid(d)
}

/// Nearest integer to `a / d`, ties rounding up, for `d > 0`.
pub fn round_div(a: i64, d: i64) -> i64 {
    debug_assert!(d > 0);
    let q = a.div_euclid(d);
    if 2 * a.rem_euclid(d) >= d {
        q + 1
    } else {
        q
    }
}
