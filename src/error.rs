/// Crate-level error type for the gaborstream filterbank engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter `{name}`: got {value}, {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Band index outside `[0, band_count)`.
    #[error("band index {band} out of range: analyzer has {count} bands")]
    BandIndexOutOfRange { band: i32, count: usize },

    /// A coefficient store was used with an analyzer other than the one
    /// it was created from.
    #[error("coefficient store is bound to a different analyzer")]
    BoundMismatch,

    /// Signal data contains non-finite values (NaN or Inf).
    #[error("signal contains non-finite values")]
    NonFiniteSignal,

    /// A band kernel did not decay within the maximum design length.
    #[error("kernel for band {band} does not fit in {max_len} samples")]
    KernelTooLong { band: usize, max_len: usize },
}

/// Convenience Result type for gaborstream operations.
pub type Result<T> = std::result::Result<T, Error>;
