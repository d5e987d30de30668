//! Streaming constant-Q Gabor analysis and resynthesis for Rust.
//!
//! Gaborstream decomposes an audio signal into a bank of logarithmically
//! spaced complex bandpass bands plus one lowpass band, stores the
//! resulting coefficients sparsely, and rebuilds the signal from them. The
//! signal can be fed in arbitrary contiguous chunks, coefficients can be
//! inspected or modified in place, and old coefficients can be dropped to
//! bound memory in long-running streams.
//!
//! # Features
//!
//! - **Tight-frame filterbank**: analysis and synthesis atoms coincide and
//!   the band responses sum to one, so unmodified coefficients reconstruct
//!   the input to single-precision accuracy
//! - **Streaming**: chunked analysis accumulates into the same
//!   coefficients as a single pass
//! - **Sparse storage** with front eviction via [`Coefs::forget_before`]
//! - **Range protocol** for bulk read, write and in-place processing in a
//!   fixed band-then-time order
//!
//! # Quick Start
//!
//! ```rust
//! use gaborstream::{Analyzer, Coefs, Params};
//!
//! let params = Params::from_hz(12, 200.0, 440.0, 8000);
//! let analyzer = Analyzer::new(&params).unwrap();
//! let mut coefs = Coefs::new(&analyzer);
//!
//! // a 440 Hz tone, analyzed in two chunks
//! let signal: Vec<f32> = (0..4096)
//!     .map(|n| (2.0 * std::f32::consts::PI * 440.0 * n as f32 / 8000.0).sin())
//!     .collect();
//! analyzer.analyze(&signal[..1000], 0, &mut coefs).unwrap();
//! analyzer.analyze(&signal[1000..], 1000, &mut coefs).unwrap();
//!
//! // the reference band carries the tone
//! let band = analyzer.band_ref();
//! let peak = coefs
//!     .read(band..band + 1, 1024..3072)
//!     .iter()
//!     .map(|c| c.norm())
//!     .fold(0.0, f32::max);
//! assert!(peak > 0.1);
//!
//! let mut rebuilt = vec![0.0; 512];
//! analyzer.synthesize(&coefs, 1792, &mut rebuilt).unwrap();
//! assert!((rebuilt[0] - signal[1792]).abs() < 1e-3);
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`params`] | Filterbank parameters |
//! | [`analyzer`] | The immutable filterbank and its band queries |
//! | [`coefs`] | Sparse coefficient store and eviction |
//! | [`range`] | Bulk read, write and process over band/time regions |
//! | [`render`] | Magnitude grids for display |
//! | [`filters`] | Band responses and atom design |
//! | [`convert`] | Hz, fractional frequency and sample time conversions |
//! | [`fft`] | Cached FFT plans for atom design and the transforms |
//! | [`utils`] | Integer time arithmetic and signal checks |
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`. A failed call leaves the coefficient
//! store untouched.
//!
//! # Safety
//!
//! This crate uses `#![forbid(unsafe_code)]`.
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `parallel` | Analyze and synthesize bands concurrently with rayon |
//! | `serde` | `Serialize`/`Deserialize` for [`Params`] and [`CoefMeta`] |

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, Result};

pub mod analyzer;
pub mod coefs;
pub mod convert;
pub mod fft;
pub mod filters;
pub mod params;
pub mod range;
pub mod render;
mod transform;
pub mod utils;

pub use analyzer::{Analyzer, BandKind};
pub use coefs::Coefs;
pub use params::Params;
pub use range::{CoefMeta, WriteMode};

/// A single filterbank coefficient.
pub type Coef = num_complex::Complex32;
