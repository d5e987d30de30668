//! Conversion utilities between Hz, fractional frequencies and sample times.
//!
//! The engine works entirely in units of the sample rate: frequencies are
//! fractions of it (`ff`, in `(0, 0.5)`) and times are integer sample
//! numbers. These helpers translate to and from physical units.

mod frequency;
mod timing;

pub use frequency::*;
pub use timing::*;
