mod numerical;
mod validation;

// Integer time arithmetic between global and band-local sample times
pub use numerical::{ceil_div, floor_div, round_div};

// Signal checks and comparison helpers
pub use validation::{max_abs_error, mse, valid_signal};
