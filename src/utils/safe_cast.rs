//! Safe casting utilities between `OpenCV`'s `i32` geometry and `usize` indices

use crate::{Error, Result};

/// Safely convert usize to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Safely convert i32 to usize
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_usize(value: i32) -> Result<usize> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} cannot be used as an index")))
}

/// Clamp and convert f64 to an 8-bit intensity
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
#[allow(clippy::cast_sign_loss)]
pub fn f64_to_u8_clamp(value: f64) -> u8 {
    if !value.is_finite() {
        return if value == f64::INFINITY { u8::MAX } else { 0 };
    }
    value.clamp(0.0, f64::from(u8::MAX)) as u8
}
