//! Instrument bounds and hard limits on decoded payloads.
//!
//! This module centralizes:
//! - `Bounds<T>`, the live `[min, max]` reported by the instrument for a
//!   settable parameter, with the range check used by every setter
//! - Size limits that keep a misbehaving peer from forcing huge allocations

use crate::error::{DhmError, DhmResult, ResultCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// Timing Defaults
// =============================================================================

/// Delay between hardware initialization attempts (1 second).
pub const DEFAULT_INIT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Settling margin applied to the shutter time before a grab is trusted.
///
/// A grab is only taken once `SETTLING_FACTOR × shutter_us` microseconds
/// have passed since the last exposure-affecting write.
pub const SETTLING_FACTOR: f64 = 4.0;

// =============================================================================
// Size Limits
// =============================================================================

/// Maximum accepted image payload in bytes (256 MiB).
pub const MAX_IMAGE_BYTES: usize = 256 * 1024 * 1024;
/// Maximum supported width/height of an image.
pub const MAX_IMAGE_DIMENSION: u32 = 65_536;
/// Maximum accepted string payload in bytes (1 MiB).
pub const MAX_STRING_BYTES: usize = 1024 * 1024;
/// Maximum number of entries in a configuration list.
pub const MAX_CONFIG_ENTRIES: usize = 65_536;

/// Validate image geometry and return the pixel buffer length.
pub fn validate_image_size(height: u32, width: u32, stride: u32) -> DhmResult<usize> {
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(DhmError::Protocol(format!(
            "image {}x{} exceeds max dimension {}",
            width, height, MAX_IMAGE_DIMENSION
        )));
    }
    if stride < width {
        return Err(DhmError::Protocol(format!(
            "image stride {} smaller than width {}",
            stride, width
        )));
    }

    let bytes = (stride as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| DhmError::Protocol("image byte size overflows".to_string()))?;

    if bytes > MAX_IMAGE_BYTES {
        return Err(DhmError::Protocol(format!(
            "image of {} bytes exceeds limit of {}",
            bytes, MAX_IMAGE_BYTES
        )));
    }

    Ok(bytes)
}

// =============================================================================
// Bounds
// =============================================================================

/// Inclusive range reported by the instrument for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    /// Smallest accepted value.
    pub min: T,
    /// Largest accepted value.
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    /// Range from `min` to `max`, both included.
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Range-check `value`, returning the matching underflow/overflow code.
    ///
    /// Values that do not compare (NaN) count as underflow.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn check(&self, value: T, underflow: ResultCode, overflow: ResultCode) -> DhmResult<T> {
        if !(value >= self.min) {
            return Err(DhmError::OutOfRange(underflow));
        }
        if value > self.max {
            return Err(DhmError::OutOfRange(overflow));
        }
        Ok(value)
    }

    /// Clamp `value` into the range.
    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}
