//! Server-side exposure optimization for `GetOptCameraImage`.
//!
//! Searches the integer shutter range for the longest exposure whose image
//! has at most `max_overflow` saturated pixels:
//!
//! 1. Coarse search: double the shutter while the image is fine, halve it
//!    while it saturates, then bisect once both sides are known.
//! 2. Fine pass: step the shutter up by one until saturation exceeds the
//!    limit again.
//!
//! The camera is left at the optimum. Every step goes through
//! [`Microscope::set_shutter`] and [`Microscope::grab`], so each grab honors
//! the settling interval of the step before it.

use crate::error::{DhmError, DhmResult};
use crate::microscope::Microscope;
use crate::types::ImageBuffer;
use tracing::{debug, info};

/// Grabs allowed before the search gives up.
pub const MAX_GRABS: u32 = 100;

/// Lowest shutter value the search starts from.
pub const MIN_START_SHUTTER: i32 = 10;

/// Outcome of [`optimize_exposure`].
#[derive(Debug, Clone)]
pub struct ExposureResult {
    /// Best image found; the camera is left at `shutter`.
    pub image: ImageBuffer,
    /// Shutter index the search settled on.
    pub shutter: i32,
    /// Total number of frames grabbed.
    pub grabs: u32,
}

/// Saturation level for a given bit depth.
pub fn max_pixel_value(bit_per_pixel: i32) -> u16 {
    let bits = bit_per_pixel.clamp(1, 16) as u32;
    ((1u32 << bits) - 1) as u16
}

struct Search<'a> {
    scope: &'a Microscope,
    max_pixel: u16,
    max_overflow: usize,
    grabs: u32,
}

impl Search<'_> {
    /// Set the shutter, grab and report whether the frame is acceptable.
    async fn probe(&mut self, shutter: i32) -> DhmResult<(bool, ImageBuffer)> {
        self.grabs += 1;
        if self.grabs > MAX_GRABS {
            return Err(DhmError::Hardware(anyhow::anyhow!(
                "exposure optimization did not converge after {} grabs",
                MAX_GRABS
            )));
        }
        self.scope.set_shutter(shutter).await?;
        let image = self.scope.grab().await?;
        let overflow = image.count_at_or_above(self.max_pixel);
        debug!(shutter, overflow, grabs = self.grabs, "exposure probe");
        Ok((overflow <= self.max_overflow, image))
    }
}

/// Find the longest shutter with at most `max_overflow` saturated pixels.
///
/// Negative `max_overflow` is treated as zero.
pub async fn optimize_exposure(scope: &Microscope, max_overflow: i32) -> DhmResult<ExposureResult> {
    let hardware = scope.hardware();
    let limits = hardware.shutter_limits().await?;
    let bpp = hardware.bit_per_pixel().await?;

    let mut search = Search {
        scope,
        max_pixel: max_pixel_value(bpp),
        max_overflow: usize::try_from(max_overflow).unwrap_or(0),
        grabs: 0,
    };

    let start = hardware.shutter().await?.max(MIN_START_SHUTTER);
    let mut shutter = limits.clamp(start);

    let mut smin: Option<i32> = None;
    let mut smax: Option<i32> = None;
    let mut best: Option<ImageBuffer> = None;

    loop {
        let (ok, image) = search.probe(shutter).await?;
        if ok {
            smin = Some(shutter);
            best = Some(image);
            if shutter >= limits.max {
                // Nothing saturates even at the longest exposure.
                smax = Some(shutter.saturating_add(1));
            } else {
                shutter = match smax {
                    None => limits.clamp(shutter.saturating_mul(2)),
                    Some(hi) => midpoint(shutter, hi),
                };
            }
        } else {
            smax = Some(shutter);
            if shutter <= limits.min {
                return Err(DhmError::Hardware(anyhow::anyhow!(
                    "image saturates at the minimum shutter {}",
                    limits.min
                )));
            }
            shutter = match smin {
                None => limits.clamp(shutter >> 1),
                Some(lo) => midpoint(lo, shutter),
            };
        }

        if let (Some(lo), Some(hi)) = (smin, smax) {
            if hi.saturating_sub(lo) <= 1 {
                break;
            }
        }
    }

    let (mut optimum, mut image) = match (smin, best) {
        (Some(s), Some(img)) => (s, img),
        _ => {
            return Err(DhmError::Hardware(anyhow::anyhow!(
                "exposure optimization found no acceptable image"
            )))
        }
    };

    // Fine pass
    while optimum < limits.max {
        let (ok, candidate) = search.probe(optimum + 1).await?;
        if !ok {
            break;
        }
        optimum += 1;
        image = candidate;
    }

    scope.set_shutter(optimum).await?;
    info!(shutter = optimum, grabs = search.grabs, "exposure optimized");

    Ok(ExposureResult {
        image,
        shutter: optimum,
        grabs: search.grabs,
    })
}

fn midpoint(lo: i32, hi: i32) -> i32 {
    lo + (hi - lo) / 2
}
