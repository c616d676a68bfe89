//! Synthetic off-axis hologram for simulated camera frames.

use std::f32::consts::PI;

/// Fringe contrast of the simulated interference.
const VISIBILITY: f32 = 0.8;

/// Peak phase shift of the simulated specimen in radians.
const SPECIMEN_PHASE: f32 = 2.5;

/// Generates a normalized off-axis hologram.
///
/// The pattern is a Gaussian illumination envelope modulated by tilted
/// interference fringes; a round phase object in the center bends the
/// fringes the way a cell on the sample would.
///
/// # Arguments
/// * `width` - Frame width in pixels
/// * `height` - Frame height in pixels
/// * `fringe_period` - Fringe spacing in pixels
///
/// # Returns
/// Row-major intensities in `[0.0, 1.0]`, peaking at 1.0 near the center
pub fn hologram_pattern(width: u32, height: u32, fringe_period: f32) -> Vec<f32> {
    let w = width as usize;
    let h = height as usize;
    let mut pattern = vec![0.0f32; w * h];
    if w == 0 || h == 0 {
        return pattern;
    }

    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;
    let beam_sigma = (w.min(h) as f32 / 2.5).max(1.0);
    let specimen_sigma = (w.min(h) as f32 / 10.0).max(1.0);

    // Fringes tilted 45 degrees
    let k = 2.0 * PI / fringe_period.max(2.0) / std::f32::consts::SQRT_2;
    let norm = 2.0 / (1.0 + VISIBILITY);

    for y in 0..h {
        let dy = y as f32 - cy;
        for x in 0..w {
            let dx = x as f32 - cx;
            let r2 = dx * dx + dy * dy;
            let envelope = (-r2 / (2.0 * beam_sigma * beam_sigma)).exp();
            let phase = SPECIMEN_PHASE * (-r2 / (2.0 * specimen_sigma * specimen_sigma)).exp();
            let fringe = 0.5 * (1.0 + VISIBILITY * (k * (x as f32 + y as f32) + phase).cos());
            pattern[y * w + x] = (envelope * fringe * norm).min(1.0);
        }
    }

    pattern
}

/// Row layout of a rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Pixels per row.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Bytes per row
    pub stride: u32,
    /// Significant bits per pixel.
    pub bit_per_pixel: i32,
}

impl FrameLayout {
    /// 2 for depths above 8 bits, otherwise 1.
    pub fn bytes_per_pixel(bit_per_pixel: i32) -> u32 {
        if bit_per_pixel > 8 {
            2
        } else {
            1
        }
    }

    /// Layout with rows padded to a multiple of 4 bytes.
    ///
    /// Rows narrower than 4 pixels stay unpadded so that `stride / width`
    /// still tells the pixel size.
    pub fn aligned(width: u32, height: u32, bit_per_pixel: i32) -> Self {
        let row = width * Self::bytes_per_pixel(bit_per_pixel);
        let stride = if width < 4 { row } else { row.div_ceil(4) * 4 };
        Self {
            width,
            height,
            stride,
            bit_per_pixel,
        }
    }
}

/// Quantize normalized intensities into a padded pixel buffer.
///
/// Each pixel is `(pattern × scale + offset + noise)` of full scale and
/// saturates at `2^bpp - 1`. Pixels above 8 bits are little-endian u16.
pub fn render_frame(
    pattern: &[f32],
    noise: &[f32],
    layout: FrameLayout,
    scale: f32,
    offset: f32,
) -> Vec<u8> {
    let bits = layout.bit_per_pixel.clamp(1, 16) as u32;
    let max_pixel = ((1u32 << bits) - 1) as f32;
    let bytes_per_pixel = FrameLayout::bytes_per_pixel(layout.bit_per_pixel) as usize;
    let w = layout.width as usize;
    let height = layout.height as usize;
    let stride = layout.stride as usize;

    let mut data = vec![0u8; stride * height];
    if stride == 0 {
        return data;
    }
    for (y, row) in data.chunks_exact_mut(stride).enumerate() {
        for x in 0..w {
            let idx = y * w + x;
            let base = pattern.get(idx).copied().unwrap_or(0.0);
            let n = noise.get(idx).copied().unwrap_or(0.0);
            let value = ((base * scale + offset + n) * max_pixel)
                .round()
                .clamp(0.0, max_pixel) as u16;
            let at = x * bytes_per_pixel;
            if bytes_per_pixel == 2 {
                row[at..at + 2].copy_from_slice(&value.to_le_bytes());
            } else {
                row[at] = value as u8;
            }
        }
    }
    data
}
