//! Plain data carried between the hardware controller and the wire.

use crate::error::{DhmError, DhmResult};
use crate::limits::validate_image_size;
use serde::{Deserialize, Serialize};

/// A named instrument preset (objective, sources, stage defaults).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    /// Database id sent with `SetConfig`.
    pub id: i32,
    /// Display name.
    pub name: String,
}

impl ConfigItem {
    /// Profile entry with `id` and `name`.
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Id reported when no configuration profile is active.
pub const NO_CONFIG: i32 = -1;

/// Metadata of the objective selected by the active profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveInfo {
    /// Short objective name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Nominal magnification.
    pub magnification: f64,
    /// Numerical aperture.
    pub numerical_aperture: f64,
    /// Object-side pixel pitch along X in micrometers.
    pub pixel_size_x_um: f64,
    /// Object-side pixel pitch along Y in micrometers.
    pub pixel_size_y_um: f64,
}

/// Static identity of the camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Camera serial number.
    pub serial: String,
    /// Camera model name.
    pub name: String,
    /// Full sensor width in pixels.
    pub max_width: i32,
    /// Full sensor height in pixels.
    pub max_height: i32,
    /// Sensor pixel pitch in micrometers.
    pub pixel_size_um: f32,
}

/// Current region of interest and row layout of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraGeometry {
    /// ROI width in pixels.
    pub width: i32,
    /// ROI height in pixels.
    pub height: i32,
    /// ROI left edge on the sensor.
    pub offset_x: i32,
    /// ROI top edge on the sensor.
    pub offset_y: i32,
    /// Bytes per row, possibly padded past `width × bytes_per_pixel`.
    pub stride: i32,
}

/// Unit of the motorized stage's physical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionUnit {
    /// No unit reported.
    None,
    /// Linear stage, micrometers.
    Micrometer,
    /// Rotation stage, degrees.
    Degree,
    /// Raw encoder counts.
    Coder,
}

impl PositionUnit {
    /// Label sent on the wire for `UnitMotorPos`.
    pub fn label(self) -> &'static str {
        match self {
            PositionUnit::None => "",
            PositionUnit::Micrometer => "µm",
            PositionUnit::Degree => "degree",
            PositionUnit::Coder => "coder",
        }
    }

    /// Inverse of [`PositionUnit::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "" => Some(PositionUnit::None),
            "µm" => Some(PositionUnit::Micrometer),
            "degree" => Some(PositionUnit::Degree),
            "coder" => Some(PositionUnit::Coder),
            _ => None,
        }
    }
}

// =============================================================================
// ImageBuffer
// =============================================================================

/// One grabbed frame, rows padded to `stride` bytes.
///
/// Pixels are 8-bit, or 16-bit little-endian when the stride holds two
/// bytes per column.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    height: u32,
    width: u32,
    stride: u32,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Wrap a raw pixel buffer, checking that its length matches the geometry.
    pub fn new(height: u32, width: u32, stride: u32, data: Vec<u8>) -> DhmResult<Self> {
        let expected = validate_image_size(height, width, stride)?;
        if data.len() != expected {
            return Err(DhmError::Protocol(format!(
                "image buffer holds {} bytes, geometry {}x{} stride {} needs {}",
                data.len(),
                width,
                height,
                stride,
                expected
            )));
        }
        Ok(Self {
            height,
            width,
            stride,
            data,
        })
    }

    /// Rows in the frame.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixels per row.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Bytes per row, padding included.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Raw rows, `height × stride` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the raw rows.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// 2 when rows hold 16-bit pixels, otherwise 1.
    pub fn bytes_per_pixel(&self) -> usize {
        if self.width > 0 && self.stride / self.width == 2 {
            2
        } else {
            1
        }
    }

    /// Pixel value at `(row, col)`.
    pub fn pixel(&self, row: u32, col: u32) -> Option<u16> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let bpp = self.bytes_per_pixel();
        let offset = row as usize * self.stride as usize + col as usize * bpp;
        match bpp {
            2 => Some(u16::from_le_bytes([self.data[offset], self.data[offset + 1]])),
            _ => Some(u16::from(self.data[offset])),
        }
    }

    /// Iterate the visible pixels row by row, skipping stride padding.
    pub fn pixels(&self) -> impl Iterator<Item = u16> + '_ {
        let bpp = self.bytes_per_pixel();
        let visible = self.width as usize * bpp;
        let stride = (self.stride as usize).max(1);
        self.data.chunks(stride).flat_map(move |row| {
            row[..visible.min(row.len())]
                .chunks_exact(bpp)
                .map(move |px| match px {
                    [lo, hi] => u16::from_le_bytes([*lo, *hi]),
                    [v] => u16::from(*v),
                    _ => 0,
                })
        })
    }

    /// Number of pixels whose value is at least `threshold`.
    pub fn count_at_or_above(&self, threshold: u16) -> usize {
        self.pixels().filter(|&v| v >= threshold).count()
    }
}

impl std::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("height", &self.height)
            .field("width", &self.width)
            .field("stride", &self.stride)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer_length() {
        assert!(ImageBuffer::new(2, 2, 4, vec![0; 7]).is_err());
        assert!(ImageBuffer::new(2, 2, 4, vec![0; 8]).is_ok());
    }

    #[test]
    fn eight_bit_pixels_skip_padding() {
        // 2 rows, 3 visible pixels, stride 4 (one pad byte per row)
        let image = ImageBuffer::new(2, 3, 4, vec![1, 2, 3, 99, 4, 5, 6, 99]).unwrap();
        assert_eq!(image.bytes_per_pixel(), 1);
        assert_eq!(image.pixels().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(image.pixel(1, 2), Some(6));
        assert_eq!(image.pixel(2, 0), None);
    }

    #[test]
    fn sixteen_bit_pixels_are_little_endian() {
        let image = ImageBuffer::new(1, 2, 4, vec![0x34, 0x12, 0xff, 0x0f]).unwrap();
        assert_eq!(image.bytes_per_pixel(), 2);
        assert_eq!(image.pixel(0, 0), Some(0x1234));
        assert_eq!(image.pixel(0, 1), Some(0x0fff));
        assert_eq!(image.count_at_or_above(0x0fff), 1);
    }

    #[test]
    fn position_unit_labels_round_trip() {
        for unit in [
            PositionUnit::None,
            PositionUnit::Micrometer,
            PositionUnit::Degree,
            PositionUnit::Coder,
        ] {
            assert_eq!(PositionUnit::from_label(unit.label()), Some(unit));
        }
    }
}
