//! Configuration of the simulated microscope.

use crate::common::MockMode;
use dhm_core::ObjectiveInfo;
use serde::{Deserialize, Serialize};

/// Settings for [`crate::MockDhm`], usually the `[mock]` table of the
/// server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockDhmConfig {
    /// Timing/failure behaviour (default: instant)
    #[serde(default)]
    pub mode: MockMode,

    /// Seed for sensor noise and chaos failures; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Number of initialization attempts that fail before one succeeds
    #[serde(default)]
    pub init_failures: u32,

    /// Camera ROI width in pixels (default: 512)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Camera ROI height in pixels (default: 512)
    #[serde(default = "default_height")]
    pub height: u32,

    /// Configuration profiles offered by the simulated database
    #[serde(default = "default_profiles")]
    pub profiles: Vec<MockProfile>,
}

/// One simulated configuration profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockProfile {
    /// Database id.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Objective mounted by this profile.
    pub objective: ObjectiveInfo,
    /// Wavelength of the first laser source in meters
    pub wavelength_m: f64,
    /// Stage position restored when the profile is loaded, in µm
    pub motor_position_um: f32,
}

fn default_width() -> u32 {
    512
}

fn default_height() -> u32 {
    512
}

/// Camera pixel pitch used to derive object-side pixel sizes.
pub const CAMERA_PIXEL_SIZE_UM: f32 = 3.45;

fn objective(name: &str, description: &str, magnification: f64, na: f64) -> ObjectiveInfo {
    let pixel = f64::from(CAMERA_PIXEL_SIZE_UM) / magnification;
    ObjectiveInfo {
        name: name.to_string(),
        description: description.to_string(),
        magnification,
        numerical_aperture: na,
        pixel_size_x_um: pixel,
        pixel_size_y_um: pixel,
    }
}

/// Three reflection profiles, ids 137, 138 and 142.
pub fn default_profiles() -> Vec<MockProfile> {
    vec![
        MockProfile {
            id: 137,
            name: "10x Reflection 682.5nm".to_string(),
            objective: objective("10x", "Plan Fluor 10x/0.30 reflection", 10.0, 0.30),
            wavelength_m: 682.5e-9,
            motor_position_um: 1250.0,
        },
        MockProfile {
            id: 138,
            name: "20x Reflection 682.5nm".to_string(),
            objective: objective("20x", "Plan Fluor 20x/0.40 reflection", 20.0, 0.40),
            wavelength_m: 682.5e-9,
            motor_position_um: 1180.0,
        },
        MockProfile {
            id: 142,
            name: "5x Transmission 794.5nm".to_string(),
            objective: objective("5x", "Plan Apo 5x/0.12 transmission", 5.0, 0.12),
            wavelength_m: 794.5e-9,
            motor_position_um: 2400.0,
        },
    ]
}

impl Default for MockDhmConfig {
    fn default() -> Self {
        Self {
            mode: MockMode::default(),
            seed: None,
            init_failures: 0,
            width: default_width(),
            height: default_height(),
            profiles: default_profiles(),
        }
    }
}

impl MockDhmConfig {
    /// Check the settings for consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("mock camera size must be non-zero".to_string());
        }
        if self.width > crate::mock_dhm::SENSOR_WIDTH || self.height > crate::mock_dhm::SENSOR_HEIGHT
        {
            return Err(format!(
                "mock camera size {}x{} exceeds sensor {}x{}",
                self.width,
                self.height,
                crate::mock_dhm::SENSOR_WIDTH,
                crate::mock_dhm::SENSOR_HEIGHT
            ));
        }
        let mut ids = std::collections::HashSet::new();
        for profile in &self.profiles {
            if profile.id < 0 {
                return Err(format!("profile id {} must not be negative", profile.id));
            }
            if !ids.insert(profile.id) {
                return Err(format!("duplicate profile id {}", profile.id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = MockDhmConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.profiles.len(), 3);
        assert!((config.profiles[0].objective.pixel_size_x_um - 0.345).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_profiles_rejected() {
        let mut config = MockDhmConfig::default();
        let copy = config.profiles[0].clone();
        config.profiles.push(copy);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_camera_rejected() {
        let config = MockDhmConfig {
            width: 4096,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
