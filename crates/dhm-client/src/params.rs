//! Parameter snapshot returned by [`crate::DhmClient::parameters`].
//!
//! Field names serialize in camelCase so the JSON matches what existing
//! analysis scripts store next to their holograms.
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// Every readable parameter, grouped by subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub server: ServerParams,
    pub dhm: DhmParams,
    pub objective: ObjectiveParams,
    pub camera: CameraParams,
    pub laser: LaserParams,
    pub motor: MotorParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerParams {
    pub version: i32,
    pub command_version: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhmParams {
    pub serial: String,
    pub config_id: i32,
    /// Name of the active profile as listed by the server
    pub config_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveParams {
    pub name: String,
    pub description: String,
    pub magnification: f64,
    pub numerical_aperture: f64,
    #[serde(rename = "xPixelSizeUm")]
    pub pixel_size_x_um: f64,
    #[serde(rename = "yPixelSizeUm")]
    pub pixel_size_y_um: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraParams {
    pub serial: String,
    pub name: String,
    pub max_width: i32,
    pub max_height: i32,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "xOffset")]
    pub offset_x: i32,
    #[serde(rename = "yOffset")]
    pub offset_y: i32,
    pub bit_per_pixel: i32,
    pub stride: i32,
    pub pixel_size_um: f32,
    pub min_shutter: i32,
    pub max_shutter: i32,
    pub shutter: i32,
    pub min_shutter_us: f32,
    pub max_shutter_us: f32,
    pub shutter_us: f32,
    pub min_gain: i32,
    pub max_gain: i32,
    pub gain: i32,
    pub min_brightness: i32,
    pub max_brightness: i32,
    pub brightness: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaserParams {
    pub wavelength_um: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorParams {
    pub min_coder_pos: i32,
    pub max_coder_pos: i32,
    pub coder_pos: i32,
    pub min_pos: f32,
    pub max_pos: f32,
    pub pos: f32,
    pub unit_pos: String,
}
