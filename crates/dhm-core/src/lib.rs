//! `dhm-core`
//!
//! Core types and traits for the DHM remote-control server.
//!
//! ## Layers
//!
//! - **HardwareController**: the single capability through which the server
//!   reaches the camera, laser, stage and configuration database
//! - **Microscope**: range checks and grab timing layered on top of it
//! - **Protocol model**: readiness, result codes, payload types shared with
//!   `dhm-proto` and `dhm-client`
//!
//! ## Key Types
//!
//! - [`DeviceReadiness`] / [`ReadinessCell`]: lifecycle published by the
//!   hardware init task
//! - [`DhmError`] / [`ResultCode`]: errors and their wire codes
//! - [`GrabTimer`]: settling deadline after exposure-affecting writes
//! - [`ImageBuffer`]: one grabbed frame

pub mod capabilities;
pub mod error;
pub mod exposure;
pub mod grab_timing;
pub mod limits;
pub mod microscope;
pub mod readiness;
pub mod types;

pub use capabilities::HardwareController;
pub use error::{DhmError, DhmResult, FrameField, ResultCode};
pub use exposure::{optimize_exposure, ExposureResult};
pub use grab_timing::GrabTimer;
pub use limits::Bounds;
pub use microscope::Microscope;
pub use readiness::{DeviceReadiness, ReadinessCell};
pub use types::{
    CameraGeometry, CameraInfo, ConfigItem, ImageBuffer, ObjectiveInfo, PositionUnit, NO_CONFIG,
};

// Re-export commonly used types
pub use anyhow::{anyhow, Result};
