//! Hardware capability consumed by the protocol engine.
//!
//! The camera driver, the microscope/motor/laser SDK and the vendor
//! database are collapsed into a single [`HardwareController`] trait. The
//! server only ever talks to hardware through it, so the whole protocol
//! engine runs against `dhm-driver-mock` in tests.
//!
//! # Design Philosophy
//!
//! - Async (uses #[async_trait]) and thread-safe (Send + Sync)
//! - Uses anyhow::Result for errors; any `Err` is a hardware failure
//! - Limits are queried live on every setter; implementations must not
//!   expect callers to cache them
//! - Setters assume the caller already range-checked the value
//! - Implementations do not wait for settling; grab timing belongs to
//!   [`crate::Microscope`]
//!
//! # Example
//!
//! ```rust,ignore
//! async fn describe(hw: &dyn HardwareController) -> Result<String> {
//!     let objective = hw.objective().await?;
//!     let gain = hw.gain().await?;
//!     Ok(format!("{} at gain {}", objective.name, gain))
//! }
//! ```

use crate::limits::Bounds;
use crate::readiness::DeviceReadiness;
use crate::types::{CameraGeometry, CameraInfo, ConfigItem, ImageBuffer, ObjectiveInfo, PositionUnit};
use anyhow::Result;
use async_trait::async_trait;

/// Everything the protocol engine needs from the instrument.
#[async_trait]
pub trait HardwareController: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Current readiness. Must be cheap and non-blocking.
    fn readiness(&self) -> DeviceReadiness;

    /// Run one initialization attempt.
    ///
    /// Advances readiness as far as it gets; on `Err` the caller retries
    /// after a delay. Calling it once `Running` is a no-op.
    async fn initialize(&self) -> Result<()>;

    // =========================================================================
    // Configuration profiles
    // =========================================================================

    /// All known profiles, in display order.
    async fn config_list(&self) -> Result<Vec<ConfigItem>>;

    /// Id of the active profile, or [`crate::types::NO_CONFIG`].
    async fn active_config(&self) -> Result<i32>;

    /// Load profile `id`, resetting instrument parameters to its defaults.
    ///
    /// Unknown ids leave the state untouched and loading the active profile
    /// again does nothing. Returns whether a load actually happened.
    async fn load_config(&self, id: i32) -> Result<bool>;

    // =========================================================================
    // DHM, objective, laser
    // =========================================================================

    async fn dhm_serial(&self) -> Result<String>;

    async fn objective(&self) -> Result<ObjectiveInfo>;

    /// Wavelength of the first source of the active profile, in meters.
    async fn laser_wavelength(&self) -> Result<f64>;

    /// Switch the profile's sources on, or every source off.
    async fn set_laser_output(&self, on: bool) -> Result<()>;

    // =========================================================================
    // Camera
    // =========================================================================

    async fn camera_info(&self) -> Result<CameraInfo>;

    async fn camera_geometry(&self) -> Result<CameraGeometry>;

    async fn bit_per_pixel(&self) -> Result<i32>;

    async fn set_bit_per_pixel(&self, bpp: i32) -> Result<()>;

    /// Shutter in camera register units.
    async fn shutter_limits(&self) -> Result<Bounds<i32>>;
    async fn shutter(&self) -> Result<i32>;
    async fn set_shutter(&self, shutter: i32) -> Result<()>;

    /// Shutter in microseconds.
    async fn shutter_us_limits(&self) -> Result<Bounds<f32>>;
    async fn shutter_us(&self) -> Result<f32>;
    async fn set_shutter_us(&self, shutter_us: f32) -> Result<()>;

    async fn gain_limits(&self) -> Result<Bounds<i32>>;
    async fn gain(&self) -> Result<i32>;
    async fn set_gain(&self, gain: i32) -> Result<()>;

    async fn brightness_limits(&self) -> Result<Bounds<i32>>;
    async fn brightness(&self) -> Result<i32>;
    async fn set_brightness(&self, brightness: i32) -> Result<()>;

    /// Capture one frame immediately.
    async fn grab(&self) -> Result<ImageBuffer>;

    // =========================================================================
    // Motorized stage
    // =========================================================================

    async fn motor_coder_limits(&self) -> Result<Bounds<i32>>;
    async fn motor_coder_position(&self) -> Result<i32>;

    /// Physical position limits, in [`HardwareController::motor_unit`].
    async fn motor_limits(&self) -> Result<Bounds<f32>>;
    async fn motor_position(&self) -> Result<f32>;

    /// Move and wait until the stage reports the move finished.
    async fn set_motor_position(&self, position: f32) -> Result<()>;

    async fn motor_unit(&self) -> Result<PositionUnit>;
}
