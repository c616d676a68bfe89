//! Range-checked, timing-aware view of a [`HardwareController`].
//!
//! [`Microscope`] is what the dispatcher calls. It adds the two things the
//! raw controller does not do:
//!
//! - live range checks on every setter, mapping violations to the
//!   per-parameter underflow/overflow codes
//! - arming the [`GrabTimer`] after every exposure-affecting write (shutter
//!   in either unit, gain, brightness, laser on, stage move) and honoring
//!   it before every grab

use crate::capabilities::HardwareController;
use crate::error::{DhmError, DhmResult, ResultCode};
use crate::grab_timing::GrabTimer;
use crate::readiness::DeviceReadiness;
use crate::types::{ImageBuffer, NO_CONFIG};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Hardware controller plus the process-wide grab deadline.
#[derive(Clone)]
pub struct Microscope {
    hardware: Arc<dyn HardwareController>,
    timer: Arc<GrabTimer>,
}

impl Microscope {
    /// Wrap `hardware` with the default settling factor.
    pub fn new(hardware: Arc<dyn HardwareController>) -> Self {
        Self::with_timer(hardware, GrabTimer::default())
    }

    /// Wrap `hardware` with a preconfigured grab timer.
    pub fn with_timer(hardware: Arc<dyn HardwareController>, timer: GrabTimer) -> Self {
        Self {
            hardware,
            timer: Arc::new(timer),
        }
    }

    /// Underlying controller, for reads that need no validation.
    pub fn hardware(&self) -> &Arc<dyn HardwareController> {
        &self.hardware
    }

    /// Shared grab deadline.
    pub fn timer(&self) -> &GrabTimer {
        &self.timer
    }

    /// Current hardware readiness.
    pub fn readiness(&self) -> DeviceReadiness {
        self.hardware.readiness()
    }

    /// Whether a configuration profile is active.
    pub async fn has_active_config(&self) -> DhmResult<bool> {
        Ok(self.hardware.active_config().await? != NO_CONFIG)
    }

    /// Recompute the grab deadline from the live shutter time.
    pub async fn arm_grab_timer(&self) -> DhmResult<()> {
        let shutter_us = self.hardware.shutter_us().await?;
        self.timer.arm(shutter_us);
        Ok(())
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Select profile `id`.
    ///
    /// Unknown ids and the already-active id are accepted without effect.
    /// A fresh load on running hardware switches the profile's sources on.
    pub async fn select_config(&self, id: i32) -> DhmResult<bool> {
        let loaded = self.hardware.load_config(id).await?;
        if !loaded {
            debug!(config = id, "configuration unchanged");
            return Ok(false);
        }
        info!(config = id, "configuration loaded");
        if self.readiness() == DeviceReadiness::Running {
            self.set_laser_output(true).await?;
        }
        Ok(true)
    }

    // =========================================================================
    // Exposure
    // =========================================================================

    /// Set the shutter index within the live limits; arms the grab timer.
    pub async fn set_shutter(&self, shutter: i32) -> DhmResult<()> {
        let limits = self.hardware.shutter_limits().await?;
        limits.check(shutter, ResultCode::ShutterUnderflow, ResultCode::ShutterOverflow)?;
        self.hardware.set_shutter(shutter).await?;
        self.arm_grab_timer().await
    }

    /// Set the shutter time in µs within the live limits; arms the grab timer.
    pub async fn set_shutter_us(&self, shutter_us: f32) -> DhmResult<()> {
        let limits = self.hardware.shutter_us_limits().await?;
        limits.check(
            shutter_us,
            ResultCode::ShutterUsUnderflow,
            ResultCode::ShutterUsOverflow,
        )?;
        self.hardware.set_shutter_us(shutter_us).await?;
        self.arm_grab_timer().await
    }

    /// Set the camera gain within the live limits; arms the grab timer.
    pub async fn set_gain(&self, gain: i32) -> DhmResult<()> {
        let limits = self.hardware.gain_limits().await?;
        limits.check(gain, ResultCode::GainUnderflow, ResultCode::GainOverflow)?;
        self.hardware.set_gain(gain).await?;
        self.arm_grab_timer().await
    }

    /// Set the camera brightness within the live limits; arms the grab timer.
    pub async fn set_brightness(&self, brightness: i32) -> DhmResult<()> {
        let limits = self.hardware.brightness_limits().await?;
        limits.check(
            brightness,
            ResultCode::BrightnessUnderflow,
            ResultCode::BrightnessOverflow,
        )?;
        self.hardware.set_brightness(brightness).await?;
        self.arm_grab_timer().await
    }

    /// Only a lower bound exists for the bit depth.
    pub async fn set_bit_per_pixel(&self, bpp: i32) -> DhmResult<()> {
        if bpp < 1 {
            return Err(DhmError::OutOfRange(ResultCode::BppUnderflow));
        }
        self.hardware.set_bit_per_pixel(bpp).await?;
        Ok(())
    }

    /// Switch the profile's sources; switching on arms the grab timer.
    pub async fn set_laser_output(&self, on: bool) -> DhmResult<()> {
        self.hardware.set_laser_output(on).await?;
        if on {
            self.arm_grab_timer().await?;
        }
        Ok(())
    }

    // =========================================================================
    // Stage
    // =========================================================================

    /// Move the stage within its travel range; arms the grab timer.
    pub async fn set_motor_position(&self, position: f32) -> DhmResult<()> {
        let limits = self.hardware.motor_limits().await?;
        limits.check(position, ResultCode::PosUnderflow, ResultCode::PosOverflow)?;
        self.hardware.set_motor_position(position).await?;
        self.arm_grab_timer().await
    }

    // =========================================================================
    // Grab
    // =========================================================================

    /// Wait out the settling interval, then capture.
    pub async fn grab(&self) -> DhmResult<ImageBuffer> {
        let waited = self.timer.wait_ready().await;
        if waited > Duration::ZERO {
            debug!(waited_us = waited.as_micros() as u64, "grab held for settling");
        }
        Ok(self.hardware.grab().await?)
    }
}

impl std::fmt::Debug for Microscope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Microscope")
            .field("readiness", &self.readiness())
            .field("timer", &self.timer)
            .finish()
    }
}
