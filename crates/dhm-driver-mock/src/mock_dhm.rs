//! Simulated digital holographic microscope.

use crate::common::{ErrorConfig, ErrorScenario, MockMode, MockRng, TimingConfig};
use crate::config::{MockDhmConfig, MockProfile, CAMERA_PIXEL_SIZE_UM};
use crate::pattern::{hologram_pattern, render_frame, FrameLayout};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use dhm_core::{
    Bounds, CameraGeometry, CameraInfo, ConfigItem, DeviceReadiness, HardwareController,
    ImageBuffer, ObjectiveInfo, PositionUnit, ReadinessCell, NO_CONFIG,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Full sensor width in pixels.
pub const SENSOR_WIDTH: u32 = 1024;
/// Full sensor height in pixels.
pub const SENSOR_HEIGHT: u32 = 1024;

/// Serial reported for the instrument.
pub const DHM_SERIAL: &str = "DHM-SIM-1001";
/// Serial reported for the camera.
pub const CAMERA_SERIAL: &str = "CAM-SIM-22608117";
/// Camera model name.
pub const CAMERA_NAME: &str = "Simulated holography camera";

/// Shutter register range.
pub const SHUTTER_LIMITS: Bounds<i32> = Bounds { min: 1, max: 2000 };
/// Gain register range.
pub const GAIN_LIMITS: Bounds<i32> = Bounds { min: 0, max: 30 };
/// Black-level register range.
pub const BRIGHTNESS_LIMITS: Bounds<i32> = Bounds { min: 0, max: 255 };
/// Physical stage range in µm.
pub const MOTOR_LIMITS: Bounds<f32> = Bounds {
    min: 0.0,
    max: 5000.0,
};
/// Encoder steps per µm of stage travel.
pub const CODER_PER_UM: f32 = 40.0;

/// Exposure at which the hologram peak reaches full scale with gain 0.
const FULL_SCALE_SHUTTER_US: f32 = 2000.0;
/// Peak-to-peak sensor noise as a fraction of full scale.
const NOISE_AMPLITUDE: f32 = 0.004;
/// Black level at maximum brightness as a fraction of full scale.
const MAX_BLACK_LEVEL: f32 = 0.1;
const FRINGE_PERIOD_PX: f32 = 4.0;
const DEFAULT_SHUTTER: i32 = 50;
const DEFAULT_BIT_PER_PIXEL: i32 = 8;

/// Shutter register value to exposure time.
pub fn shutter_to_us(shutter: i32) -> f32 {
    shutter as f32 * 20.0 + 30.0
}

/// Exposure time to the nearest shutter register value.
pub fn us_to_shutter(shutter_us: f32) -> i32 {
    ((shutter_us - 30.0) / 20.0).round() as i32
}

#[derive(Debug)]
struct DeviceState {
    active: Option<usize>,
    laser_on: bool,
    bit_per_pixel: i32,
    shutter_us: f32,
    gain: i32,
    brightness: i32,
    motor_position_um: f32,
    load_count: u32,
    grab_count: u64,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            active: None,
            laser_on: false,
            bit_per_pixel: DEFAULT_BIT_PER_PIXEL,
            shutter_us: shutter_to_us(DEFAULT_SHUTTER),
            gain: 0,
            brightness: 0,
            motor_position_um: 0.0,
            load_count: 0,
            grab_count: 0,
        }
    }
}

/// Simulated microscope implementing [`HardwareController`].
///
/// - Two-step initialization (`Closed → Initialized → Running`) with
///   injectable failures for both steps
/// - Configuration profiles with stage defaults
/// - Camera frames rendered from a synthetic hologram whose brightness
///   follows shutter, gain, brightness and laser state
/// - Realistic/chaos modes add hardware-like delays and random failures
///
/// # Example
///
/// ```rust,ignore
/// let dhm = MockDhm::builder().running().active_config(137).seed(7).build();
/// let image = dhm.grab().await?;
/// ```
pub struct MockDhm {
    mode: MockMode,
    timing: TimingConfig,
    errors: ErrorConfig,
    readiness: ReadinessCell,
    profiles: Vec<MockProfile>,
    geometry: CameraGeometry,
    pattern: Arc<Vec<f32>>,
    rng: MockRng,
    state: Mutex<DeviceState>,
}

impl MockDhm {
    /// Default simulator: instant timing, closed hardware.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start a [`MockDhmBuilder`].
    pub fn builder() -> MockDhmBuilder {
        MockDhmBuilder::default()
    }

    /// Build from the `[mock]` configuration table.
    pub fn from_config(config: &MockDhmConfig) -> Self {
        MockDhmBuilder::from_config(config.clone()).build()
    }

    /// Shared readiness cell, readable without touching the device.
    pub fn readiness_cell(&self) -> ReadinessCell {
        self.readiness.clone()
    }

    /// Simulation mode in use.
    pub fn mode(&self) -> MockMode {
        self.mode
    }

    /// Initialization attempts so far, failed ones included.
    pub fn init_attempts(&self) -> u32 {
        self.errors.call_count("initialize")
    }

    /// Profile loads that actually changed the active profile.
    pub fn load_count(&self) -> u32 {
        self.state.lock().load_count
    }

    /// Frames rendered so far, warm-up frames included.
    pub fn grab_count(&self) -> u64 {
        self.state.lock().grab_count
    }

    /// Whether the profile's sources are on.
    pub fn laser_on(&self) -> bool {
        self.state.lock().laser_on
    }

    async fn delay(&self, duration: Duration) {
        if self.mode.simulates_timing() && !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    fn require_running(&self) -> Result<()> {
        if self.readiness.get() < DeviceReadiness::Running {
            bail!("camera is not running");
        }
        Ok(())
    }

    fn active_profile(&self) -> Result<MockProfile> {
        let state = self.state.lock();
        state
            .active
            .and_then(|idx| self.profiles.get(idx))
            .cloned()
            .ok_or_else(|| anyhow!("no configuration loaded"))
    }

    fn layout(&self, bit_per_pixel: i32) -> FrameLayout {
        FrameLayout::aligned(
            self.geometry.width as u32,
            self.geometry.height as u32,
            bit_per_pixel,
        )
    }

    fn render(&self) -> Result<ImageBuffer> {
        let (layout, scale, offset) = {
            let mut state = self.state.lock();
            state.grab_count += 1;
            let illumination = if state.laser_on { 1.0 } else { 0.0 };
            let scale = illumination * (state.shutter_us / FULL_SCALE_SHUTTER_US)
                * (1.0 + state.gain as f32 / 10.0);
            let offset = MAX_BLACK_LEVEL * state.brightness as f32
                / BRIGHTNESS_LIMITS.max as f32;
            (self.layout(state.bit_per_pixel), scale, offset)
        };

        let mut noise = vec![0.0f32; self.pattern.len()];
        self.rng.fill_noise(NOISE_AMPLITUDE / 2.0, &mut noise);
        let data = render_frame(&self.pattern, &noise, layout, scale, offset);
        Ok(ImageBuffer::new(layout.height, layout.width, layout.stride, data)?)
    }
}

impl Default for MockDhm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockDhm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDhm")
            .field("mode", &self.mode)
            .field("readiness", &self.readiness.get())
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[async_trait]
impl HardwareController for MockDhm {
    fn readiness(&self) -> DeviceReadiness {
        self.readiness.get()
    }

    async fn initialize(&self) -> Result<()> {
        if self.readiness.get() == DeviceReadiness::Running {
            return Ok(());
        }
        self.errors.check_operation("initialize")?;

        if self.readiness.get() == DeviceReadiness::Closed {
            self.delay(self.timing.init_step()).await;
            self.readiness.advance(DeviceReadiness::Initialized);
            info!("configuration database ready");
        }

        if let Err(e) = self.errors.check_operation("camera_start") {
            warn!(error = %e, "camera start failed");
            return Err(e);
        }
        if self.errors.check_operation("camera_stall").is_err() {
            warn!("camera did not start streaming");
            return Ok(());
        }
        self.delay(self.timing.init_step()).await;

        // Warm-up frame, discarded
        self.render()?;
        self.readiness.advance(DeviceReadiness::Running);
        info!("camera acquisition running");
        Ok(())
    }

    async fn config_list(&self) -> Result<Vec<ConfigItem>> {
        Ok(self
            .profiles
            .iter()
            .map(|p| ConfigItem::new(p.id, p.name.clone()))
            .collect())
    }

    async fn active_config(&self) -> Result<i32> {
        let state = self.state.lock();
        Ok(state
            .active
            .and_then(|idx| self.profiles.get(idx))
            .map_or(NO_CONFIG, |p| p.id))
    }

    async fn load_config(&self, id: i32) -> Result<bool> {
        if self.readiness.get() < DeviceReadiness::Initialized {
            bail!("configuration database not available");
        }
        let Some(idx) = self.profiles.iter().position(|p| p.id == id) else {
            debug!(config = id, "ignoring unknown configuration");
            return Ok(false);
        };
        if self.state.lock().active == Some(idx) {
            return Ok(false);
        }

        self.delay(self.timing.config_load()).await;
        let mut state = self.state.lock();
        state.active = Some(idx);
        state.motor_position_um = self.profiles[idx].motor_position_um;
        state.laser_on = false;
        state.load_count += 1;
        Ok(true)
    }

    async fn dhm_serial(&self) -> Result<String> {
        Ok(DHM_SERIAL.to_string())
    }

    async fn objective(&self) -> Result<ObjectiveInfo> {
        Ok(self.active_profile()?.objective)
    }

    async fn laser_wavelength(&self) -> Result<f64> {
        Ok(self.active_profile()?.wavelength_m)
    }

    async fn set_laser_output(&self, on: bool) -> Result<()> {
        self.errors.check_operation("set_laser_output")?;
        self.state.lock().laser_on = on;
        debug!(on, "laser output");
        Ok(())
    }

    async fn camera_info(&self) -> Result<CameraInfo> {
        Ok(CameraInfo {
            serial: CAMERA_SERIAL.to_string(),
            name: CAMERA_NAME.to_string(),
            max_width: SENSOR_WIDTH as i32,
            max_height: SENSOR_HEIGHT as i32,
            pixel_size_um: CAMERA_PIXEL_SIZE_UM,
        })
    }

    async fn camera_geometry(&self) -> Result<CameraGeometry> {
        let bpp = self.state.lock().bit_per_pixel;
        Ok(CameraGeometry {
            stride: self.layout(bpp).stride as i32,
            ..self.geometry
        })
    }

    async fn bit_per_pixel(&self) -> Result<i32> {
        Ok(self.state.lock().bit_per_pixel)
    }

    async fn set_bit_per_pixel(&self, bpp: i32) -> Result<()> {
        if bpp > 16 {
            bail!("camera supports at most 16 bits per pixel, not {}", bpp);
        }
        self.state.lock().bit_per_pixel = bpp;
        Ok(())
    }

    async fn shutter_limits(&self) -> Result<Bounds<i32>> {
        Ok(SHUTTER_LIMITS)
    }

    async fn shutter(&self) -> Result<i32> {
        Ok(us_to_shutter(self.state.lock().shutter_us))
    }

    async fn set_shutter(&self, shutter: i32) -> Result<()> {
        self.state.lock().shutter_us = shutter_to_us(shutter);
        Ok(())
    }

    async fn shutter_us_limits(&self) -> Result<Bounds<f32>> {
        Ok(Bounds::new(
            shutter_to_us(SHUTTER_LIMITS.min),
            shutter_to_us(SHUTTER_LIMITS.max),
        ))
    }

    async fn shutter_us(&self) -> Result<f32> {
        Ok(self.state.lock().shutter_us)
    }

    async fn set_shutter_us(&self, shutter_us: f32) -> Result<()> {
        self.state.lock().shutter_us = shutter_us;
        Ok(())
    }

    async fn gain_limits(&self) -> Result<Bounds<i32>> {
        Ok(GAIN_LIMITS)
    }

    async fn gain(&self) -> Result<i32> {
        Ok(self.state.lock().gain)
    }

    async fn set_gain(&self, gain: i32) -> Result<()> {
        self.state.lock().gain = gain;
        Ok(())
    }

    async fn brightness_limits(&self) -> Result<Bounds<i32>> {
        Ok(BRIGHTNESS_LIMITS)
    }

    async fn brightness(&self) -> Result<i32> {
        Ok(self.state.lock().brightness)
    }

    async fn set_brightness(&self, brightness: i32) -> Result<()> {
        self.state.lock().brightness = brightness;
        Ok(())
    }

    async fn grab(&self) -> Result<ImageBuffer> {
        self.require_running()?;
        self.errors.check_operation("grab")?;
        self.delay(self.timing.frame_readout()).await;
        self.render()
    }

    async fn motor_coder_limits(&self) -> Result<Bounds<i32>> {
        Ok(Bounds::new(
            (MOTOR_LIMITS.min * CODER_PER_UM).round() as i32,
            (MOTOR_LIMITS.max * CODER_PER_UM).round() as i32,
        ))
    }

    async fn motor_coder_position(&self) -> Result<i32> {
        Ok((self.state.lock().motor_position_um * CODER_PER_UM).round() as i32)
    }

    async fn motor_limits(&self) -> Result<Bounds<f32>> {
        Ok(MOTOR_LIMITS)
    }

    async fn motor_position(&self) -> Result<f32> {
        Ok(self.state.lock().motor_position_um)
    }

    async fn set_motor_position(&self, position: f32) -> Result<()> {
        self.errors.check_operation("set_motor_position")?;
        self.delay(self.timing.settling_time()).await;
        self.state.lock().motor_position_um = position;
        Ok(())
    }

    async fn motor_unit(&self) -> Result<PositionUnit> {
        Ok(PositionUnit::Micrometer)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`MockDhm`].
#[derive(Debug, Clone, Default)]
pub struct MockDhmBuilder {
    config: MockDhmConfig,
    errors: Option<ErrorConfig>,
    camera_failures: u32,
    camera_stalls: u32,
    readiness: Option<DeviceReadiness>,
    active: Option<i32>,
}

impl MockDhmBuilder {
    /// Builder seeded from a `[mock]` table.
    pub fn from_config(config: MockDhmConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Simulation mode.
    pub fn mode(mut self, mode: MockMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Fix the noise seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Fail the first `n` initialization attempts before the database step.
    pub fn init_failures(mut self, n: u32) -> Self {
        self.config.init_failures = n;
        self
    }

    /// Fail the first `n` camera starts, leaving readiness at `Initialized`.
    pub fn camera_failures(mut self, n: u32) -> Self {
        self.camera_failures = n;
        self
    }

    /// Report success on the first `n` camera starts without reaching `Running`.
    pub fn camera_stalls(mut self, n: u32) -> Self {
        self.camera_stalls = n;
        self
    }

    /// Camera ROI, clamped to the sensor.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Replace the injected error configuration entirely.
    pub fn errors(mut self, errors: ErrorConfig) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Start already initialized (database available, camera stopped).
    pub fn initialized(mut self) -> Self {
        self.readiness = Some(DeviceReadiness::Initialized);
        self
    }

    /// Start with the camera running.
    pub fn running(mut self) -> Self {
        self.readiness = Some(DeviceReadiness::Running);
        self
    }

    /// Start with profile `id` loaded and its sources on.
    pub fn active_config(mut self, id: i32) -> Self {
        self.active = Some(id);
        self
    }

    /// Finish the simulator.
    pub fn build(self) -> MockDhm {
        let config = self.config;
        let width = config.width.clamp(1, SENSOR_WIDTH);
        let height = config.height.clamp(1, SENSOR_HEIGHT);

        let timing = if config.mode.simulates_timing() {
            TimingConfig::dhm()
        } else {
            TimingConfig::default()
        };

        let mut errors = self.errors.unwrap_or_else(|| match config.mode {
            MockMode::Chaos => ErrorConfig::random_failures_of("initialize", 0.5, config.seed),
            _ => ErrorConfig::none(),
        });
        if config.init_failures > 0 {
            errors = errors.with_scenario(ErrorScenario::FailFirstN {
                operation: "initialize",
                count: config.init_failures,
            });
        }
        if self.camera_failures > 0 {
            errors = errors.with_scenario(ErrorScenario::FailFirstN {
                operation: "camera_start",
                count: self.camera_failures,
            });
        }
        if self.camera_stalls > 0 {
            errors = errors.with_scenario(ErrorScenario::FailFirstN {
                operation: "camera_stall",
                count: self.camera_stalls,
            });
        }

        let readiness = ReadinessCell::new();
        if let Some(r) = self.readiness {
            readiness.set(r);
        }

        let mut state = DeviceState::default();
        if let Some(id) = self.active {
            if let Some(idx) = config.profiles.iter().position(|p| p.id == id) {
                state.active = Some(idx);
                state.motor_position_um = config.profiles[idx].motor_position_um;
                state.laser_on = true;
            }
        }

        let geometry = CameraGeometry {
            width: width as i32,
            height: height as i32,
            offset_x: ((SENSOR_WIDTH - width) / 2) as i32,
            offset_y: ((SENSOR_HEIGHT - height) / 2) as i32,
            stride: FrameLayout::aligned(width, height, state.bit_per_pixel).stride as i32,
        };

        MockDhm {
            mode: config.mode,
            timing,
            errors,
            readiness,
            profiles: config.profiles,
            geometry,
            pattern: Arc::new(hologram_pattern(width, height, FRINGE_PERIOD_PX)),
            rng: MockRng::new(config.seed),
            state: Mutex::new(state),
        }
    }
}
