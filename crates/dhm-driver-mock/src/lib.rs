//! Simulated DHM for dhm-serv
//!
//! This crate provides a [`HardwareController`](dhm_core::HardwareController)
//! that stands in for the camera, laser, motorized stage and configuration
//! database of a digital holographic microscope. All delays use
//! `tokio::time::sleep`, so tests can run on a paused clock.
//!
//! # Behaviour
//!
//! - Two-step initialization: database (`Initialized`), then camera (`Running`)
//! - Configuration profiles 137, 138 and 142 by default, each with its own
//!   objective, wavelength and stage default
//! - Camera frames rendered from a synthetic off-axis hologram; intensity
//!   follows shutter, gain, brightness and laser state, so exposure
//!   optimization converges against it
//! - Injectable initialization and camera-start failures
//!
//! # Modes
//!
//! - `instant`: no delays (default, for tests)
//! - `realistic`: 250 ms init steps, 400 ms profile loads, 5 ms readout
//! - `chaos`: realistic timing plus random initialization failures
//!
//! ```rust,ignore
//! use dhm_driver_mock::MockDhm;
//! use dhm_core::Microscope;
//!
//! let scope = Microscope::new(Arc::new(MockDhm::builder().running().build()));
//! ```

pub mod common;
pub mod config;
mod mock_dhm;
mod pattern;

pub use common::{ErrorConfig, ErrorScenario, MockMode, MockRng, TimingConfig};
pub use config::{default_profiles, MockDhmConfig, MockProfile};
pub use mock_dhm::{
    shutter_to_us, us_to_shutter, MockDhm, MockDhmBuilder, BRIGHTNESS_LIMITS, CAMERA_NAME,
    CAMERA_SERIAL, DHM_SERIAL, GAIN_LIMITS, MOTOR_LIMITS, SENSOR_HEIGHT, SENSOR_WIDTH,
    SHUTTER_LIMITS,
};
pub use pattern::{hologram_pattern, FrameLayout};
