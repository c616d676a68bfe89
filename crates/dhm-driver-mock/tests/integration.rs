//! Integration tests for the simulated DHM behind a `Microscope`.
//!
//! These exercise the range checks, grab timing and exposure optimizer of
//! `dhm-core` against the mock, the same way the server drives real hardware.

use dhm_core::{
    optimize_exposure, DeviceReadiness, DhmError, HardwareController, Microscope, ResultCode,
};
use dhm_driver_mock::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn running_scope() -> (Arc<MockDhm>, Microscope) {
    let dhm = Arc::new(
        MockDhm::builder()
            .running()
            .active_config(137)
            .size(64, 64)
            .seed(42)
            .build(),
    );
    let scope = Microscope::new(dhm.clone());
    (dhm, scope)
}

fn range_code(result: Result<(), DhmError>) -> Option<ResultCode> {
    match result {
        Err(DhmError::OutOfRange(code)) => Some(code),
        _ => None,
    }
}

#[tokio::test]
async fn test_setters_report_per_parameter_codes() {
    let (_dhm, scope) = running_scope();

    assert_eq!(
        range_code(scope.set_shutter(SHUTTER_LIMITS.min - 1).await),
        Some(ResultCode::ShutterUnderflow)
    );
    assert_eq!(
        range_code(scope.set_shutter(SHUTTER_LIMITS.max + 1).await),
        Some(ResultCode::ShutterOverflow)
    );
    assert_eq!(
        range_code(scope.set_shutter_us(10.0).await),
        Some(ResultCode::ShutterUsUnderflow)
    );
    assert_eq!(
        range_code(scope.set_shutter_us(1.0e6).await),
        Some(ResultCode::ShutterUsOverflow)
    );
    assert_eq!(
        range_code(scope.set_gain(GAIN_LIMITS.min - 1).await),
        Some(ResultCode::GainUnderflow)
    );
    assert_eq!(
        range_code(scope.set_gain(GAIN_LIMITS.max + 1).await),
        Some(ResultCode::GainOverflow)
    );
    assert_eq!(
        range_code(scope.set_brightness(-1).await),
        Some(ResultCode::BrightnessUnderflow)
    );
    assert_eq!(
        range_code(scope.set_brightness(256).await),
        Some(ResultCode::BrightnessOverflow)
    );
    assert_eq!(
        range_code(scope.set_motor_position(-0.5).await),
        Some(ResultCode::PosUnderflow)
    );
    assert_eq!(
        range_code(scope.set_motor_position(5000.5).await),
        Some(ResultCode::PosOverflow)
    );
    assert_eq!(
        range_code(scope.set_bit_per_pixel(0).await),
        Some(ResultCode::BppUnderflow)
    );
}

#[tokio::test]
async fn test_rejected_values_leave_state_alone() {
    let (dhm, scope) = running_scope();
    scope.set_gain(12).await.unwrap();
    let arms = scope.timer().arm_count();

    assert!(scope.set_gain(31).await.is_err());
    assert_eq!(dhm.gain().await.unwrap(), 12);
    assert_eq!(scope.timer().arm_count(), arms);
}

#[tokio::test]
async fn test_limits_are_inclusive() {
    let (dhm, scope) = running_scope();
    scope.set_gain(GAIN_LIMITS.max).await.unwrap();
    scope.set_brightness(BRIGHTNESS_LIMITS.min).await.unwrap();
    scope.set_motor_position(MOTOR_LIMITS.max).await.unwrap();
    assert_eq!(dhm.gain().await.unwrap(), GAIN_LIMITS.max);
    assert_eq!(dhm.motor_position().await.unwrap(), MOTOR_LIMITS.max);
}

#[tokio::test]
async fn test_exposure_writes_arm_timer() {
    let (_dhm, scope) = running_scope();
    assert_eq!(scope.timer().arm_count(), 0);

    scope.set_shutter(60).await.unwrap();
    scope.set_shutter_us(900.0).await.unwrap();
    scope.set_gain(3).await.unwrap();
    scope.set_brightness(10).await.unwrap();
    scope.set_motor_position(1000.0).await.unwrap();
    assert_eq!(scope.timer().arm_count(), 5);

    // Bit depth and laser off do not change exposure timing
    scope.set_bit_per_pixel(12).await.unwrap();
    scope.set_laser_output(false).await.unwrap();
    assert_eq!(scope.timer().arm_count(), 5);

    scope.set_laser_output(true).await.unwrap();
    assert_eq!(scope.timer().arm_count(), 6);
}

#[tokio::test]
async fn test_select_config_only_acts_on_change() {
    let dhm = Arc::new(MockDhm::builder().running().build());
    let scope = Microscope::new(dhm.clone());

    assert!(!scope.has_active_config().await.unwrap());
    assert!(scope.select_config(138).await.unwrap());
    assert!(dhm.laser_on());
    assert_eq!(scope.timer().arm_count(), 1);

    assert!(!scope.select_config(138).await.unwrap());
    assert!(!scope.select_config(9999).await.unwrap());
    assert_eq!(dhm.active_config().await.unwrap(), 138);
    assert_eq!(dhm.load_count(), 1);
    assert_eq!(scope.timer().arm_count(), 1);
}

#[tokio::test]
async fn test_select_config_before_camera_keeps_laser_off() {
    let dhm = Arc::new(MockDhm::builder().initialized().build());
    let scope = Microscope::new(dhm.clone());
    assert!(scope.select_config(142).await.unwrap());
    assert!(!dhm.laser_on());
    assert_eq!(scope.timer().arm_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_grab_waits_for_settling() {
    let (_dhm, scope) = running_scope();

    scope.set_shutter_us(1000.0).await.unwrap();
    let start = Instant::now();
    scope.grab().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(4));

    // Deadline is consumed by the first grab
    let start = Instant::now();
    scope.grab().await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn test_grab_waits_for_latest_write() {
    let (_dhm, scope) = running_scope();

    scope.set_shutter_us(250.0).await.unwrap();
    tokio::time::advance(Duration::from_micros(500)).await;
    scope.set_shutter_us(2000.0).await.unwrap();

    let start = Instant::now();
    scope.grab().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(8));
}

#[tokio::test(start_paused = true)]
async fn test_exposure_optimizer_finds_unsaturated_optimum() {
    let (dhm, scope) = running_scope();

    let result = optimize_exposure(&scope, 0).await.unwrap();
    assert!(result.grabs <= 100);
    assert_eq!(result.image.count_at_or_above(255), 0);
    assert_eq!(dhm.shutter().await.unwrap(), result.shutter);

    // Close to full scale: the brightest pixel is within a few percent
    let peak = result.image.pixels().max().unwrap_or(0);
    assert!(peak >= 240, "peak {} at shutter {}", peak, result.shutter);
}

#[tokio::test(start_paused = true)]
async fn test_exposure_optimizer_tolerates_overflow_budget() {
    let (_dhm, scope) = running_scope();
    let strict = optimize_exposure(&scope, 0).await.unwrap();
    let loose = optimize_exposure(&scope, 50).await.unwrap();
    assert!(loose.shutter >= strict.shutter);
    assert!(loose.image.count_at_or_above(255) <= 50);
}

#[tokio::test(start_paused = true)]
async fn test_exposure_optimizer_fails_when_minimum_shutter_saturates() {
    let dhm = Arc::new(
        MockDhm::builder()
            .running()
            .active_config(137)
            .size(32, 32)
            .seed(3)
            .build(),
    );
    let scope = Microscope::new(dhm.clone());
    // Written straight to the device, past the range check
    dhm.set_gain(10_000).await.unwrap();
    let err = optimize_exposure(&scope, 0).await.unwrap_err();
    assert!(matches!(err, DhmError::Hardware(_)));
    assert_eq!(err.code(), ResultCode::NoHardware);
}

#[tokio::test]
async fn test_initialization_retries_until_running() {
    let dhm = MockDhm::builder().init_failures(2).build();

    assert!(dhm.initialize().await.is_err());
    assert!(dhm.initialize().await.is_err());
    assert_eq!(dhm.readiness(), DeviceReadiness::Closed);
    dhm.initialize().await.unwrap();
    assert_eq!(dhm.readiness(), DeviceReadiness::Running);
    assert_eq!(dhm.init_attempts(), 3);
}

#[tokio::test]
async fn test_readiness_cell_is_shared() {
    let dhm = MockDhm::new();
    let cell = dhm.readiness_cell();
    assert_eq!(cell.get(), DeviceReadiness::Closed);
    dhm.initialize().await.unwrap();
    assert_eq!(cell.get(), DeviceReadiness::Running);
}

#[test]
fn test_from_config_honors_table() {
    let config = MockDhmConfig {
        width: 128,
        height: 96,
        seed: Some(1),
        ..Default::default()
    };
    let dhm = MockDhm::from_config(&config);
    assert_eq!(dhm.mode(), MockMode::Instant);
    assert_eq!(dhm.readiness(), DeviceReadiness::Closed);
}
