//! Grab-timing synchronizer.
//!
//! After a write that changes sensor exposure the camera keeps delivering
//! frames taken with the old settings for a while. [`GrabTimer`] keeps a
//! single process-wide deadline, `now + k × shutter_us`, recomputed on every
//! such write. A grab waits until the deadline has passed and then consumes
//! it, so exposure-then-grab sequences are deterministic without the client
//! knowing the settling formula.
//!
//! Uses `tokio::time::Instant` so tests can run on a paused clock.

use crate::limits::SETTLING_FACTOR;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Longest settling interval ever applied, whatever the shutter reports.
pub const MAX_SETTLING: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<Instant>,
    armed: u64,
}

/// Earliest instant at which a grab reflects the current settings.
#[derive(Debug)]
pub struct GrabTimer {
    settling_factor: f64,
    state: Mutex<TimerState>,
}

impl Default for GrabTimer {
    fn default() -> Self {
        Self::new(SETTLING_FACTOR)
    }
}

impl GrabTimer {
    /// Create a timer with a custom settling factor `k`.
    pub fn new(settling_factor: f64) -> Self {
        Self {
            settling_factor,
            state: Mutex::new(TimerState::default()),
        }
    }

    /// Factor `k` applied to the shutter time.
    pub fn settling_factor(&self) -> f64 {
        self.settling_factor
    }

    /// `k × shutter_us` as a duration, capped at [`MAX_SETTLING`].
    pub fn settling_interval(&self, shutter_us: f32) -> Duration {
        let micros = self.settling_factor * f64::from(shutter_us);
        if !micros.is_finite() || micros <= 0.0 {
            return Duration::ZERO;
        }
        let nanos = (micros * 1e3).round();
        if nanos >= MAX_SETTLING.as_nanos() as f64 {
            return MAX_SETTLING;
        }
        Duration::from_nanos(nanos as u64)
    }

    /// Recompute the deadline from the current shutter time.
    pub fn arm(&self, shutter_us: f32) -> Instant {
        let interval = self.settling_interval(shutter_us);
        let now = Instant::now();
        let deadline = now.checked_add(interval).unwrap_or(now);

        let mut state = self.state.lock();
        state.deadline = Some(deadline);
        state.armed += 1;
        trace!(shutter_us, interval_us = interval.as_micros() as u64, "grab timer armed");
        deadline
    }

    /// Number of times the deadline has been recomputed.
    pub fn arm_count(&self) -> u64 {
        self.state.lock().armed
    }

    /// Pending deadline, if the settings changed since the last grab.
    pub fn deadline(&self) -> Option<Instant> {
        self.state.lock().deadline
    }

    /// Time left before a grab may proceed.
    pub fn remaining(&self) -> Duration {
        match self.deadline() {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Sleep until the deadline, then consume it.
    ///
    /// Returns how long the caller was held back.
    pub async fn wait_ready(&self) -> Duration {
        let waited = self.remaining();
        if let Some(deadline) = self.deadline() {
            if !waited.is_zero() {
                tokio::time::sleep_until(deadline).await;
            }
        }
        self.state.lock().deadline = None;
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_scales_with_shutter() {
        let timer = GrabTimer::default();
        assert_eq!(timer.settling_interval(250.0), Duration::from_micros(1000));
        assert_eq!(timer.settling_interval(0.0), Duration::ZERO);
        assert_eq!(timer.settling_interval(-5.0), Duration::ZERO);
        assert_eq!(timer.settling_interval(f32::NAN), Duration::ZERO);
        assert_eq!(timer.settling_interval(f32::MAX), MAX_SETTLING);
    }

    #[test]
    fn custom_factor_is_applied() {
        let timer = GrabTimer::new(2.0);
        assert_eq!(timer.settling_interval(500.0), Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn grab_waits_for_full_settling_interval() {
        let timer = GrabTimer::default();
        let start = Instant::now();
        timer.arm(5_000.0);
        assert_eq!(timer.remaining(), Duration::from_millis(20));

        let waited = timer.wait_ready().await;
        assert_eq!(waited, Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn grab_after_interval_returns_immediately() {
        let timer = GrabTimer::default();
        timer.arm(1_000.0);
        tokio::time::advance(Duration::from_millis(5)).await;

        let before = Instant::now();
        assert_eq!(timer.wait_ready().await, Duration::ZERO);
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_consumes_deadline() {
        let timer = GrabTimer::default();
        timer.arm(1_000.0);
        timer.wait_ready().await;
        assert!(timer.deadline().is_none());
        assert_eq!(timer.remaining(), Duration::ZERO);
        assert_eq!(timer.arm_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_pushes_deadline_forward() {
        let timer = GrabTimer::default();
        timer.arm(1_000.0);
        tokio::time::advance(Duration::from_millis(3)).await;
        timer.arm(1_000.0);
        assert_eq!(timer.remaining(), Duration::from_millis(4));
        assert_eq!(timer.arm_count(), 2);
    }
}
