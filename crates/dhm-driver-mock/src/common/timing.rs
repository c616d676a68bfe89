//! Timing configuration for realistic mode.

use std::time::Duration;

/// Simulated durations of slow microscope operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Each initialization step (database login, camera start) in milliseconds
    pub init_step_ms: u64,
    /// Loading a configuration profile in milliseconds
    pub config_load_ms: u64,
    /// Frame readout time in milliseconds
    pub frame_readout_ms: u64,
    /// Stage settling time after a move in milliseconds
    pub settling_time_ms: u64,
}

impl TimingConfig {
    /// Timing roughly matching a lab DHM with a 200 fps camera.
    pub fn dhm() -> Self {
        Self {
            init_step_ms: 250,
            config_load_ms: 400,
            frame_readout_ms: 5,
            settling_time_ms: 50,
        }
    }

    /// Duration of each of the two init steps.
    pub fn init_step(&self) -> Duration {
        Duration::from_millis(self.init_step_ms)
    }

    /// Duration of a profile load.
    pub fn config_load(&self) -> Duration {
        Duration::from_millis(self.config_load_ms)
    }

    /// Duration of one frame readout.
    pub fn frame_readout(&self) -> Duration {
        Duration::from_millis(self.frame_readout_ms)
    }

    /// Duration of a stage move.
    pub fn settling_time(&self) -> Duration {
        Duration::from_millis(self.settling_time_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            init_step_ms: 0,
            config_load_ms: 0,
            frame_readout_ms: 0,
            settling_time_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_instant() {
        let t = TimingConfig::default();
        assert_eq!(t.frame_readout(), Duration::ZERO);
        assert_eq!(t.settling_time(), Duration::ZERO);
    }

    #[test]
    fn test_dhm_preset() {
        let t = TimingConfig::dhm();
        assert_eq!(t.init_step(), Duration::from_millis(250));
        assert!(t.config_load() > t.frame_readout());
    }
}
