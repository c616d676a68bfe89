//! Operational modes for the simulated microscope.
//!
//! - **Instant**: Zero delays, deterministic behavior for unit tests
//! - **Realistic**: Hardware-like timing for manual runs and integration tests
//! - **Chaos**: Realistic timing plus random initialization failures

use serde::{Deserialize, Serialize};

/// Operational modes for the mock microscope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MockMode {
    /// Zero delays, deterministic - for unit tests
    #[default]
    Instant,
    /// Hardware-like timing
    Realistic,
    /// Random init failures - for exercising the retry loop
    Chaos,
}

impl MockMode {
    /// Whether operations should sleep for their simulated duration.
    pub fn simulates_timing(self) -> bool {
        !matches!(self, MockMode::Instant)
    }
}
