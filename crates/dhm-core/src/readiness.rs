//! Hardware lifecycle state shared between the init task and sessions.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of the hardware subsystem.
///
/// Ordered: `Closed < Initialized < Running`. The wire encoding is the
/// discriminant as an int32.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum DeviceReadiness {
    /// Nothing is connected yet.
    #[default]
    Closed = 0,
    /// The profile database is available; profiles may be listed and chosen.
    Initialized = 1,
    /// Camera acquisition is running.
    Running = 2,
}

impl DeviceReadiness {
    /// Decode the stored discriminant.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DeviceReadiness::Closed),
            1 => Some(DeviceReadiness::Initialized),
            2 => Some(DeviceReadiness::Running),
            _ => None,
        }
    }

    /// Wire value.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for DeviceReadiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeviceReadiness::Closed => "closed",
            DeviceReadiness::Initialized => "initialized",
            DeviceReadiness::Running => "running",
        };
        write!(f, "{}", label)
    }
}

/// Atomically readable readiness cell.
///
/// Cloning shares the same cell. Writers are the hardware controller only;
/// sessions read it on every command and never block on it.
#[derive(Debug, Clone, Default)]
pub struct ReadinessCell {
    inner: Arc<AtomicU8>,
}

impl ReadinessCell {
    /// A fresh cell reading `Closed`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current readiness.
    pub fn get(&self) -> DeviceReadiness {
        DeviceReadiness::from_u8(self.inner.load(Ordering::Acquire))
            .unwrap_or(DeviceReadiness::Closed)
    }

    /// Overwrite the readiness, backwards included.
    pub fn set(&self, readiness: DeviceReadiness) {
        self.inner.store(readiness as u8, Ordering::Release);
    }

    /// Move forward to `readiness`; never moves backwards.
    pub fn advance(&self, readiness: DeviceReadiness) {
        self.inner.fetch_max(readiness as u8, Ordering::AcqRel);
    }
}
