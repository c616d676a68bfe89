//! Background hardware initialization.
//!
//! The server accepts clients immediately; hardware comes up on its own
//! task, retrying until the camera runs. Sessions observe progress through
//! the readiness cell and gain stages as it advances.

use dhm_core::{DeviceReadiness, HardwareController};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Spawn the init loop. The task ends once readiness reaches `Running`.
pub fn spawn_initializer(
    hardware: Arc<dyn HardwareController>,
    retry_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempt: u32 = 0;
        while hardware.readiness() < DeviceReadiness::Running {
            attempt += 1;
            let result = hardware.initialize().await;
            let readiness = hardware.readiness();
            if readiness >= DeviceReadiness::Running {
                break;
            }
            match result {
                Ok(()) => warn!(
                    attempt,
                    readiness = %readiness,
                    "hardware not running after initialization, retrying in {:?}",
                    retry_delay
                ),
                Err(e) => warn!(
                    attempt,
                    readiness = %readiness,
                    error = %e,
                    "hardware initialization failed, retrying in {:?}",
                    retry_delay
                ),
            }
            tokio::time::sleep(retry_delay).await;
        }
        info!(attempts = attempt, "hardware running");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhm_driver_mock::MockDhm;

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_running() {
        let dhm = Arc::new(MockDhm::builder().init_failures(3).build());
        let handle = spawn_initializer(dhm.clone(), Duration::from_secs(1));

        handle.await.unwrap();
        assert_eq!(dhm.readiness(), DeviceReadiness::Running);
        assert_eq!(dhm.init_attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_failure_keeps_database_ready() {
        let dhm = Arc::new(MockDhm::builder().camera_failures(1).build());
        let cell = dhm.readiness_cell();
        let handle = spawn_initializer(dhm.clone(), Duration::from_secs(10));

        // First attempt brings up the database, then the camera fails
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cell.get(), DeviceReadiness::Initialized);

        handle.await.unwrap();
        assert_eq!(cell.get(), DeviceReadiness::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_start_waits_before_retrying() {
        let dhm = Arc::new(MockDhm::builder().camera_stalls(2).build());
        let started = tokio::time::Instant::now();
        let handle = spawn_initializer(dhm.clone(), Duration::from_secs(1));

        handle.await.unwrap();
        assert_eq!(dhm.readiness(), DeviceReadiness::Running);
        assert_eq!(dhm.init_attempts(), 3);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
