//! Readiness-based command gating.
//!
//! Commands are split into three stages. A session may run a command only
//! when the stage is reachable in the current hardware state:
//!
//! | Privilege | Condition                                      | Stages            |
//! |-----------|------------------------------------------------|-------------------|
//! | `Base`    | always                                         | Base              |
//! | `Init`    | readiness >= `Initialized`                     | Base, Init        |
//! | `Full`    | readiness >= `Initialized` and a profile active | Base, Init, Full |
//!
//! A command whose stage is out of reach is reported to the client exactly
//! like an id that does not exist.

use dhm_core::{DeviceReadiness, DhmResult, Microscope};
use dhm_proto::Stage;

/// Highest stage reachable in a given hardware state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Privilege {
    /// Hardware not initialized.
    Base,
    /// Hardware initialized, no profile active.
    Init,
    /// Hardware initialized with an active profile.
    Full,
}

impl Privilege {
    /// Privilege granted by `readiness` and whether a profile is active.
    pub fn from_state(readiness: DeviceReadiness, has_config: bool) -> Self {
        if readiness < DeviceReadiness::Initialized {
            Privilege::Base
        } else if has_config {
            Privilege::Full
        } else {
            Privilege::Init
        }
    }

    /// Whether commands of `stage` may run under this privilege.
    pub fn allows(self, stage: Stage) -> bool {
        match stage {
            Stage::Base => true,
            Stage::Init => self >= Privilege::Init,
            Stage::Full => self == Privilege::Full,
        }
    }
}

/// Whether `stage` is reachable right now.
///
/// Only asks the hardware what the stage needs: base commands touch
/// nothing, init commands read the readiness cell, and only full commands
/// query the active profile.
pub async fn authorize(scope: &Microscope, stage: Stage) -> DhmResult<bool> {
    if stage == Stage::Base {
        return Ok(true);
    }
    let readiness = scope.readiness();
    let has_config = stage == Stage::Full
        && readiness >= DeviceReadiness::Initialized
        && scope.has_active_config().await?;
    Ok(Privilege::from_state(readiness, has_config).allows(stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhm_driver_mock::MockDhm;
    use std::sync::Arc;

    #[test]
    fn test_privilege_from_state() {
        assert_eq!(
            Privilege::from_state(DeviceReadiness::Closed, false),
            Privilege::Base
        );
        // A profile without initialized hardware grants nothing extra
        assert_eq!(
            Privilege::from_state(DeviceReadiness::Closed, true),
            Privilege::Base
        );
        assert_eq!(
            Privilege::from_state(DeviceReadiness::Initialized, false),
            Privilege::Init
        );
        assert_eq!(
            Privilege::from_state(DeviceReadiness::Initialized, true),
            Privilege::Full
        );
        assert_eq!(
            Privilege::from_state(DeviceReadiness::Running, true),
            Privilege::Full
        );
    }

    #[test]
    fn test_stages_are_cumulative() {
        assert!(Privilege::Base.allows(Stage::Base));
        assert!(!Privilege::Base.allows(Stage::Init));
        assert!(!Privilege::Base.allows(Stage::Full));

        assert!(Privilege::Init.allows(Stage::Base));
        assert!(Privilege::Init.allows(Stage::Init));
        assert!(!Privilege::Init.allows(Stage::Full));

        assert!(Privilege::Full.allows(Stage::Base));
        assert!(Privilege::Full.allows(Stage::Init));
        assert!(Privilege::Full.allows(Stage::Full));
    }

    #[tokio::test]
    async fn test_authorize_follows_hardware_state() {
        let closed = Microscope::new(Arc::new(MockDhm::new()));
        assert!(authorize(&closed, Stage::Base).await.unwrap());
        assert!(!authorize(&closed, Stage::Init).await.unwrap());
        assert!(!authorize(&closed, Stage::Full).await.unwrap());

        let initialized = Microscope::new(Arc::new(MockDhm::builder().initialized().build()));
        assert!(authorize(&initialized, Stage::Init).await.unwrap());
        assert!(!authorize(&initialized, Stage::Full).await.unwrap());

        let ready = Microscope::new(Arc::new(
            MockDhm::builder().running().active_config(137).build(),
        ));
        assert!(authorize(&ready, Stage::Init).await.unwrap());
        assert!(authorize(&ready, Stage::Full).await.unwrap());
    }

    #[tokio::test]
    async fn test_profile_without_initialized_hardware_stays_base() {
        let scope = Microscope::new(Arc::new(MockDhm::builder().active_config(137).build()));
        assert!(scope.has_active_config().await.unwrap());
        assert!(!authorize(&scope, Stage::Init).await.unwrap());
        assert!(!authorize(&scope, Stage::Full).await.unwrap());
    }
}
