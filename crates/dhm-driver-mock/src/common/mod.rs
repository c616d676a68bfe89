//! Shared simulation infrastructure: operating modes, timing, seeded
//! randomness and error injection.

mod errors;
mod mode;
mod rng;
mod timing;

pub use errors::{ErrorConfig, ErrorScenario};
pub use mode::MockMode;
pub use rng::MockRng;
pub use timing::TimingConfig;
