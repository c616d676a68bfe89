//! Error injection for the simulated microscope.
//!
//! Lets tests make initialization (or any named operation) fail in a
//! controlled way, e.g. to drive the server's init retry loop.

use super::rng::MockRng;
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Error injection configuration
#[derive(Clone, Debug)]
pub struct ErrorConfig {
    /// Per-operation failure rate (0.0 to 1.0)
    failure_rates: Arc<HashMap<&'static str, f64>>,
    scenarios: Arc<Vec<ErrorScenario>>,
    rng: Arc<MockRng>,
    /// Calls seen per operation
    counts: Arc<Mutex<HashMap<&'static str, u32>>>,
}

/// Deterministic failure pattern for one operation.
#[derive(Debug, Clone)]
pub enum ErrorScenario {
    /// Fail the first N calls, then succeed
    FailFirstN {
        /// Operation name checked by the simulator.
        operation: &'static str,
        /// Number of calls.
        count: u32,
    },
    /// Succeed N times, then fail every call
    FailAfterN {
        /// Operation name checked by the simulator.
        operation: &'static str,
        /// Number of calls.
        count: u32,
    },
    /// Every call fails with a fault code
    HardwareFault {
        /// Operation name checked by the simulator.
        operation: &'static str,
        /// Fault code in the error message.
        code: u32,
    },
}

impl ErrorConfig {
    /// No injected errors (default)
    pub fn none() -> Self {
        Self::build(HashMap::new(), Vec::new(), None)
    }

    /// Random failures of a single operation
    pub fn random_failures_of(operation: &'static str, rate: f64, seed: Option<u64>) -> Self {
        let mut rates = HashMap::new();
        rates.insert(operation, rate);
        Self::build(rates, Vec::new(), seed)
    }

    /// A single deterministic failure scenario.
    pub fn scenario(scenario: ErrorScenario) -> Self {
        Self::build(HashMap::new(), vec![scenario], None)
    }

    fn build(
        rates: HashMap<&'static str, f64>,
        scenarios: Vec<ErrorScenario>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            failure_rates: Arc::new(rates),
            scenarios: Arc::new(scenarios),
            rng: Arc::new(MockRng::new(seed)),
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a scenario to an existing configuration.
    pub fn with_scenario(mut self, scenario: ErrorScenario) -> Self {
        let mut scenarios = (*self.scenarios).clone();
        scenarios.push(scenario);
        self.scenarios = Arc::new(scenarios);
        self
    }

    /// Count one call of `operation` and decide whether it fails.
    pub fn check_operation(&self, operation: &'static str) -> Result<()> {
        let call = {
            let mut counts = self.counts.lock();
            let entry = counts.entry(operation).or_insert(0);
            *entry += 1;
            *entry
        };

        for scenario in self.scenarios.iter() {
            match scenario {
                ErrorScenario::FailFirstN {
                    operation: op,
                    count,
                } if *op == operation && call <= *count => {
                    return Err(anyhow!(
                        "injected {} failure ({} of {})",
                        operation,
                        call,
                        count
                    ));
                }
                ErrorScenario::FailAfterN {
                    operation: op,
                    count,
                } if *op == operation && call > *count => {
                    return Err(anyhow!(
                        "injected {} failure after {} calls",
                        operation,
                        count
                    ));
                }
                ErrorScenario::HardwareFault {
                    operation: op,
                    code,
                } if *op == operation => {
                    return Err(anyhow!("hardware fault {} during {}", code, operation));
                }
                _ => {}
            }
        }

        let rate = self
            .failure_rates
            .get(operation)
            .copied()
            .unwrap_or(0.0);
        if self.rng.should_fail(rate) {
            return Err(anyhow!("random {} failure", operation));
        }

        Ok(())
    }

    /// Number of times `operation` has been checked.
    pub fn call_count(&self, operation: &'static str) -> u32 {
        self.counts.lock().get(operation).copied().unwrap_or(0)
    }
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self::none()
    }
}
