//! # DHM remote-control server
//!
//! Exposes a digital holographic microscope (camera, laser, motorized
//! stage, configuration profiles) to one remote client at a time over a
//! persistent TCP connection speaking the binary command protocol of
//! `dhm-proto`.
//!
//! ## Crate Structure
//!
//! - **`config`**: layered settings (defaults, TOML, `DHM_SERV_*` env)
//! - **`logging`**: tracing subscriber setup
//! - **`gating`**: which command stages the hardware state allows
//! - **`dispatcher`**: command id to handler, reply construction
//! - **`session`**: per-connection read/dispatch/reply loop
//! - **`server`**: sequential accept loop with graceful shutdown
//! - **`supervisor`**: background hardware initialization with retry
//!
//! Hardware access goes through [`dhm_core::HardwareController`]; the
//! binary wires in the simulated microscope from `dhm-driver-mock`.

pub mod config;
pub mod dispatcher;
pub mod gating;
pub mod logging;
pub mod server;
pub mod session;
pub mod supervisor;

pub use config::Settings;
pub use dispatcher::{Dispatcher, Outcome};
pub use gating::Privilege;
pub use server::DhmServer;
pub use session::{run_session, SessionOutcome};
pub use supervisor::spawn_initializer;
