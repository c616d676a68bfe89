//! Client library for the DHM remote-control server.
//!
//! Speaks the binary command protocol of `dhm-serv` over TCP (or any
//! `AsyncRead + AsyncWrite` stream) and exposes one typed async method per
//! command, plus a [`Parameters`] snapshot of the whole instrument.

pub mod client;
pub mod error;
pub mod params;

pub use client::{DhmClient, DEFAULT_PORT};
pub use error::{ClientError, Result};
pub use params::Parameters;
