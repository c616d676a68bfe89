//! Command table and binary wire codec of the DHM remote-control protocol.
//!
//! - [`commands`]: the closed set of command ids with their stage and
//!   argument/result types
//! - [`codec`]: little-endian encoders and the async [`WireReader`]

pub mod codec;
pub mod commands;

pub use codec::{Payload, Request, Response, WireReader, WireType};
pub use commands::{
    Command, Signature, Stage, COMMAND_VERSION, MIN_SERVER_VERSION, SERVER_VERSION,
};
