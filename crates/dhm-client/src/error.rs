//! Client error types.

use dhm_core::{DhmError, ResultCode};
use dhm_proto::{Command, WireType};
use thiserror::Error;

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to a DHM server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Socket error while connecting, sending or receiving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reply could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] DhmError),

    /// The server answered with `{Error, code}`.
    #[error("{command} failed: {}", describe_code(*.code))]
    Remote { command: Command, code: i32 },

    /// The server speaks an older protocol than this client supports.
    #[error("server version {version} is older than the supported minimum {minimum}")]
    ServerTooOld { version: i32, minimum: i32 },

    /// The reply decoded to a type other than the one the caller asked for.
    #[error("unexpected {found:?} reply to {command}")]
    UnexpectedPayload { command: Command, found: WireType },
}

impl ClientError {
    /// Result code of a [`ClientError::Remote`] error, if it is a known one.
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            ClientError::Remote { code, .. } => ResultCode::from_code(*code),
            _ => None,
        }
    }
}

fn describe_code(code: i32) -> String {
    match ResultCode::from_code(code) {
        Some(known) => known.to_string(),
        None => format!("unknown result code {}", code),
    }
}
