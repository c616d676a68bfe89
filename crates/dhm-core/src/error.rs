//! Error types and numeric result codes.
//!
//! Every failure that can reach a client is expressed twice:
//!
//! - **`ResultCode`**: the signed 32-bit code carried on the wire after the
//!   reserved `Error` command id. The numbering is part of the protocol and
//!   must never be renumbered.
//! - **`DhmError`**: the Rust error type flowing through the dispatcher and
//!   session loop. Each variant knows its wire code and whether it ends the
//!   session.
//!
//! ## Severity
//!
//! Range errors (`OutOfRange`) are the only recoverable failures: the client
//! gets `{Error, code}` and may keep sending commands. Everything else
//! (framing, unknown command, hardware fault, socket I/O) tears the session
//! down; the server then goes back to accepting the next connection.

use thiserror::Error;

// =============================================================================
// Result Codes
// =============================================================================

/// Numeric result codes shared by server and clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResultCode {
    /// Session ended by `Quit`.
    Quit = 2,
    /// Unspecified failure.
    Unknown = 1,
    /// No error.
    Success = 0,
    /// Hardware missing or faulted.
    NoHardware = -1,
    /// Hardware not initialized yet.
    NotInitialized = -2,
    /// Profile id not in the database.
    UnknownConfig = -3,
    /// Stream ended inside an int32.
    RecvIntSize = -4,
    /// Stream ended inside a float.
    RecvFloatSize = -5,
    /// Shutter index below the camera minimum.
    ShutterUnderflow = -6,
    /// Shutter index above the camera maximum.
    ShutterOverflow = -7,
    /// Shutter time below the camera minimum.
    ShutterUsUnderflow = -8,
    /// Shutter time above the camera maximum.
    ShutterUsOverflow = -9,
    /// Gain below the camera minimum.
    GainUnderflow = -10,
    /// Gain above the camera maximum.
    GainOverflow = -11,
    /// Brightness below the camera minimum.
    BrightnessUnderflow = -12,
    /// Brightness above the camera maximum.
    BrightnessOverflow = -13,
    /// Stage target below the travel range.
    PosUnderflow = -14,
    /// Stage target above the travel range.
    PosOverflow = -15,
    /// Bit depth is not positive.
    BppUnderflow = -16,
    /// Id not in the table, or not reachable yet.
    UnknownCommand = -17,
}

impl ResultCode {
    /// Every defined code, in wire order.
    pub const ALL: [ResultCode; 20] = [
        ResultCode::Quit,
        ResultCode::Unknown,
        ResultCode::Success,
        ResultCode::NoHardware,
        ResultCode::NotInitialized,
        ResultCode::UnknownConfig,
        ResultCode::RecvIntSize,
        ResultCode::RecvFloatSize,
        ResultCode::ShutterUnderflow,
        ResultCode::ShutterOverflow,
        ResultCode::ShutterUsUnderflow,
        ResultCode::ShutterUsOverflow,
        ResultCode::GainUnderflow,
        ResultCode::GainOverflow,
        ResultCode::BrightnessUnderflow,
        ResultCode::BrightnessOverflow,
        ResultCode::PosUnderflow,
        ResultCode::PosOverflow,
        ResultCode::BppUnderflow,
        ResultCode::UnknownCommand,
    ];

    /// Wire value of this code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a code received from the wire.
    pub fn from_code(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == value)
    }

    /// True for the per-parameter underflow/overflow codes.
    pub fn is_range_error(self) -> bool {
        (ResultCode::BppUnderflow.code()..=ResultCode::ShutterUnderflow.code())
            .contains(&self.code())
    }

    /// Short snake_case label used in logs and client error messages.
    pub fn label(self) -> &'static str {
        match self {
            ResultCode::Quit => "quit",
            ResultCode::Unknown => "unknown",
            ResultCode::Success => "success",
            ResultCode::NoHardware => "err_no_hardware",
            ResultCode::NotInitialized => "err_not_initialized",
            ResultCode::UnknownConfig => "err_unknown_config",
            ResultCode::RecvIntSize => "err_recv_int_size",
            ResultCode::RecvFloatSize => "err_recv_float_size",
            ResultCode::ShutterUnderflow => "err_shutter_underflow",
            ResultCode::ShutterOverflow => "err_shutter_overflow",
            ResultCode::ShutterUsUnderflow => "err_shutter_us_underflow",
            ResultCode::ShutterUsOverflow => "err_shutter_us_overflow",
            ResultCode::GainUnderflow => "err_gain_underflow",
            ResultCode::GainOverflow => "err_gain_overflow",
            ResultCode::BrightnessUnderflow => "err_brightness_underflow",
            ResultCode::BrightnessOverflow => "err_brightness_overflow",
            ResultCode::PosUnderflow => "err_pos_underflow",
            ResultCode::PosOverflow => "err_pos_overflow",
            ResultCode::BppUnderflow => "err_bpp_underflow",
            ResultCode::UnknownCommand => "err_unknown_command",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

// =============================================================================
// Framing
// =============================================================================

/// Fixed-width field that was being read when the stream ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    /// A command identifier.
    CommandId,
    /// A 32-bit integer argument or length/count prefix.
    Int32,
    /// A 32-bit float argument.
    Float32,
    /// A 64-bit float.
    Float64,
    /// A length-prefixed byte body (string or pixel data).
    Bytes,
}

impl FrameField {
    /// Code reported for a short read of this field.
    pub fn short_read_code(self) -> ResultCode {
        match self {
            FrameField::Float32 | FrameField::Float64 => ResultCode::RecvFloatSize,
            FrameField::CommandId | FrameField::Int32 | FrameField::Bytes => {
                ResultCode::RecvIntSize
            }
        }
    }
}

impl std::fmt::Display for FrameField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FrameField::CommandId => "command id",
            FrameField::Int32 => "int32",
            FrameField::Float32 => "float32",
            FrameField::Float64 => "float64",
            FrameField::Bytes => "byte body",
        };
        write!(f, "{}", label)
    }
}

// =============================================================================
// DhmError
// =============================================================================

/// Convenience alias for results using [`DhmError`].
pub type DhmResult<T> = std::result::Result<T, DhmError>;

/// Errors raised while serving or speaking the DHM protocol.
#[derive(Error, Debug)]
pub enum DhmError {
    /// The peer closed the stream in the middle of a fixed-width field.
    #[error("short read of {0}")]
    ShortRead(FrameField),

    /// The command id matched no stage reachable in the current state.
    #[error("unknown command 0x{0:08x}")]
    UnknownCommand(i32),

    /// A setter argument fell outside the live instrument limits.
    #[error("argument out of range: {0}")]
    OutOfRange(ResultCode),

    /// A decoded payload violated a structural limit (length, size, UTF-8).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The hardware controller reported a failure.
    #[error(transparent)]
    Hardware(#[from] anyhow::Error),

    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DhmError {
    /// Wire code sent to the client for this error.
    pub fn code(&self) -> ResultCode {
        match self {
            DhmError::ShortRead(field) => field.short_read_code(),
            DhmError::UnknownCommand(_) => ResultCode::UnknownCommand,
            DhmError::OutOfRange(code) => *code,
            DhmError::Protocol(_) => ResultCode::Unknown,
            DhmError::Hardware(_) => ResultCode::NoHardware,
            DhmError::Io(_) => ResultCode::Unknown,
        }
    }

    /// Whether the session must end after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DhmError::OutOfRange(_))
    }

    /// Whether an `{Error, code}` reply can still be attempted.
    ///
    /// Only a broken socket is skipped; a peer that stopped mid-frame may
    /// still be reading.
    pub fn wants_reply(&self) -> bool {
        !matches!(self, DhmError::Io(_))
    }
}
