//! The closed command table.
//!
//! Every command is an opaque 32-bit id; nothing about an id can be derived
//! from another. Each entry also fixes the stage that must be reachable for
//! the command to run and the wire types of its argument and result.

use crate::codec::WireType;

/// Version of this command table, returned by `GetCmdVersion`.
pub const COMMAND_VERSION: i32 = 6;

/// Version of the server, returned by `GetVersion`.
pub const SERVER_VERSION: i32 = 4;

/// Oldest server version the client library talks to.
pub const MIN_SERVER_VERSION: i32 = 3;

/// Readiness-gated command stages, by increasing privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Always reachable.
    Base,
    /// Needs readiness of at least `Initialized`.
    Init,
    /// Needs `Initialized` readiness and an active profile.
    Full,
}

/// Argument and result types of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Type read after the command id.
    pub arg: WireType,
    /// Type sent after the echoed id on success.
    pub result: WireType,
}

const BASE: Option<Stage> = Some(Stage::Base);
const INIT: Option<Stage> = Some(Stage::Init);
const FULL: Option<Stage> = Some(Stage::Full);
const REPLY: Option<Stage> = None;

macro_rules! command_table {
    ($($name:ident = $id:literal, $stage:expr, $arg:ident => $result:ident;)*) => {
        /// Protocol command identifiers.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum Command {
            $(#[doc = concat!("Wire id `", stringify!($id), "`.")]
            $name = $id,)*
        }

        impl Command {
            /// Every command in table order.
            pub const ALL: &'static [Command] = &[$(Command::$name,)*];

            /// Look up a wire id.
            pub fn from_i32(value: i32) -> Option<Self> {
                match value {
                    $($id => Some(Command::$name),)*
                    _ => None,
                }
            }

            /// Variant name, used in logs.
            pub fn name(self) -> &'static str {
                match self {
                    $(Command::$name => stringify!($name),)*
                }
            }

            /// Stage the command belongs to; `None` for the reply-only `Error`.
            pub fn stage(self) -> Option<Stage> {
                match self {
                    $(Command::$name => $stage,)*
                }
            }

            /// Argument and result types.
            pub fn signature(self) -> Signature {
                match self {
                    $(Command::$name => Signature {
                        arg: WireType::$arg,
                        result: WireType::$result,
                    },)*
                }
            }
        }
    };
}

command_table! {
    Quit = 0x1e769ffe, BASE, Empty => Empty;
    Error = 0x4bdca849, REPLY, Empty => Int32;
    GetVersion = 0x3961955f, BASE, Empty => Int32;
    GetCmdVersion = 0x6aaeafb6, BASE, Empty => Int32;
    GetDhmStatus = 0x45aa4da5, BASE, Empty => Int32;

    GetConfigList = 0x10b2b1b4, INIT, Empty => ConfigList;
    GetConfig = 0x2f5bb0d2, INIT, Empty => Int32;
    SetConfig = 0x753eadfa, INIT, Int32 => Empty;

    GetDhmSerial = 0x4d4e407e, FULL, Empty => String;

    GetObjectiveName = 0x3caec94f, FULL, Empty => String;
    GetObjectiveDescription = 0x50189a53, FULL, Empty => String;
    GetObjectiveMagnification = 0x4a5a5c7e, FULL, Empty => Float64;
    GetObjectiveNumericalAperture = 0x08643fec, FULL, Empty => Float64;
    GetObjectivePixelSizeXUm = 0x4d85491e, FULL, Empty => Float64;
    GetObjectivePixelSizeYUm = 0x01b07d12, FULL, Empty => Float64;

    GetCameraSerial = 0x7455294f, FULL, Empty => String;
    GetCameraName = 0x6b332fd4, FULL, Empty => String;
    GetCameraMaxWidth = 0x3c10ce2c, FULL, Empty => Int32;
    GetCameraMaxHeight = 0x21338322, FULL, Empty => Int32;
    GetCameraWidth = 0x46811c76, FULL, Empty => Int32;
    GetCameraHeight = 0x1dff8e99, FULL, Empty => Int32;
    GetCameraOffsetX = 0x188c1213, FULL, Empty => Int32;
    GetCameraOffsetY = 0x7f724a3b, FULL, Empty => Int32;
    GetCameraBitPerPixel = 0x5bcc81c3, FULL, Empty => Int32;
    SetCameraBitPerPixel = 0x03af8c0f, FULL, Int32 => Empty;
    GetCameraStride = 0x3c32983a, FULL, Empty => Int32;
    GetCameraPixelSizeUm = 0x453fa1da, FULL, Empty => Float32;

    MinCameraShutter = 0x6b122b3a, FULL, Empty => Int32;
    MaxCameraShutter = 0x465b506b, FULL, Empty => Int32;
    GetCameraShutter = 0x3cfa2458, FULL, Empty => Int32;
    SetCameraShutter = 0x32d64e41, FULL, Int32 => Empty;
    MinCameraShutterUs = 0x51cdfc15, FULL, Empty => Float32;
    MaxCameraShutterUs = 0x6e36f8f0, FULL, Empty => Float32;
    GetCameraShutterUs = 0x13486622, FULL, Empty => Float32;
    SetCameraShutterUs = 0x1db09ec3, FULL, Float32 => Empty;

    MinCameraGain = 0x51441d3f, FULL, Empty => Int32;
    MaxCameraGain = 0x13695ca2, FULL, Empty => Int32;
    GetCameraGain = 0x6f1d1bc2, FULL, Empty => Int32;
    SetCameraGain = 0x7682c6da, FULL, Int32 => Empty;

    MinCameraBrightness = 0x42f89a18, FULL, Empty => Int32;
    MaxCameraBrightness = 0x31ea7248, FULL, Empty => Int32;
    GetCameraBrightness = 0x5ee2574c, FULL, Empty => Int32;
    SetCameraBrightness = 0x01f15409, FULL, Int32 => Empty;

    GetCameraImage = 0x55f1cfac, FULL, Empty => Image;
    GetOptCameraImage = 0x3d4e070b, FULL, Int32 => Image;
    StartCameraGrabTime = 0x4955ed50, FULL, Empty => Empty;

    GetLaserWavelength = 0x637d6d1f, FULL, Empty => Float64;
    SetLaserOutput = 0x08332ea8, FULL, Int32 => Empty;

    MinMotorCoderPos = 0x14683792, FULL, Empty => Int32;
    MaxMotorCoderPos = 0x610eb049, FULL, Empty => Int32;
    GetMotorCoderPos = 0x7a904391, FULL, Empty => Int32;
    MinMotorPos = 0x4baa26b5, FULL, Empty => Float32;
    MaxMotorPos = 0x057b1c69, FULL, Empty => Float32;
    GetMotorPos = 0x2690f04f, FULL, Empty => Float32;
    SetMotorPos = 0x63da8bec, FULL, Float32 => Empty;
    UnitMotorPos = 0x03f93167, FULL, Empty => String;
}

impl Command {
    /// Wire value.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
