//! The published command table, row by row.

use dhm_proto::{Command, Stage, WireType};

type Row = (&'static str, i32, Option<Stage>, WireType, WireType);

#[rustfmt::skip]
const TABLE: &[Row] = &[
    ("Quit", 0x1e769ffe, Some(Stage::Base), WireType::Empty, WireType::Empty),
    ("Error", 0x4bdca849, None, WireType::Empty, WireType::Int32),
    ("GetVersion", 0x3961955f, Some(Stage::Base), WireType::Empty, WireType::Int32),
    ("GetCmdVersion", 0x6aaeafb6, Some(Stage::Base), WireType::Empty, WireType::Int32),
    ("GetDhmStatus", 0x45aa4da5, Some(Stage::Base), WireType::Empty, WireType::Int32),
    ("GetConfigList", 0x10b2b1b4, Some(Stage::Init), WireType::Empty, WireType::ConfigList),
    ("GetConfig", 0x2f5bb0d2, Some(Stage::Init), WireType::Empty, WireType::Int32),
    ("SetConfig", 0x753eadfa, Some(Stage::Init), WireType::Int32, WireType::Empty),
    ("GetDhmSerial", 0x4d4e407e, Some(Stage::Full), WireType::Empty, WireType::String),
    ("GetObjectiveName", 0x3caec94f, Some(Stage::Full), WireType::Empty, WireType::String),
    ("GetObjectiveDescription", 0x50189a53, Some(Stage::Full), WireType::Empty, WireType::String),
    ("GetObjectiveMagnification", 0x4a5a5c7e, Some(Stage::Full), WireType::Empty, WireType::Float64),
    ("GetObjectiveNumericalAperture", 0x08643fec, Some(Stage::Full), WireType::Empty, WireType::Float64),
    ("GetObjectivePixelSizeXUm", 0x4d85491e, Some(Stage::Full), WireType::Empty, WireType::Float64),
    ("GetObjectivePixelSizeYUm", 0x01b07d12, Some(Stage::Full), WireType::Empty, WireType::Float64),
    ("GetCameraSerial", 0x7455294f, Some(Stage::Full), WireType::Empty, WireType::String),
    ("GetCameraName", 0x6b332fd4, Some(Stage::Full), WireType::Empty, WireType::String),
    ("GetCameraMaxWidth", 0x3c10ce2c, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraMaxHeight", 0x21338322, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraWidth", 0x46811c76, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraHeight", 0x1dff8e99, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraOffsetX", 0x188c1213, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraOffsetY", 0x7f724a3b, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraBitPerPixel", 0x5bcc81c3, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("SetCameraBitPerPixel", 0x03af8c0f, Some(Stage::Full), WireType::Int32, WireType::Empty),
    ("GetCameraStride", 0x3c32983a, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraPixelSizeUm", 0x453fa1da, Some(Stage::Full), WireType::Empty, WireType::Float32),
    ("MinCameraShutter", 0x6b122b3a, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("MaxCameraShutter", 0x465b506b, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraShutter", 0x3cfa2458, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("SetCameraShutter", 0x32d64e41, Some(Stage::Full), WireType::Int32, WireType::Empty),
    ("MinCameraShutterUs", 0x51cdfc15, Some(Stage::Full), WireType::Empty, WireType::Float32),
    ("MaxCameraShutterUs", 0x6e36f8f0, Some(Stage::Full), WireType::Empty, WireType::Float32),
    ("GetCameraShutterUs", 0x13486622, Some(Stage::Full), WireType::Empty, WireType::Float32),
    ("SetCameraShutterUs", 0x1db09ec3, Some(Stage::Full), WireType::Float32, WireType::Empty),
    ("MinCameraGain", 0x51441d3f, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("MaxCameraGain", 0x13695ca2, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraGain", 0x6f1d1bc2, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("SetCameraGain", 0x7682c6da, Some(Stage::Full), WireType::Int32, WireType::Empty),
    ("MinCameraBrightness", 0x42f89a18, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("MaxCameraBrightness", 0x31ea7248, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetCameraBrightness", 0x5ee2574c, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("SetCameraBrightness", 0x01f15409, Some(Stage::Full), WireType::Int32, WireType::Empty),
    ("GetCameraImage", 0x55f1cfac, Some(Stage::Full), WireType::Empty, WireType::Image),
    ("GetOptCameraImage", 0x3d4e070b, Some(Stage::Full), WireType::Int32, WireType::Image),
    ("StartCameraGrabTime", 0x4955ed50, Some(Stage::Full), WireType::Empty, WireType::Empty),
    ("GetLaserWavelength", 0x637d6d1f, Some(Stage::Full), WireType::Empty, WireType::Float64),
    ("SetLaserOutput", 0x08332ea8, Some(Stage::Full), WireType::Int32, WireType::Empty),
    ("MinMotorCoderPos", 0x14683792, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("MaxMotorCoderPos", 0x610eb049, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("GetMotorCoderPos", 0x7a904391, Some(Stage::Full), WireType::Empty, WireType::Int32),
    ("MinMotorPos", 0x4baa26b5, Some(Stage::Full), WireType::Empty, WireType::Float32),
    ("MaxMotorPos", 0x057b1c69, Some(Stage::Full), WireType::Empty, WireType::Float32),
    ("GetMotorPos", 0x2690f04f, Some(Stage::Full), WireType::Empty, WireType::Float32),
    ("SetMotorPos", 0x63da8bec, Some(Stage::Full), WireType::Float32, WireType::Empty),
    ("UnitMotorPos", 0x03f93167, Some(Stage::Full), WireType::Empty, WireType::String),
];

#[test]
fn every_command_matches_published_table() {
    for &(name, id, stage, arg, result) in TABLE {
        let cmd = Command::from_i32(id)
            .unwrap_or_else(|| panic!("{} (0x{:08x}) is not a known id", name, id));
        assert_eq!(cmd.name(), name, "0x{:08x}", id);
        assert_eq!(cmd.code(), id, "{}", name);
        assert_eq!(cmd.stage(), stage, "{}", name);
        let sig = cmd.signature();
        assert_eq!(sig.arg, arg, "{} argument", name);
        assert_eq!(sig.result, result, "{} result", name);
    }
}

#[test]
fn table_covers_every_command() {
    assert_eq!(TABLE.len(), Command::ALL.len());
    for &cmd in Command::ALL {
        assert!(
            TABLE.iter().any(|row| row.0 == cmd.name()),
            "{} missing from table",
            cmd
        );
    }
}
