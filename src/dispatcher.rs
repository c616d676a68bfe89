//! Command dispatch.
//!
//! Maps one decoded command id to its handler. The handler reads the
//! command argument (if any) from the same stream, calls the
//! [`Microscope`], and builds the reply. Gating happens first: a command
//! whose stage is not reachable is answered exactly like an unknown id.

use crate::gating;
use dhm_core::{optimize_exposure, DhmError, DhmResult, Microscope};
use dhm_proto::{Command, Payload, Response, Stage, WireReader, COMMAND_VERSION, SERVER_VERSION};
use tokio::io::AsyncRead;
use tracing::{debug, info};

/// What the session loop should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send this reply and wait for the next command.
    Reply(Response),
    /// End the session without a reply.
    Quit,
}

impl Outcome {
    fn ack(command: Command) -> Self {
        Outcome::Reply(Response::ack(command))
    }

    fn value(command: Command, payload: Payload) -> Self {
        Outcome::Reply(Response::new(command, payload))
    }
}

/// Routes commands to the microscope.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    scope: Microscope,
}

impl Dispatcher {
    /// Dispatch against `scope`.
    pub fn new(scope: Microscope) -> Self {
        Self { scope }
    }

    /// Run command `id`, reading its argument from `reader`.
    pub async fn dispatch<R>(&self, id: i32, reader: &mut WireReader<R>) -> DhmResult<Outcome>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (command, stage) = match Command::from_i32(id).and_then(|c| c.stage().map(|s| (c, s))) {
            Some(found) => found,
            None => return Err(DhmError::UnknownCommand(id)),
        };

        if !gating::authorize(&self.scope, stage).await? {
            debug!(%command, ?stage, readiness = %self.scope.readiness(), "command gated");
            return Err(DhmError::UnknownCommand(id));
        }

        match stage {
            Stage::Base => self.base(command).await,
            Stage::Init => self.init(command, reader).await,
            Stage::Full => self.full(command, reader).await,
        }
    }

    async fn base(&self, command: Command) -> DhmResult<Outcome> {
        let value = match command {
            Command::Quit => return Ok(Outcome::Quit),
            Command::GetVersion => SERVER_VERSION,
            Command::GetCmdVersion => COMMAND_VERSION,
            Command::GetDhmStatus => self.scope.readiness().code(),
            other => return Err(DhmError::UnknownCommand(other.code())),
        };
        Ok(Outcome::value(command, Payload::Int32(value)))
    }

    async fn init<R>(&self, command: Command, reader: &mut WireReader<R>) -> DhmResult<Outcome>
    where
        R: AsyncRead + Unpin + Send,
    {
        let hw = self.scope.hardware();
        match command {
            Command::GetConfigList => Ok(Outcome::value(
                command,
                Payload::ConfigList(hw.config_list().await?),
            )),
            Command::GetConfig => Ok(Outcome::value(
                command,
                Payload::Int32(hw.active_config().await?),
            )),
            Command::SetConfig => {
                let id = reader.read_i32().await?;
                self.scope.select_config(id).await?;
                Ok(Outcome::ack(command))
            }
            other => Err(DhmError::UnknownCommand(other.code())),
        }
    }

    async fn full<R>(&self, command: Command, reader: &mut WireReader<R>) -> DhmResult<Outcome>
    where
        R: AsyncRead + Unpin + Send,
    {
        let hw = self.scope.hardware();
        let payload = match command {
            Command::GetDhmSerial => Payload::String(hw.dhm_serial().await?),

            Command::GetObjectiveName => Payload::String(hw.objective().await?.name),
            Command::GetObjectiveDescription => {
                Payload::String(hw.objective().await?.description)
            }
            Command::GetObjectiveMagnification => {
                Payload::Float64(hw.objective().await?.magnification)
            }
            Command::GetObjectiveNumericalAperture => {
                Payload::Float64(hw.objective().await?.numerical_aperture)
            }
            Command::GetObjectivePixelSizeXUm => {
                Payload::Float64(hw.objective().await?.pixel_size_x_um)
            }
            Command::GetObjectivePixelSizeYUm => {
                Payload::Float64(hw.objective().await?.pixel_size_y_um)
            }

            Command::GetCameraSerial => Payload::String(hw.camera_info().await?.serial),
            Command::GetCameraName => Payload::String(hw.camera_info().await?.name),
            Command::GetCameraMaxWidth => Payload::Int32(hw.camera_info().await?.max_width),
            Command::GetCameraMaxHeight => Payload::Int32(hw.camera_info().await?.max_height),
            Command::GetCameraPixelSizeUm => {
                Payload::Float32(hw.camera_info().await?.pixel_size_um)
            }
            Command::GetCameraWidth => Payload::Int32(hw.camera_geometry().await?.width),
            Command::GetCameraHeight => Payload::Int32(hw.camera_geometry().await?.height),
            Command::GetCameraOffsetX => Payload::Int32(hw.camera_geometry().await?.offset_x),
            Command::GetCameraOffsetY => Payload::Int32(hw.camera_geometry().await?.offset_y),
            Command::GetCameraStride => Payload::Int32(hw.camera_geometry().await?.stride),
            Command::GetCameraBitPerPixel => Payload::Int32(hw.bit_per_pixel().await?),
            Command::SetCameraBitPerPixel => {
                let bpp = reader.read_i32().await?;
                self.scope.set_bit_per_pixel(bpp).await?;
                return Ok(Outcome::ack(command));
            }

            Command::MinCameraShutter => Payload::Int32(hw.shutter_limits().await?.min),
            Command::MaxCameraShutter => Payload::Int32(hw.shutter_limits().await?.max),
            Command::GetCameraShutter => Payload::Int32(hw.shutter().await?),
            Command::SetCameraShutter => {
                let shutter = reader.read_i32().await?;
                self.scope.set_shutter(shutter).await?;
                return Ok(Outcome::ack(command));
            }
            Command::MinCameraShutterUs => Payload::Float32(hw.shutter_us_limits().await?.min),
            Command::MaxCameraShutterUs => Payload::Float32(hw.shutter_us_limits().await?.max),
            Command::GetCameraShutterUs => Payload::Float32(hw.shutter_us().await?),
            Command::SetCameraShutterUs => {
                let shutter_us = reader.read_f32().await?;
                self.scope.set_shutter_us(shutter_us).await?;
                return Ok(Outcome::ack(command));
            }

            Command::MinCameraGain => Payload::Int32(hw.gain_limits().await?.min),
            Command::MaxCameraGain => Payload::Int32(hw.gain_limits().await?.max),
            Command::GetCameraGain => Payload::Int32(hw.gain().await?),
            Command::SetCameraGain => {
                let gain = reader.read_i32().await?;
                self.scope.set_gain(gain).await?;
                return Ok(Outcome::ack(command));
            }

            Command::MinCameraBrightness => Payload::Int32(hw.brightness_limits().await?.min),
            Command::MaxCameraBrightness => Payload::Int32(hw.brightness_limits().await?.max),
            Command::GetCameraBrightness => Payload::Int32(hw.brightness().await?),
            Command::SetCameraBrightness => {
                let brightness = reader.read_i32().await?;
                self.scope.set_brightness(brightness).await?;
                return Ok(Outcome::ack(command));
            }

            Command::GetCameraImage => Payload::Image(self.scope.grab().await?),
            Command::GetOptCameraImage => {
                let max_overflow = reader.read_i32().await?;
                let result = optimize_exposure(&self.scope, max_overflow).await?;
                info!(
                    shutter = result.shutter,
                    grabs = result.grabs,
                    max_overflow,
                    "exposure optimized"
                );
                Payload::Image(result.image)
            }
            Command::StartCameraGrabTime => {
                self.scope.arm_grab_timer().await?;
                return Ok(Outcome::ack(command));
            }

            Command::GetLaserWavelength => Payload::Float64(hw.laser_wavelength().await?),
            Command::SetLaserOutput => {
                let on = reader.read_i32().await? > 0;
                self.scope.set_laser_output(on).await?;
                return Ok(Outcome::ack(command));
            }

            Command::MinMotorCoderPos => Payload::Int32(hw.motor_coder_limits().await?.min),
            Command::MaxMotorCoderPos => Payload::Int32(hw.motor_coder_limits().await?.max),
            Command::GetMotorCoderPos => Payload::Int32(hw.motor_coder_position().await?),
            Command::MinMotorPos => Payload::Float32(hw.motor_limits().await?.min),
            Command::MaxMotorPos => Payload::Float32(hw.motor_limits().await?.max),
            Command::GetMotorPos => Payload::Float32(hw.motor_position().await?),
            Command::SetMotorPos => {
                let position = reader.read_f32().await?;
                self.scope.set_motor_position(position).await?;
                return Ok(Outcome::ack(command));
            }
            Command::UnitMotorPos => Payload::String(hw.motor_unit().await?.label().to_string()),

            other => return Err(DhmError::UnknownCommand(other.code())),
        };
        Ok(Outcome::value(command, payload))
    }
}
