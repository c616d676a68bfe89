//! Async client for the DHM remote-control server.

use crate::error::{ClientError, Result};
use crate::params::{
    CameraParams, DhmParams, LaserParams, MotorParams, ObjectiveParams, Parameters, ServerParams,
};
use dhm_core::{ConfigItem, DeviceReadiness, DhmError, ImageBuffer, PositionUnit};
use dhm_proto::{Command, Payload, Request, WireReader, MIN_SERVER_VERSION};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, warn};

/// Default TCP port of the server.
pub const DEFAULT_PORT: u16 = 27182;

macro_rules! getters {
    ($($(#[$meta:meta])* $fn_name:ident => $command:ident: $variant:ident -> $ty:ty;)*) => {
        $(
            $(#[$meta])*
            #[doc = concat!("Sends `", stringify!($command), "`.")]
            pub async fn $fn_name(&mut self) -> Result<$ty> {
                match self.call(Request::new(Command::$command)).await? {
                    Payload::$variant(value) => Ok(value),
                    other => Err(ClientError::UnexpectedPayload {
                        command: Command::$command,
                        found: other.wire_type(),
                    }),
                }
            }
        )*
    };
}

/// Connection to a DHM server.
///
/// One request is in flight at a time; the server answers every request
/// before reading the next, so calls simply alternate write and read.
///
/// ```rust,ignore
/// let mut client = DhmClient::connect(("127.0.0.1", DEFAULT_PORT)).await?;
/// client.set_config(137).await?;
/// client.set_camera_shutter_us(800.0).await?;
/// let image = client.camera_image().await?;
/// client.quit().await?;
/// ```
pub struct DhmClient<S = TcpStream> {
    reader: WireReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    server_version: i32,
}

impl DhmClient<TcpStream> {
    /// Connect over TCP and check the server version.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Self::from_stream(stream).await
    }
}

impl<S: AsyncRead + AsyncWrite> DhmClient<S> {
    /// Speak the protocol over an already connected stream.
    ///
    /// Fails with [`ClientError::ServerTooOld`] when the server reports a
    /// version below [`MIN_SERVER_VERSION`].
    pub async fn from_stream(stream: S) -> Result<Self> {
        let (reader, writer) = tokio::io::split(stream);
        let mut client = Self {
            reader: WireReader::new(reader),
            writer,
            server_version: 0,
        };
        let version = client.version().await?;
        if version < MIN_SERVER_VERSION {
            return Err(ClientError::ServerTooOld {
                version,
                minimum: MIN_SERVER_VERSION,
            });
        }
        client.server_version = version;
        debug!(version, "connected to DHM server");
        Ok(client)
    }

    /// Version reported by the server at connect time.
    pub fn server_version(&self) -> i32 {
        self.server_version
    }

    /// Send one request and read its reply.
    pub async fn call(&mut self, request: Request) -> Result<Payload> {
        let command = request.command;
        self.writer.write_all(&request.encode()).await?;
        self.writer.flush().await?;
        match self.reader.read_response(command).await? {
            Ok(payload) => Ok(payload),
            Err(code) => {
                debug!(%command, code, "server reported error");
                Err(ClientError::Remote { command, code })
            }
        }
    }

    async fn set(&mut self, command: Command, arg: Payload) -> Result<()> {
        match self.call(Request::with_arg(command, arg)).await? {
            Payload::Empty => Ok(()),
            other => Err(ClientError::UnexpectedPayload {
                command,
                found: other.wire_type(),
            }),
        }
    }

    async fn image(&mut self, request: Request) -> Result<ImageBuffer> {
        let command = request.command;
        match self.call(request).await? {
            Payload::Image(image) => Ok(image),
            other => Err(ClientError::UnexpectedPayload {
                command,
                found: other.wire_type(),
            }),
        }
    }

    /// End the session and close the connection.
    pub async fn quit(mut self) -> Result<()> {
        self.writer
            .write_all(&Request::new(Command::Quit).encode())
            .await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    // =========================================================================
    // Server
    // =========================================================================

    getters! {
        /// Server version (`GetVersion`).
        version => GetVersion: Int32 -> i32;
        /// Command table version (`GetCmdVersion`).
        command_version => GetCmdVersion: Int32 -> i32;
        status_code => GetDhmStatus: Int32 -> i32;
    }

    /// Hardware readiness as reported by the server.
    pub async fn status(&mut self) -> Result<DeviceReadiness> {
        let code = self.status_code().await?;
        u8::try_from(code)
            .ok()
            .and_then(DeviceReadiness::from_u8)
            .ok_or_else(|| {
                ClientError::Protocol(DhmError::Protocol(format!(
                    "invalid readiness code {}",
                    code
                )))
            })
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    getters! {
        config_list => GetConfigList: ConfigList -> Vec<ConfigItem>;
        /// Active profile id, `-1` if none.
        config => GetConfig: Int32 -> i32;
    }

    /// Select a profile. Unknown ids are accepted and ignored by the server.
    pub async fn set_config(&mut self, id: i32) -> Result<()> {
        self.set(Command::SetConfig, Payload::Int32(id)).await
    }

    // =========================================================================
    // DHM and objective
    // =========================================================================

    getters! {
        dhm_serial => GetDhmSerial: String -> String;
        objective_name => GetObjectiveName: String -> String;
        objective_description => GetObjectiveDescription: String -> String;
        objective_magnification => GetObjectiveMagnification: Float64 -> f64;
        objective_numerical_aperture => GetObjectiveNumericalAperture: Float64 -> f64;
        objective_pixel_size_x_um => GetObjectivePixelSizeXUm: Float64 -> f64;
        objective_pixel_size_y_um => GetObjectivePixelSizeYUm: Float64 -> f64;
    }

    // =========================================================================
    // Camera
    // =========================================================================

    getters! {
        camera_serial => GetCameraSerial: String -> String;
        camera_name => GetCameraName: String -> String;
        camera_max_width => GetCameraMaxWidth: Int32 -> i32;
        camera_max_height => GetCameraMaxHeight: Int32 -> i32;
        camera_width => GetCameraWidth: Int32 -> i32;
        camera_height => GetCameraHeight: Int32 -> i32;
        camera_offset_x => GetCameraOffsetX: Int32 -> i32;
        camera_offset_y => GetCameraOffsetY: Int32 -> i32;
        camera_bit_per_pixel => GetCameraBitPerPixel: Int32 -> i32;
        /// Bytes per image row.
        camera_stride => GetCameraStride: Int32 -> i32;
        camera_pixel_size_um => GetCameraPixelSizeUm: Float32 -> f32;

        camera_min_shutter => MinCameraShutter: Int32 -> i32;
        camera_max_shutter => MaxCameraShutter: Int32 -> i32;
        camera_shutter => GetCameraShutter: Int32 -> i32;
        camera_min_shutter_us => MinCameraShutterUs: Float32 -> f32;
        camera_max_shutter_us => MaxCameraShutterUs: Float32 -> f32;
        camera_shutter_us => GetCameraShutterUs: Float32 -> f32;

        camera_min_gain => MinCameraGain: Int32 -> i32;
        camera_max_gain => MaxCameraGain: Int32 -> i32;
        camera_gain => GetCameraGain: Int32 -> i32;

        camera_min_brightness => MinCameraBrightness: Int32 -> i32;
        camera_max_brightness => MaxCameraBrightness: Int32 -> i32;
        camera_brightness => GetCameraBrightness: Int32 -> i32;
    }

    /// Set the camera bit depth.
    pub async fn set_camera_bit_per_pixel(&mut self, bpp: i32) -> Result<()> {
        self.set(Command::SetCameraBitPerPixel, Payload::Int32(bpp))
            .await
    }

    /// Set the shutter index.
    pub async fn set_camera_shutter(&mut self, shutter: i32) -> Result<()> {
        self.set(Command::SetCameraShutter, Payload::Int32(shutter))
            .await
    }

    /// Set the shutter time in µs.
    pub async fn set_camera_shutter_us(&mut self, shutter_us: f32) -> Result<()> {
        self.set(Command::SetCameraShutterUs, Payload::Float32(shutter_us))
            .await
    }

    /// Set the camera gain.
    pub async fn set_camera_gain(&mut self, gain: i32) -> Result<()> {
        self.set(Command::SetCameraGain, Payload::Int32(gain)).await
    }

    /// Set the camera brightness.
    pub async fn set_camera_brightness(&mut self, brightness: i32) -> Result<()> {
        self.set(Command::SetCameraBrightness, Payload::Int32(brightness))
            .await
    }

    /// Grab one frame once the settling interval has passed.
    pub async fn camera_image(&mut self) -> Result<ImageBuffer> {
        self.image(Request::new(Command::GetCameraImage)).await
    }

    /// Let the server optimize the shutter and return the best frame.
    ///
    /// `max_overflow` is the number of saturated pixels tolerated.
    pub async fn opt_camera_image(&mut self, max_overflow: i32) -> Result<ImageBuffer> {
        self.image(Request::with_arg(
            Command::GetOptCameraImage,
            Payload::Int32(max_overflow),
        ))
        .await
    }

    /// Restart the settling interval from the current shutter time.
    pub async fn start_camera_grab_time(&mut self) -> Result<()> {
        self.set(Command::StartCameraGrabTime, Payload::Empty).await
    }

    // =========================================================================
    // Laser
    // =========================================================================

    getters! {
        /// Wavelength of the active profile's first source, in meters.
        laser_wavelength => GetLaserWavelength: Float64 -> f64;
    }

    /// Switch the active profile's sources on or off.
    pub async fn set_laser_output(&mut self, on: bool) -> Result<()> {
        self.set(Command::SetLaserOutput, Payload::Int32(i32::from(on)))
            .await
    }

    // =========================================================================
    // Motor
    // =========================================================================

    getters! {
        motor_min_coder_pos => MinMotorCoderPos: Int32 -> i32;
        motor_max_coder_pos => MaxMotorCoderPos: Int32 -> i32;
        motor_coder_pos => GetMotorCoderPos: Int32 -> i32;
        motor_min_pos => MinMotorPos: Float32 -> f32;
        motor_max_pos => MaxMotorPos: Float32 -> f32;
        motor_pos => GetMotorPos: Float32 -> f32;
        motor_unit_label => UnitMotorPos: String -> String;
    }

    /// Move the stage; returns once the move has finished.
    pub async fn set_motor_pos(&mut self, position: f32) -> Result<()> {
        self.set(Command::SetMotorPos, Payload::Float32(position))
            .await
    }

    /// Stage unit, if the server reports a known one.
    pub async fn motor_unit(&mut self) -> Result<Option<PositionUnit>> {
        let label = self.motor_unit_label().await?;
        let unit = PositionUnit::from_label(&label);
        if unit.is_none() {
            warn!(label = %label, "unknown motor unit");
        }
        Ok(unit)
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Read every parameter of a fully configured microscope.
    ///
    /// Needs an active profile; earlier the server rejects the instrument
    /// getters with `err_unknown_command`.
    pub async fn parameters(&mut self) -> Result<Parameters> {
        let server = ServerParams {
            version: self.version().await?,
            command_version: self.command_version().await?,
        };

        let config_id = self.config().await?;
        let config_name = self
            .config_list()
            .await?
            .into_iter()
            .find(|item| item.id == config_id)
            .map(|item| item.name);
        let dhm = DhmParams {
            serial: self.dhm_serial().await?,
            config_id,
            config_name,
        };

        let objective = ObjectiveParams {
            name: self.objective_name().await?,
            description: self.objective_description().await?,
            magnification: self.objective_magnification().await?,
            numerical_aperture: self.objective_numerical_aperture().await?,
            pixel_size_x_um: self.objective_pixel_size_x_um().await?,
            pixel_size_y_um: self.objective_pixel_size_y_um().await?,
        };

        let camera = CameraParams {
            serial: self.camera_serial().await?,
            name: self.camera_name().await?,
            max_width: self.camera_max_width().await?,
            max_height: self.camera_max_height().await?,
            width: self.camera_width().await?,
            height: self.camera_height().await?,
            offset_x: self.camera_offset_x().await?,
            offset_y: self.camera_offset_y().await?,
            bit_per_pixel: self.camera_bit_per_pixel().await?,
            stride: self.camera_stride().await?,
            pixel_size_um: self.camera_pixel_size_um().await?,
            min_shutter: self.camera_min_shutter().await?,
            max_shutter: self.camera_max_shutter().await?,
            shutter: self.camera_shutter().await?,
            min_shutter_us: self.camera_min_shutter_us().await?,
            max_shutter_us: self.camera_max_shutter_us().await?,
            shutter_us: self.camera_shutter_us().await?,
            min_gain: self.camera_min_gain().await?,
            max_gain: self.camera_max_gain().await?,
            gain: self.camera_gain().await?,
            min_brightness: self.camera_min_brightness().await?,
            max_brightness: self.camera_max_brightness().await?,
            brightness: self.camera_brightness().await?,
        };

        let laser = LaserParams {
            wavelength_um: self.laser_wavelength().await? * 1e6,
        };

        let motor = MotorParams {
            min_coder_pos: self.motor_min_coder_pos().await?,
            max_coder_pos: self.motor_max_coder_pos().await?,
            coder_pos: self.motor_coder_pos().await?,
            min_pos: self.motor_min_pos().await?,
            max_pos: self.motor_max_pos().await?,
            pos: self.motor_pos().await?,
            unit_pos: self.motor_unit_label().await?,
        };

        Ok(Parameters {
            server,
            dhm,
            objective,
            camera,
            laser,
            motor,
        })
    }
}

impl<S> std::fmt::Debug for DhmClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhmClient")
            .field("server_version", &self.server_version)
            .finish_non_exhaustive()
    }
}
