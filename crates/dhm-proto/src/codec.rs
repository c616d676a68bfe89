//! Binary wire codec.
//!
//! All multi-byte scalars are **little-endian**. This is a wire
//! compatibility constant shared with every deployed client; it is not
//! negotiable per connection.
//!
//! | Type        | Encoding                                              |
//! |-------------|-------------------------------------------------------|
//! | int32       | 4 bytes                                               |
//! | float32     | 4 bytes IEEE-754                                      |
//! | float64     | 8 bytes IEEE-754                                      |
//! | string      | int32 byte length, UTF-8 bytes, no terminator         |
//! | config list | int32 count, then int32 id + string name per entry    |
//! | image       | int32 height, width, stride, then stride×height bytes |
//!
//! Every message starts with the int32 command id it answers. A reply
//! without payload is just that id. Errors are the `Error` id followed by
//! the int32 result code.

use crate::commands::Command;
use bytes::{BufMut, Bytes, BytesMut};
use dhm_core::limits::{validate_image_size, MAX_CONFIG_ENTRIES, MAX_STRING_BYTES};
use dhm_core::{ConfigItem, DhmError, DhmResult, FrameField, ImageBuffer, ResultCode};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Wire-level type of a command argument or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Nothing follows the command id.
    Empty,
    /// Little-endian int32.
    Int32,
    /// Little-endian IEEE-754 float32.
    Float32,
    /// Little-endian IEEE-754 float64.
    Float64,
    /// int32 byte length, then UTF-8 bytes.
    String,
    /// int32 count, then `{id, name}` entries.
    ConfigList,
    /// int32 height, width, stride, then the rows.
    Image,
}

/// A typed value following a command id.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No payload.
    Empty,
    /// An int32.
    Int32(i32),
    /// A float32.
    Float32(f32),
    /// A float64.
    Float64(f64),
    /// A length-prefixed string.
    String(String),
    /// A profile list.
    ConfigList(Vec<ConfigItem>),
    /// A frame.
    Image(ImageBuffer),
}

impl Payload {
    /// Wire type of this value.
    pub fn wire_type(&self) -> WireType {
        match self {
            Payload::Empty => WireType::Empty,
            Payload::Int32(_) => WireType::Int32,
            Payload::Float32(_) => WireType::Float32,
            Payload::Float64(_) => WireType::Float64,
            Payload::String(_) => WireType::String,
            Payload::ConfigList(_) => WireType::ConfigList,
            Payload::Image(_) => WireType::Image,
        }
    }

    /// Bytes this payload occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Int32(_) | Payload::Float32(_) => 4,
            Payload::Float64(_) => 8,
            Payload::String(s) => 4 + s.len(),
            Payload::ConfigList(items) => {
                4 + items.iter().map(|c| 8 + c.name.len()).sum::<usize>()
            }
            Payload::Image(image) => 12 + image.data().len(),
        }
    }

    /// Append the little-endian encoding to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Payload::Empty => {}
            Payload::Int32(v) => buf.put_i32_le(*v),
            Payload::Float32(v) => buf.put_f32_le(*v),
            Payload::Float64(v) => buf.put_f64_le(*v),
            Payload::String(s) => put_string(buf, s),
            Payload::ConfigList(items) => put_config_list(buf, items),
            Payload::Image(image) => put_image(buf, image),
        }
    }
}

fn put_string(buf: &mut BytesMut, value: &str) {
    buf.put_i32_le(value.len() as i32);
    buf.put_slice(value.as_bytes());
}

fn put_config_list(buf: &mut BytesMut, items: &[ConfigItem]) {
    buf.put_i32_le(items.len() as i32);
    for item in items {
        buf.put_i32_le(item.id);
        put_string(buf, &item.name);
    }
}

fn put_image(buf: &mut BytesMut, image: &ImageBuffer) {
    buf.put_i32_le(image.height() as i32);
    buf.put_i32_le(image.width() as i32);
    buf.put_i32_le(image.stride() as i32);
    buf.put_slice(image.data());
}

// =============================================================================
// Messages
// =============================================================================

/// A server reply: command id plus optional payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Id the reply answers, or `Error`.
    pub command: i32,
    /// Result value, empty for acks.
    pub payload: Payload,
}

impl Response {
    /// Reply to `command` carrying `payload`.
    pub fn new(command: Command, payload: Payload) -> Self {
        Self {
            command: command.code(),
            payload,
        }
    }

    /// Bare acknowledgement.
    pub fn ack(command: Command) -> Self {
        Self::new(command, Payload::Empty)
    }

    /// `{Error, code}`.
    pub fn error(code: ResultCode) -> Self {
        Self::new(Command::Error, Payload::Int32(code.code()))
    }

    /// Encode id and payload.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.payload.encoded_len());
        buf.put_i32_le(self.command);
        self.payload.encode(&mut buf);
        buf.freeze()
    }
}

/// A client request: command id plus optional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Command to run.
    pub command: Command,
    /// Argument, empty for most commands.
    pub arg: Payload,
}

impl Request {
    /// Request without argument.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            arg: Payload::Empty,
        }
    }

    /// Request carrying one argument.
    pub fn with_arg(command: Command, arg: Payload) -> Self {
        Self { command, arg }
    }

    /// Encode id and argument.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.arg.encoded_len());
        buf.put_i32_le(self.command.code());
        self.arg.encode(&mut buf);
        buf.freeze()
    }
}

// =============================================================================
// WireReader
// =============================================================================

/// Decodes wire values from an async byte stream.
///
/// A stream that ends inside a fixed-width field yields
/// [`DhmError::ShortRead`]; a stream that ends cleanly between messages is
/// reported by [`WireReader::read_command`] as `None`.
#[derive(Debug)]
pub struct WireReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> WireReader<R> {
    /// Read from `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    async fn fill(&mut self, buf: &mut [u8], field: FrameField) -> DhmResult<()> {
        match self.inner.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(DhmError::ShortRead(field))
            }
            Err(e) => Err(DhmError::Io(e)),
        }
    }

    /// Read the next command id, or `None` if the peer closed the stream
    /// before sending any byte of it.
    pub async fn read_command(&mut self) -> DhmResult<Option<i32>> {
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(DhmError::ShortRead(FrameField::CommandId));
            }
            filled += n;
        }
        Ok(Some(i32::from_le_bytes(buf)))
    }

    /// Read an int32.
    pub async fn read_i32(&mut self) -> DhmResult<i32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, FrameField::Int32).await?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Read a float32.
    pub async fn read_f32(&mut self) -> DhmResult<f32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, FrameField::Float32).await?;
        Ok(f32::from_le_bytes(buf))
    }

    /// Read a float64.
    pub async fn read_f64(&mut self) -> DhmResult<f64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf, FrameField::Float64).await?;
        Ok(f64::from_le_bytes(buf))
    }

    async fn read_len(&mut self, what: &str, max: usize) -> DhmResult<usize> {
        let len = self.read_i32().await?;
        let len = usize::try_from(len)
            .map_err(|_| DhmError::Protocol(format!("negative {} length {}", what, len)))?;
        if len > max {
            return Err(DhmError::Protocol(format!(
                "{} length {} exceeds limit of {}",
                what, len, max
            )));
        }
        Ok(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub async fn read_string(&mut self) -> DhmResult<String> {
        let len = self.read_len("string", MAX_STRING_BYTES).await?;
        let mut bytes = vec![0u8; len];
        self.fill(&mut bytes, FrameField::Bytes).await?;
        String::from_utf8(bytes)
            .map_err(|e| DhmError::Protocol(format!("string is not UTF-8: {}", e)))
    }

    /// Read a profile list.
    pub async fn read_config_list(&mut self) -> DhmResult<Vec<ConfigItem>> {
        let count = self.read_len("config list", MAX_CONFIG_ENTRIES).await?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let id = self.read_i32().await?;
            let name = self.read_string().await?;
            items.push(ConfigItem { id, name });
        }
        Ok(items)
    }

    /// Read a frame, rejecting geometries past the decoder caps.
    pub async fn read_image(&mut self) -> DhmResult<ImageBuffer> {
        let height = self.read_dimension("height").await?;
        let width = self.read_dimension("width").await?;
        let stride = self.read_dimension("stride").await?;
        let len = validate_image_size(height, width, stride)?;

        let mut data = vec![0u8; len];
        self.fill(&mut data, FrameField::Bytes).await?;
        ImageBuffer::new(height, width, stride, data)
    }

    async fn read_dimension(&mut self, what: &str) -> DhmResult<u32> {
        let value = self.read_i32().await?;
        u32::try_from(value)
            .map_err(|_| DhmError::Protocol(format!("negative image {} {}", what, value)))
    }

    /// Read a value of the given wire type.
    pub async fn read_payload(&mut self, ty: WireType) -> DhmResult<Payload> {
        Ok(match ty {
            WireType::Empty => Payload::Empty,
            WireType::Int32 => Payload::Int32(self.read_i32().await?),
            WireType::Float32 => Payload::Float32(self.read_f32().await?),
            WireType::Float64 => Payload::Float64(self.read_f64().await?),
            WireType::String => Payload::String(self.read_string().await?),
            WireType::ConfigList => Payload::ConfigList(self.read_config_list().await?),
            WireType::Image => Payload::Image(self.read_image().await?),
        })
    }

    /// Read one reply to `command`.
    ///
    /// Returns `Ok(Err(code))` when the server answered with `{Error, code}`.
    pub async fn read_response(
        &mut self,
        command: Command,
    ) -> DhmResult<std::result::Result<Payload, i32>> {
        let id = self
            .read_command()
            .await?
            .ok_or(DhmError::ShortRead(FrameField::CommandId))?;
        if id == Command::Error.code() {
            return Ok(Err(self.read_i32().await?));
        }
        if id != command.code() {
            return Err(DhmError::Protocol(format!(
                "expected reply to {} (0x{:08x}), got 0x{:08x}",
                command,
                command.code(),
                id
            )));
        }
        Ok(Ok(self.read_payload(command.signature().result).await?))
    }
}
