//! Frame Protocol
//!
//! Wire format for shell-host traffic: length-prefixed JSON with a CRC32
//! checksum.
//!
//! # Frame Format
//!
//! ```text
//! +----------------+----------------+------------------------------------------+
//! | Length (4)     | Checksum (4)   | JSON Payload (variable)                  |
//! | big-endian u32 | CRC32          | ShellFrame or HostMessage                |
//! +----------------+----------------+------------------------------------------+
//! ```
//!
//! Length counts the payload only. The checksum is the CRC32 of the payload.
//!
//! # Security
//!
//! - Maximum frame size is enforced before any buffer is grown
//! - CRC32 checksum detects data corruption in transit

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::TransportError;

/// Maximum payload size (1 MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Frame header size: 4 bytes length + 4 bytes checksum
const HEADER_SIZE: usize = 8;

/// Read chunk size for [`read_frame`]
const READ_CHUNK: usize = 4096;

/// Encode a message into one frame
///
/// # Errors
///
/// `SerializationError` if JSON encoding fails, `FrameTooLarge` if the
/// payload exceeds [`MAX_FRAME_SIZE`].
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, TransportError> {
    let json =
        serde_json::to_vec(msg).map_err(|e| TransportError::SerializationError(e.to_string()))?;

    if json.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: json.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let len = u32::try_from(json.len()).map_err(|_| TransportError::FrameTooLarge {
        size: json.len(),
        max: MAX_FRAME_SIZE,
    })?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&crc32fast::hash(&json).to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Stateless frame encoder
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameEncoder;

impl FrameEncoder {
    /// Create a new encoder
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encode a message into one frame
    ///
    /// # Errors
    ///
    /// See [`encode`].
    pub fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>, TransportError> {
        encode(msg)
    }
}

/// Streaming frame decoder
///
/// Buffers incoming bytes and yields complete messages.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the buffer
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered bytes
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Try to decode the next frame
    ///
    /// `Ok(None)` means more data is needed. A frame that fails its checksum
    /// or JSON decoding is consumed, so the stream can continue after it.
    ///
    /// # Errors
    ///
    /// `FrameTooLarge`, `ChecksumMismatch` or `SerializationError`.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<Option<T>, TransportError> {
        if self.buffer.len() < HEADER_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]) as usize;

        if len > MAX_FRAME_SIZE {
            return Err(TransportError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }

        if self.buffer.len() < HEADER_SIZE + len {
            return Ok(None);
        }

        let expected = u32::from_be_bytes([
            self.buffer[4],
            self.buffer[5],
            self.buffer[6],
            self.buffer[7],
        ]);
        let frame: Vec<u8> = self.buffer.drain(..HEADER_SIZE + len).collect();
        let payload = &frame[HEADER_SIZE..];

        let actual = crc32fast::hash(payload);
        if actual != expected {
            return Err(TransportError::ChecksumMismatch { expected, actual });
        }

        serde_json::from_slice(payload)
            .map(Some)
            .map_err(|e| TransportError::SerializationError(e.to_string()))
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Read the next message from `reader`
///
/// Bytes past the frame stay in `decoder` for the next call.
///
/// # Errors
///
/// `ConnectionClosed` on end of stream, plus any decode or IO error.
pub async fn read_frame<R, T>(reader: &mut R, decoder: &mut FrameDecoder) -> Result<T, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if let Some(msg) = decoder.decode()? {
            return Ok(msg);
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        decoder.push(&chunk[..n]);
    }
}

/// Write one message to `writer` and flush
///
/// # Errors
///
/// Any encode or IO error.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
