use super::constants::*;
use super::crc::payload_crc32;
use super::header::{HeaderError, PacketHeader};
use thiserror::Error;

/// Whole-packet validation failures
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    #[error("invalid header: {0}")]
    HeaderInvalid(#[from] HeaderError),

    #[error("length mismatch: header announces {expected} bytes, buffer holds {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("payload CRC mismatch: trailer 0x{carried:08x}, computed 0x{computed:08x}")]
    PayloadCrcMismatch { carried: u32, computed: u32 },
}

/// Validate one contiguous frame: header, exact total length, payload CRC32.
pub fn validate_packet(buf: &[u8]) -> Result<PacketHeader, PacketError> {
    if buf.len() < MIN_PACKET_SIZE {
        return Err(HeaderError::BufferTooSmall { len: buf.len() }.into());
    }

    let header = PacketHeader::parse(buf)?;

    let expected = header.frame_len();
    if buf.len() != expected {
        return Err(PacketError::LengthMismatch {
            expected,
            actual: buf.len(),
        });
    }

    let payload_end = HEADER_SIZE + header.payload_len as usize;
    let payload = &buf[HEADER_SIZE..payload_end];
    let trailer = &buf[payload_end..];
    let carried = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = payload_crc32(payload);

    if carried != computed {
        return Err(PacketError::PayloadCrcMismatch { carried, computed });
    }

    Ok(header)
}

/// A header plus its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(msg_type: MessageType, seq: u16, payload: Vec<u8>) -> Result<Self, PacketError> {
        Self::with_raw_type(
            msg_type.id(),
            msg_type.source() as u8,
            msg_type.destination() as u8,
            seq,
            payload,
        )
    }

    /// Build a packet with explicit addressing and a possibly unknown type id.
    pub fn with_raw_type(
        msg_type: u8,
        src: u8,
        dst: u8,
        seq: u16,
        payload: Vec<u8>,
    ) -> Result<Self, PacketError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(HeaderError::PayloadTooLarge { len: payload.len() }.into());
        }

        let header = PacketHeader::new(msg_type, src, dst, seq, payload.len() as u16).seal();
        Ok(Self { header, payload })
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.header.flags = flags;
        self.header = self.header.seal();
        self
    }

    /// Serialize with both checksums filled in.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.header.frame_len());
        frame.extend_from_slice(&self.header.seal().to_bytes());
        frame.extend_from_slice(&self.payload);
        frame.extend_from_slice(&payload_crc32(&self.payload).to_le_bytes());
        frame
    }

    /// Validate and copy out one frame.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let header = validate_packet(buf)?;
        let payload = buf[HEADER_SIZE..HEADER_SIZE + header.payload_len as usize].to_vec();
        Ok(Self { header, payload })
    }
}
