use super::constants::*;
use super::crc::header_crc16;
use serde::Serialize;
use thiserror::Error;

/// Decoded packet header. Not a wire struct: fields are read explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketHeader {
    pub magic: u16,
    pub proto_major: u8,
    pub proto_minor: u8,
    pub msg_type: u8,
    pub flags: u8,
    pub src: u8,
    pub dst: u8,
    pub seq: u16,
    pub payload_len: u16,
    pub header_crc16: u16,
}

/// Header validation failures, reported in check order
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    #[error("buffer too small for a header: {len} bytes")]
    BufferTooSmall { len: usize },

    #[error("magic mismatch: found 0x{found:04x}")]
    MagicMismatch { found: u16 },

    #[error("unsupported protocol version {major}.{minor}")]
    VersionMismatch { major: u8, minor: u8 },

    #[error("payload length {len} exceeds the {max} byte cap", max = MAX_PAYLOAD_SIZE)]
    PayloadTooLarge { len: usize },

    #[error("header CRC mismatch: carried 0x{carried:04x}, computed 0x{computed:04x}")]
    CrcMismatch { carried: u16, computed: u16 },
}

fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

impl PacketHeader {
    /// Header for the current protocol version with a zero CRC; see [`seal`](Self::seal).
    pub fn new(msg_type: u8, src: u8, dst: u8, seq: u16, payload_len: u16) -> Self {
        Self {
            magic: PROTO_MAGIC,
            proto_major: PROTO_VERSION_MAJOR,
            proto_minor: PROTO_VERSION_MINOR,
            msg_type,
            flags: 0,
            src,
            dst,
            seq,
            payload_len,
            header_crc16: 0,
        }
    }

    /// Read the fields without validating them.
    pub fn decode(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < HEADER_SIZE {
            return Err(HeaderError::BufferTooSmall { len: buf.len() });
        }

        Ok(Self {
            magic: read_u16_le(buf, OFFSET_MAGIC),
            proto_major: buf[OFFSET_PROTO_MAJOR],
            proto_minor: buf[OFFSET_PROTO_MINOR],
            msg_type: buf[OFFSET_MSG_TYPE],
            flags: buf[OFFSET_FLAGS],
            src: buf[OFFSET_SRC],
            dst: buf[OFFSET_DST],
            seq: read_u16_le(buf, OFFSET_SEQ),
            payload_len: read_u16_le(buf, OFFSET_PAYLOAD_LEN),
            header_crc16: read_u16_le(buf, OFFSET_HEADER_CRC16),
        })
    }

    /// Decode and validate: magic, exact version, payload cap, then CRC16.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        let header = Self::decode(buf)?;

        if header.magic != PROTO_MAGIC {
            return Err(HeaderError::MagicMismatch {
                found: header.magic,
            });
        }

        if header.proto_major != PROTO_VERSION_MAJOR || header.proto_minor != PROTO_VERSION_MINOR {
            return Err(HeaderError::VersionMismatch {
                major: header.proto_major,
                minor: header.proto_minor,
            });
        }

        if header.payload_len as usize > MAX_PAYLOAD_SIZE {
            return Err(HeaderError::PayloadTooLarge {
                len: header.payload_len as usize,
            });
        }

        let computed = header.compute_crc();
        if computed != header.header_crc16 {
            return Err(HeaderError::CrcMismatch {
                carried: header.header_crc16,
                computed,
            });
        }

        Ok(header)
    }

    /// Serialize, carrying whatever CRC value the header holds.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[OFFSET_MAGIC..OFFSET_MAGIC + 2].copy_from_slice(&self.magic.to_le_bytes());
        buf[OFFSET_PROTO_MAJOR] = self.proto_major;
        buf[OFFSET_PROTO_MINOR] = self.proto_minor;
        buf[OFFSET_MSG_TYPE] = self.msg_type;
        buf[OFFSET_FLAGS] = self.flags;
        buf[OFFSET_SRC] = self.src;
        buf[OFFSET_DST] = self.dst;
        buf[OFFSET_SEQ..OFFSET_SEQ + 2].copy_from_slice(&self.seq.to_le_bytes());
        buf[OFFSET_PAYLOAD_LEN..OFFSET_PAYLOAD_LEN + 2].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[OFFSET_HEADER_CRC16..OFFSET_HEADER_CRC16 + 2].copy_from_slice(&self.header_crc16.to_le_bytes());
        buf
    }

    /// CRC16 over the serialized header with the CRC field zeroed
    pub fn compute_crc(&self) -> u16 {
        let mut scratch = self.to_bytes();
        scratch[OFFSET_HEADER_CRC16] = 0;
        scratch[OFFSET_HEADER_CRC16 + 1] = 0;
        header_crc16(&scratch)
    }

    /// Return a copy with a correct CRC field
    pub fn seal(mut self) -> Self {
        self.header_crc16 = self.compute_crc();
        self
    }

    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.msg_type).ok()
    }

    /// Total frame length announced by this header
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_len as usize + TRAILER_SIZE
    }
}
