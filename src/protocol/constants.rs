use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Protocol magic, mnemonic "S2". Little-endian on the wire: `32 53`.
pub const PROTO_MAGIC: u16 = 0x5332;
pub const PROTO_VERSION_MAJOR: u8 = 0;
pub const PROTO_VERSION_MINOR: u8 = 2;

pub const HEADER_SIZE: usize = 14;
pub const TRAILER_SIZE: usize = 4;
pub const MIN_PACKET_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;
/// Transport safety cap, not a semantic limit of the contract.
pub const MAX_PAYLOAD_SIZE: usize = 256;
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + TRAILER_SIZE;

// Header field offsets
pub const OFFSET_MAGIC: usize = 0;
pub const OFFSET_PROTO_MAJOR: usize = 2;
pub const OFFSET_PROTO_MINOR: usize = 3;
pub const OFFSET_MSG_TYPE: usize = 4;
pub const OFFSET_FLAGS: usize = 5;
pub const OFFSET_SRC: usize = 6;
pub const OFFSET_DST: usize = 7;
pub const OFFSET_SEQ: usize = 8;
pub const OFFSET_PAYLOAD_LEN: usize = 10;
pub const OFFSET_HEADER_CRC16: usize = 12;

const _: () = assert!(HEADER_SIZE == 14);
const _: () = assert!(TRAILER_SIZE == 4);
const _: () = assert!(OFFSET_HEADER_CRC16 + 2 == HEADER_SIZE);

/// Node identifiers carried in `src` / `dst`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum NodeId {
    Brain = 0x00,
    Spine = 0x01,
}

impl TryFrom<u8> for NodeId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(NodeId::Brain),
            0x01 => Ok(NodeId::Spine),
            other => Err(other),
        }
    }
}

/// Message type ids. Brain -> Spine live in 0x10..=0x2F, Spine -> Brain in 0x80..=0x9F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum MessageType {
    Hello = 0x10,
    BrainHeartbeat = 0x11,
    MotionEnable = 0x12,
    MotionSetpoint = 0x13,
    Identity = 0x80,
    SpineHeartbeat = 0x81,
    StateReport = 0x82,
    Ack = 0x83,
    Fault = 0x84,
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::Hello,
        MessageType::BrainHeartbeat,
        MessageType::MotionEnable,
        MessageType::MotionSetpoint,
        MessageType::Identity,
        MessageType::SpineHeartbeat,
        MessageType::StateReport,
        MessageType::Ack,
        MessageType::Fault,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::Hello => "b2s-hello",
            MessageType::BrainHeartbeat => "b2s-heartbeat",
            MessageType::MotionEnable => "b2s-motion-enable",
            MessageType::MotionSetpoint => "b2s-motion-setpoint",
            MessageType::Identity => "s2b-identity",
            MessageType::SpineHeartbeat => "s2b-heartbeat",
            MessageType::StateReport => "s2b-state-report",
            MessageType::Ack => "s2b-ack",
            MessageType::Fault => "s2b-fault",
        }
    }

    /// Natural sender of this message
    pub fn source(self) -> NodeId {
        if self.id() < 0x80 {
            NodeId::Brain
        } else {
            NodeId::Spine
        }
    }

    pub fn destination(self) -> NodeId {
        match self.source() {
            NodeId::Brain => NodeId::Spine,
            NodeId::Spine => NodeId::Brain,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MessageType::ALL
            .into_iter()
            .find(|kind| kind.id() == value)
            .ok_or(value)
    }
}

impl FromStr for MessageType {
    type Err = String;

    /// Accepts a name (`b2s-hello`) or an id (`0x10`, `16`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();

        if let Some(kind) = MessageType::ALL.into_iter().find(|kind| kind.name() == wanted) {
            return Ok(kind);
        }

        let id = match wanted.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => wanted.parse::<u8>(),
        }
        .map_err(|_| format!("unknown message type '{}'", s))?;

        MessageType::try_from(id).map_err(|id| format!("unknown message type id 0x{:02x}", id))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.id())
    }
}

/// Spine state machine values reported in state reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SpineState {
    Init = 0x00,
    Safe = 0x01,
    Enabled = 0x02,
    Fault = 0x03,
}

impl TryFrom<u8> for SpineState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(SpineState::Init),
            0x01 => Ok(SpineState::Safe),
            0x02 => Ok(SpineState::Enabled),
            0x03 => Ok(SpineState::Fault),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_wire_bytes() {
        assert_eq!(PROTO_MAGIC.to_le_bytes(), [0x32, 0x53]);
        assert_eq!(MAX_FRAME_SIZE, 274);
    }

    #[test]
    fn test_message_type_parsing() {
        assert_eq!("b2s-hello".parse::<MessageType>(), Ok(MessageType::Hello));
        assert_eq!("S2B-ACK".parse::<MessageType>(), Ok(MessageType::Ack));
        assert_eq!("0x82".parse::<MessageType>(), Ok(MessageType::StateReport));
        assert_eq!("17".parse::<MessageType>(), Ok(MessageType::BrainHeartbeat));
        assert!("0x20".parse::<MessageType>().is_err());
        assert!("bogus".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_message_direction() {
        assert_eq!(MessageType::MotionSetpoint.source(), NodeId::Brain);
        assert_eq!(MessageType::MotionSetpoint.destination(), NodeId::Spine);
        assert_eq!(MessageType::Fault.source(), NodeId::Spine);
    }

    #[test]
    fn test_spine_state_ids() {
        assert_eq!(SpineState::try_from(2), Ok(SpineState::Enabled));
        assert_eq!(SpineState::try_from(9), Err(9));
        assert_eq!(NodeId::try_from(1), Ok(NodeId::Spine));
    }
}
