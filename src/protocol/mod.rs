//! Brain <-> Spine message contract v0.2.
//!
//! Pure codec: wire constants, checksums, header parsing, packet
//! validation and a resynchronising stream framer. Nothing here touches a
//! device or a clock.

pub mod constants;
pub mod crc;
pub mod framer;
pub mod harness;
pub mod header;
pub mod packet;

pub use constants::{MessageType, NodeId, SpineState};
pub use framer::Framer;
pub use harness::{inspect_stream, run_harness, FrameReport, HarnessStats};
pub use header::{HeaderError, PacketHeader};
pub use packet::{validate_packet, Packet, PacketError};
