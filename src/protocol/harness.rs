use super::framer::Framer;
use super::header::PacketHeader;
use super::packet::validate_packet;
use serde::Serialize;

/// Counters from running a byte stream through the framer and validator
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HarnessStats {
    pub frames_extracted: u32,
    pub packets_valid: u32,
    pub packets_invalid: u32,
    pub sync_losses: u32,
}

/// What the validator said about one extracted frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub index: usize,
    pub length: usize,
    pub msg_type: u8,
    pub msg_name: Option<&'static str>,
    pub src: u8,
    pub dst: u8,
    pub seq: u16,
    pub payload_len: u16,
    pub valid: bool,
    pub error: Option<String>,
}

impl FrameReport {
    fn new(index: usize, frame: &[u8]) -> Self {
        // The framer only emits frames whose header already parsed.
        let header = PacketHeader::decode(frame).ok();
        let validation = validate_packet(frame);

        Self {
            index,
            length: frame.len(),
            msg_type: header.map(|h| h.msg_type).unwrap_or_default(),
            msg_name: header.and_then(|h| h.message_type()).map(|kind| kind.name()),
            src: header.map(|h| h.src).unwrap_or_default(),
            dst: header.map(|h| h.dst).unwrap_or_default(),
            seq: header.map(|h| h.seq).unwrap_or_default(),
            payload_len: header.map(|h| h.payload_len).unwrap_or_default(),
            valid: validation.is_ok(),
            error: validation.err().map(|e| e.to_string()),
        }
    }
}

/// Frame and validate `input` in one pass, keeping per-frame detail.
pub fn inspect_stream(input: &[u8]) -> (HarnessStats, Vec<FrameReport>) {
    let mut framer = Framer::new();
    let mut reports = Vec::new();

    framer.push(input, |frame| {
        reports.push(FrameReport::new(reports.len(), frame));
    });

    let mut stats = HarnessStats {
        frames_extracted: framer.frames_found(),
        sync_losses: framer.sync_losses(),
        ..HarnessStats::default()
    };
    for report in &reports {
        if report.valid {
            stats.packets_valid += 1;
        } else {
            stats.packets_invalid += 1;
        }
    }

    (stats, reports)
}

/// Frame and validate `input`, returning only the counters.
pub fn run_harness(input: &[u8]) -> HarnessStats {
    inspect_stream(input).0
}
