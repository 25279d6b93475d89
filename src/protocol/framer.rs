use super::constants::*;
use super::header::PacketHeader;
use tracing::trace;

const MAGIC_BYTES: [u8; 2] = PROTO_MAGIC.to_le_bytes();

/// Extracts complete frames from an arbitrary byte stream.
///
/// Resync rule: the buffer must start with the magic and a valid header;
/// otherwise one byte is dropped and the scan retries. Complete frames are
/// handed out whole. Payload CRC is not checked here, see
/// [`validate_packet`](super::packet::validate_packet).
#[derive(Debug)]
pub struct Framer {
    buffer: Vec<u8>,
    sync_losses: u32,
    frames_found: u32,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_FRAME_SIZE),
            sync_losses: 0,
            frames_found: 0,
        }
    }

    /// Feed bytes; `on_frame` runs once per complete frame, in stream order.
    pub fn push<F>(&mut self, mut data: &[u8], mut on_frame: F)
    where
        F: FnMut(&[u8]),
    {
        while !data.is_empty() {
            let room = MAX_FRAME_SIZE - self.buffer.len();
            let take = room.min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            self.drain_frames(&mut on_frame);
            // A full buffer always yields a frame or a discard, so there is room again.
            debug_assert!(self.buffer.len() < MAX_FRAME_SIZE);
        }
    }

    /// Feed bytes and collect the frames found
    pub fn push_frames(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        self.push(data, |frame| frames.push(frame.to_vec()));
        frames
    }

    /// Bytes dropped while hunting for a frame boundary
    pub fn sync_losses(&self) -> u32 {
        self.sync_losses
    }

    pub fn frames_found(&self) -> u32 {
        self.frames_found
    }

    /// Bytes held while waiting for the rest of a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.sync_losses = 0;
        self.frames_found = 0;
    }

    fn drain_frames<F>(&mut self, on_frame: &mut F)
    where
        F: FnMut(&[u8]),
    {
        loop {
            if self.buffer.len() < MAGIC_BYTES.len() {
                return;
            }

            if self.buffer[..2] != MAGIC_BYTES {
                self.discard_one();
                continue;
            }

            if self.buffer.len() < HEADER_SIZE {
                return;
            }

            let header = match PacketHeader::parse(&self.buffer[..HEADER_SIZE]) {
                Ok(header) => header,
                Err(e) => {
                    trace!("Rejecting candidate header: {}", e);
                    self.discard_one();
                    continue;
                }
            };

            let frame_len = header.frame_len();
            if self.buffer.len() < frame_len {
                return;
            }

            on_frame(&self.buffer[..frame_len]);
            self.frames_found += 1;
            self.buffer.drain(..frame_len);
        }
    }

    fn discard_one(&mut self) {
        if !self.buffer.is_empty() {
            self.buffer.remove(0);
            self.sync_losses += 1;
        }
    }
}
