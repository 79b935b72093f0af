use bytes::{Bytes, BytesMut};
use tracing::{trace, warn};

use crate::core::{ClientSlot, FRAME_HEADER_LEN, NOTIFICATION_STATUS};

/// Accumulates notification chunks into complete length-delimited frames
///
/// Frames addressed to the configured slot start with `0x40 + slot, 0x01,
/// length`. Chunks that do not open such a frame are dropped while no frame
/// is in progress. Only one frame is assembled at a time; the serialized
/// channel keeps a second exchange from interleaving.
#[derive(Debug)]
pub struct FrameReassembler {
    slot: ClientSlot,
    /// Bytes of the frame in progress, if one is open
    buffer: Option<BytesMut>,
}

impl FrameReassembler {
    /// Creates a reassembler for frames addressed to `slot`
    pub fn new(slot: ClientSlot) -> Self {
        FrameReassembler { slot, buffer: None }
    }

    pub fn slot(&self) -> ClientSlot {
        self.slot
    }

    /// Whether a frame is partially accumulated
    pub fn in_progress(&self) -> bool {
        self.buffer.is_some()
    }

    /// Feeds one transport chunk, returning a frame once it is complete
    pub fn accumulate(&mut self, chunk: &[u8]) -> Option<Bytes> {
        if self.buffer.is_none() {
            if !self.opens_frame(chunk) {
                warn!(
                    slot = self.slot.get(),
                    chunk = ?chunk,
                    "dropping chunk that does not open a frame for this client"
                );
                return None;
            }
            self.buffer = Some(BytesMut::with_capacity(chunk.len()));
        }
        let buffer = self.buffer.as_mut()?;
        buffer.extend_from_slice(chunk);

        // opens_frame guarantees the length byte is present.
        let expected = buffer[2] as usize + FRAME_HEADER_LEN;
        if buffer.len() < expected {
            trace!(have = buffer.len(), expected, "partial frame");
            return None;
        }

        let mut frame = self.buffer.take()?;
        if frame.len() > expected {
            warn!(extra = frame.len() - expected, "discarding bytes past declared frame length");
            frame.truncate(expected);
        }
        Some(frame.freeze())
    }

    /// Drops any partially accumulated frame
    pub fn reset(&mut self) {
        self.buffer = None;
    }

    fn opens_frame(&self, chunk: &[u8]) -> bool {
        chunk.len() >= FRAME_HEADER_LEN
            && chunk[0] == self.slot.notification_marker()
            && chunk[1] == NOTIFICATION_STATUS
    }
}
