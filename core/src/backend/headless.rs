use alloc::collections::VecDeque;
use log::trace;
use crate::backend::DisplayBackend;
use crate::error::DisplayError;
use crate::input::PlatformEvent;
use crate::pixel_format::TextureFormat;
use crate::surface::OffscreenBuffer;

/// A display that draws into memory and never shows anything. Events are
/// whatever was pushed into its queue.
#[derive(Debug)]
pub struct HeadlessBackend {
    format: TextureFormat,
    events: VecDeque<PlatformEvent>,
    frames_presented: u64,
    last_frame_checksum: u32,
}

impl HeadlessBackend {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            events: VecDeque::new(),
            frames_presented: 0,
            last_frame_checksum: 0,
        }
    }

    pub fn push_event(&mut self, event: PlatformEvent) {
        self.events.push_back(event);
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// CRC-32 of the pixels of the last presented frame.
    pub fn last_frame_checksum(&self) -> u32 {
        self.last_frame_checksum
    }
}

impl DisplayBackend for HeadlessBackend {
    fn texture_format(&self) -> Result<TextureFormat, DisplayError> {
        Ok(self.format)
    }

    fn present(&mut self, frame: &OffscreenBuffer) -> Result<(), DisplayError> {
        self.frames_presented += 1;
        self.last_frame_checksum = crc32fast::hash(frame.pixels());
        trace!("frame {} presented, checksum {:08x}", self.frames_presented, self.last_frame_checksum);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.events.pop_front()
    }
}
