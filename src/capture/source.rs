//! Sequential frame sources

use std::collections::VecDeque;

use super::frame::{Frame, VideoInfo};
use crate::error::Result;

/// A decoder that yields frames strictly in presentation order.
///
/// `Ok(None)` signals exhaustion, which is the normal end of a stream.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn info(&self) -> VideoInfo {
        (**self).info()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn info(&self) -> VideoInfo {
        (**self).info()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Frames held in memory, handed out front to back
pub struct MemorySource {
    info: VideoInfo,
    frames: VecDeque<Frame>,
}

impl MemorySource {
    pub fn new(frame_rate: f64, width: u32, height: u32, frames: Vec<Frame>) -> Self {
        Self {
            info: VideoInfo {
                frame_rate,
                frame_count: Some(frames.len() as u64),
                width,
                height,
            },
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}
