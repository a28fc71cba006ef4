//! Sequential frame sinks

use crate::capture::Frame;
use crate::error::{OverlayError, Result};

/// An append-only, order-preserving frame consumer.
///
/// Frames are written in the order `write` is called; a sink never
/// reorders. `finish` flushes and closes; dropping without `finish`
/// releases the handle but may leave a truncated output.
pub trait FrameSink {
    fn write(&mut self, frame: Frame) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

impl<K: FrameSink + ?Sized> FrameSink for Box<K> {
    fn write(&mut self, frame: Frame) -> Result<()> {
        (**self).write(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

impl<K: FrameSink + ?Sized> FrameSink for &mut K {
    fn write(&mut self, frame: Frame) -> Result<()> {
        (**self).write(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Reject frames that do not match the sink's fixed resolution
pub fn check_frame_size(frame: &Frame, width: u32, height: u32) -> Result<()> {
    if frame.width() != width || frame.height() != height {
        return Err(OverlayError::FrameSizeMismatch {
            expected_width: width,
            expected_height: height,
            actual_width: frame.width(),
            actual_height: frame.height(),
        });
    }
    Ok(())
}

/// Collects frames in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<Frame>,
    size: Option<(u32, u32)>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enforce a fixed output resolution like a real encoder would
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            size: Some((width, height)),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for MemorySink {
    fn write(&mut self, frame: Frame) -> Result<()> {
        if self.finished {
            return Err(OverlayError::media("write after finish"));
        }
        if let Some((w, h)) = self.size {
            check_frame_size(&frame, w, h)?;
        }
        self.frames.push(frame);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;

    #[test]
    fn memory_sink_keeps_write_order() {
        let mut sink = MemorySink::new();
        for seq in [0, 1, 2] {
            sink.write(Frame::solid(seq, 2, 2, PixelFormat::Bgr24, [0; 3])).unwrap();
        }
        sink.finish().unwrap();
        let seqs: Vec<_> = sink.frames().iter().map(Frame::sequence).collect();
        assert_eq!(seqs, [0, 1, 2]);
        assert!(sink.write(Frame::solid(3, 2, 2, PixelFormat::Bgr24, [0; 3])).is_err());
    }

    #[test]
    fn sized_sink_rejects_other_resolutions() {
        let mut sink = MemorySink::with_size(4, 4);
        let err = sink
            .write(Frame::solid(0, 2, 2, PixelFormat::Bgr24, [0; 3]))
            .unwrap_err();
        assert!(matches!(err, OverlayError::FrameSizeMismatch { actual_width: 2, .. }));
    }
}
