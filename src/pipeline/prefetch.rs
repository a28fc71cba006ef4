//! Decode-ahead on a dedicated thread
//!
//! The decoder runs ahead of rendering by at most `depth` frames. A single
//! FIFO channel carries frames, so consumption order is decode order.

use std::thread::JoinHandle;

use flume::{Receiver, RecvError};
use tracing::{debug, info, warn};

use crate::capture::{Frame, FrameSource, VideoInfo};
use crate::error::{OverlayError, Result};

pub struct PrefetchSource {
    info: VideoInfo,
    rx: Option<Receiver<Result<Frame>>>,
    worker: Option<JoinHandle<()>>,
}

impl PrefetchSource {
    /// Move `source` onto a decoder thread feeding a bounded queue
    pub fn spawn<S>(mut source: S, depth: usize) -> Result<Self>
    where
        S: FrameSource + Send + 'static,
    {
        let info = source.info();
        let (tx, rx) = flume::bounded(depth.max(1));

        let worker = std::thread::Builder::new()
            .name("vidmark-decode".into())
            .spawn(move || {
                let mut decoded = 0u64;
                loop {
                    match source.next_frame() {
                        Ok(Some(frame)) => {
                            if tx.send(Ok(frame)).is_err() {
                                debug!("Consumer hung up after {} frames", decoded);
                                break;
                            }
                            decoded += 1;
                        }
                        Ok(None) => {
                            debug!("Decoder exhausted after {} frames", decoded);
                            break;
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            })?;

        info!("Decode-ahead started (depth {})", depth.max(1));
        Ok(Self {
            info,
            rx: Some(rx),
            worker: Some(worker),
        })
    }

    fn join_worker(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| OverlayError::media("decoder thread panicked")),
            None => Ok(()),
        }
    }
}

impl FrameSource for PrefetchSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(rx) = self.rx.as_ref() else {
            return Ok(None);
        };
        match rx.recv() {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => Err(e),
            Err(RecvError::Disconnected) => {
                self.rx = None;
                self.join_worker()?;
                Ok(None)
            }
        }
    }
}

impl Drop for PrefetchSource {
    fn drop(&mut self) {
        // Closing the channel first unblocks a decoder waiting on a full queue
        self.rx = None;
        if let Err(e) = self.join_worker() {
            warn!("Decode-ahead shutdown: {}", e);
        }
    }
}
