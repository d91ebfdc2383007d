//! Bounded hand-off of captured frames to the pipeline worker.
//!
//! Capture must never wait on processing, so the sender discards frames
//! when the queue is full and the receiver skips straight to the newest
//! queued frame.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use crate::frame::RawFrame;

/// Frame counters shared by both ends of a feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Frames accepted into the queue.
    pub accepted: usize,
    /// Frames discarded by the sender because the queue was full.
    pub dropped: usize,
    /// Queued frames the receiver skipped in favour of a newer one.
    pub superseded: usize,
}

#[derive(Debug, Default)]
struct FeedCounters {
    accepted: AtomicUsize,
    dropped: AtomicUsize,
    superseded: AtomicUsize,
}

impl FeedCounters {
    fn snapshot(&self) -> FeedStats {
        FeedStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
        }
    }
}

/// Result of offering a frame to the feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    /// The queue was full; the frame was discarded.
    Dropped,
    /// The receiver is gone.
    Closed,
}

/// Capture-side end of a frame feed.
#[derive(Clone)]
pub struct FrameSender {
    tx: SyncSender<RawFrame>,
    counters: Arc<FeedCounters>,
}

/// Pipeline-side end of a frame feed.
pub struct FrameReceiver {
    rx: Receiver<RawFrame>,
    counters: Arc<FeedCounters>,
}

/// Create a feed holding at most `capacity` pending frames (minimum 1).
pub fn frame_channel(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let counters = Arc::new(FeedCounters::default());
    (
        FrameSender {
            tx,
            counters: Arc::clone(&counters),
        },
        FrameReceiver { rx, counters },
    )
}

impl FrameSender {
    /// Queue `frame` without blocking.
    pub fn offer(&self, frame: RawFrame) -> Offer {
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                Offer::Accepted
            }
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Offer::Dropped
            }
            Err(TrySendError::Disconnected(_)) => Offer::Closed,
        }
    }

    pub fn stats(&self) -> FeedStats {
        self.counters.snapshot()
    }
}

impl FrameReceiver {
    /// Block for the next frame, then drain the queue and return the newest.
    ///
    /// Returns `None` once every sender is dropped and the queue is empty.
    pub fn recv_latest(&self) -> Option<RawFrame> {
        let mut latest = self.rx.recv().ok()?;
        while let Ok(newer) = self.rx.try_recv() {
            self.counters.superseded.fetch_add(1, Ordering::Relaxed);
            latest = newer;
        }
        Some(latest)
    }

    pub fn stats(&self) -> FeedStats {
        self.counters.snapshot()
    }
}
