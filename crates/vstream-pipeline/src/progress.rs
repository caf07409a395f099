//! In-process fan-out of record snapshots.

use tokio::sync::broadcast;
use tracing::{debug, warn};
use vstream_models::VideoRecord;

/// Publish/subscribe hub for pipeline snapshots.
///
/// Cloning yields another handle to the same hub. Publishing never waits on
/// subscribers: a subscriber that falls more than the buffer size behind
/// skips the snapshots it missed.
#[derive(Debug, Clone)]
pub struct ProgressBroadcaster {
    tx: broadcast::Sender<VideoRecord>,
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send a snapshot to every current subscriber.
    ///
    /// Returns how many subscribers it reached; zero is not an error.
    pub fn publish(&self, record: VideoRecord) -> usize {
        match self.tx.send(record) {
            Ok(n) => n,
            Err(broadcast::error::SendError(record)) => {
                debug!(video_id = %record.id, "No progress subscribers");
                0
            }
        }
    }

    /// Subscribe to snapshots published from now on.
    pub fn subscribe(&self) -> ProgressSubscription {
        ProgressSubscription {
            rx: self.tx.subscribe(),
            skipped: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Receiving side of a [`ProgressBroadcaster`].
#[derive(Debug)]
pub struct ProgressSubscription {
    rx: broadcast::Receiver<VideoRecord>,
    skipped: u64,
}

impl ProgressSubscription {
    /// Next snapshot, in publish order. `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<VideoRecord> {
        loop {
            match self.rx.recv().await {
                Ok(record) => return Some(record),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.skipped += n;
                    warn!(skipped = n, "Progress subscriber lagged, snapshots dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Snapshot if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<VideoRecord> {
        loop {
            match self.rx.try_recv() {
                Ok(record) => return Some(record),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    self.skipped += n;
                    warn!(skipped = n, "Progress subscriber lagged, snapshots dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Total snapshots this subscriber missed by lagging.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
