//! Broadcast channel boundary
//!
//! The core never talks to a transport directly; it publishes through this
//! trait. Delivery is fire-and-forget with no retained history, so observers
//! that connect late reconcile through the pull queries in `http::routes`.

use tokio::sync::broadcast;

use crate::ws::protocol::ServerMsg;

/// Broadcast capacity before slow receivers start lagging
const CHANNEL_CAPACITY: usize = 256;

/// One-way, at-most-once delivery to all currently connected observers
pub trait Broadcast: Send + Sync {
    fn publish(&self, msg: ServerMsg);
}

/// Production implementation over a tokio broadcast channel
///
/// WebSocket sessions subscribe via [`TokioBroadcast::subscribe`]. A send
/// with no receivers is not an error; there is simply nobody watching.
pub struct TokioBroadcast {
    tx: broadcast::Sender<ServerMsg>,
}

impl TokioBroadcast {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.tx.subscribe()
    }
}

impl Default for TokioBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcast for TokioBroadcast {
    fn publish(&self, msg: ServerMsg) {
        let _ = self.tx.send(msg);
    }
}

/// In-memory recorder standing in for the transport in tests
#[cfg(test)]
pub struct RecordingBroadcast {
    events: parking_lot::Mutex<Vec<ServerMsg>>,
}

#[cfg(test)]
impl RecordingBroadcast {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            events: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<ServerMsg> {
        self.events.lock().clone()
    }

    pub fn count_matching(&self, pred: impl Fn(&ServerMsg) -> bool) -> usize {
        self.events.lock().iter().filter(|m| pred(m)).count()
    }
}

#[cfg(test)]
impl Broadcast for RecordingBroadcast {
    fn publish(&self, msg: ServerMsg) {
        self.events.lock().push(msg);
    }
}
