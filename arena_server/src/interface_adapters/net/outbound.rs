// Bounded per-connection outbound queue and the task draining it into the socket.

use super::{should_log, throttle_start};
use crate::interface_adapters::protocol::{encode_outgoing, now_millis};
use crate::use_cases::{DeliveryError, Outbox, Outgoing};

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::SinkExt;
use futures::stream::SplitSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub const OUTBOUND_CAPACITY: usize = 256;

/// Sending half of a connection's outbound queue. Never blocks: a full queue drops.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    conn_id: u64,
    tx: mpsc::Sender<Message>,
    // Shared with the connection so its stats include drops made on behalf of the hub.
    dropped: Arc<AtomicU64>,
    last_full_log: Instant,
}

impl OutboundQueue {
    pub fn new(conn_id: u64, capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        let queue = Self {
            conn_id,
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            last_full_log: throttle_start(),
        };
        (queue, rx)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn push(&mut self, message: Message) -> Result<(), DeliveryError> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if should_log(&mut self.last_full_log) {
                    warn!(conn_id = self.conn_id, dropped, "outbound queue full; dropping message");
                }
                Err(DeliveryError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeliveryError::Closed),
        }
    }

    pub fn push_text(&mut self, text: String) -> Result<(), DeliveryError> {
        self.push(Message::Text(text.into()))
    }

    pub fn push_close(&mut self, code: u16, reason: &'static str) -> Result<(), DeliveryError> {
        self.push(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
    }
}

impl Outbox for OutboundQueue {
    fn deliver(&mut self, item: Outgoing<'_>) -> Result<(), DeliveryError> {
        let text = match encode_outgoing(item, now_millis()) {
            Ok(text) => text,
            Err(err) => {
                // Reported as a drop so sync baselines stay where the client is.
                error!(conn_id = self.conn_id, error = %err, "failed to encode outbound message");
                return Err(DeliveryError::Full);
            }
        };
        self.push_text(text)?;
        if let Outgoing::Shutdown = item {
            self.push_close(close_code::AWAY, "server shutting down")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WriterStats {
    pub msgs_out: u64,
    pub bytes_out: u64,
    /// The socket rejected a write.
    pub failed: bool,
}

/// Drains the queue into the socket until a close frame is sent, every sender is gone,
/// or a write fails.
pub async fn run_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
) -> WriterStats {
    let mut stats = WriterStats::default();
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        let bytes = match &message {
            Message::Text(text) => text.len() as u64,
            _ => 0,
        };
        if let Err(err) = sink.send(message).await {
            debug!(error = %err, "websocket write failed");
            stats.failed = true;
            return stats;
        }
        stats.msgs_out += 1;
        stats.bytes_out += bytes;
        if closing {
            return stats;
        }
    }
    if let Err(err) = sink.close().await {
        debug!(error = %err, "socket close error");
    }
    stats
}
