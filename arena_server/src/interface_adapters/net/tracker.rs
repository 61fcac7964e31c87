// Tracks live websocket sessions so shutdown can wait for them to drain.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    // Next connection id handed out; ids start at 1.
    next_id: AtomicU64,
    // Number of sessions whose guard is still alive.
    active: AtomicUsize,
    idle: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<Inner>,
}

/// Held by one connection task for its whole lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    conn_id: u64,
    inner: Arc<Inner>,
}

impl ConnectionGuard {
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self) -> ConnectionGuard {
        let conn_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.active.fetch_add(1, Ordering::AcqRel);
        ConnectionGuard {
            conn_id,
            inner: self.inner.clone(),
        }
    }

    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Waits until no session is active. Returns false if `grace` ran out first.
    pub async fn wait_idle(&self, grace: Duration) -> bool {
        let wait = async {
            loop {
                let idle = self.inner.idle.notified();
                if self.active() == 0 {
                    return;
                }
                idle.await;
            }
        };
        tokio::time::timeout(grace, wait).await.is_ok()
    }
}
