use crate::interface_adapters::net::ConnectionTracker;
use crate::use_cases::WorldRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct AppState {
    // Running worlds, created at startup or through the internal route.
    pub registry: Arc<WorldRegistry>,
    // World used when a client does not name one.
    pub default_world_id: Arc<str>,
    // Arena bounds announced in the welcome message.
    pub arena_width: f32,
    pub arena_height: f32,
    // Live websocket sessions, awaited during shutdown.
    pub connections: ConnectionTracker,
    // Flips to true once shutdown starts.
    pub shutdown: watch::Receiver<bool>,
    // Longest a closing connection waits for its writer to flush.
    pub shutdown_grace: Duration,
}
