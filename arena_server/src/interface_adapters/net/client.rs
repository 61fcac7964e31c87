use crate::domain::entities::EntityId;
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::net::outbound::{OUTBOUND_CAPACITY, OutboundQueue, WriterStats, run_writer};
use crate::interface_adapters::net::ping::{PING_INTERVAL, PingTracker};
use crate::interface_adapters::net::tracker::ConnectionGuard;
use crate::interface_adapters::net::{should_log, throttle_start};
use crate::interface_adapters::protocol::{
    ClientMessage, DecodeError, WelcomeDto, decode_client_message, encode_ping, encode_welcome, now_millis,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{DeliveryError, WorldCommand, WorldError, WorldHandle};

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use futures::stream::SplitStream;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    WorldClosed,
    OutboundClosed,
}

#[derive(Debug, serde::Deserialize)]
pub struct WorldQuery {
    // The world id the client wants to join.
    #[serde(default)]
    world_id: Option<String>,
}

enum LoopControl {
    Continue,
    Disconnect,
}

const MAX_INVALID_JSON: u32 = 10;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WorldQuery>,
) -> impl IntoResponse {
    let world_id = query
        .world_id
        .unwrap_or_else(|| state.default_world_id.to_string());

    let Some(world) = state.registry.get_world(&world_id).await else {
        // Keep not-found responses consistent with the JSON error schema.
        return error_response(StatusCode::NOT_FOUND, "world not found");
    };
    if *state.shutdown.borrow() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "server shutting down");
    }

    // Tracked from the upgrade on so shutdown waits for this session too.
    let guard = state.connections.track();
    let session = Session {
        world,
        shutdown: state.shutdown.clone(),
        arena: (state.arena_width, state.arena_height),
        drain_timeout: state.shutdown_grace,
    };
    ws.on_upgrade(move |socket| handle_socket(socket, session, guard))
}

struct Session {
    world: WorldHandle,
    shutdown: watch::Receiver<bool>,
    arena: (f32, f32),
    drain_timeout: Duration,
}

async fn handle_socket(socket: WebSocket, session: Session, guard: ConnectionGuard) {
    let conn_id = guard.conn_id();
    let span = info_span!(
        "conn",
        conn_id,
        world_id = %session.world.world_id,
        entity_id = tracing::field::Empty
    );
    run_session(socket, session, conn_id).instrument(span).await;
    drop(guard);
}

async fn run_session(socket: WebSocket, session: Session, conn_id: u64) {
    let Session {
        world,
        mut shutdown,
        arena,
        drain_timeout,
    } = session;
    let (sink, mut stream) = socket.split();
    let (mut outbound, rx) = OutboundQueue::new(conn_id, OUTBOUND_CAPACITY);
    let writer = tokio::spawn(run_writer(sink, rx));

    // addEntity: the world answers once its next input phase has spawned the player.
    let entity = match world.join().await {
        Ok(entity) => entity,
        Err(err) => {
            warn!(error = ?err, "world unavailable; closing connection");
            let _ = outbound.push_close(close_code::AGAIN, "world unavailable");
            drop(outbound);
            finish_writer(writer, drain_timeout).await;
            return;
        }
    };
    tracing::Span::current().record("entity_id", entity);
    let mut cleanup = CleanupGuard::new(world.clone(), conn_id, entity);

    if let Err(err) = bootstrap_connection(&world, &mut outbound, conn_id, entity, arena).await {
        error!(error = ?err, "failed to bootstrap connection");
        cleanup.run().await;
        let _ = outbound.push_close(close_code::ERROR, "bootstrap failed");
        drop(outbound);
        finish_writer(writer, drain_timeout).await;
        return;
    }
    info!("client connected");

    let mut ctx = ConnCtx::new(entity, world, outbound);
    let (writer_stats, shut_down) = run_client_loop(&mut stream, &mut ctx, writer, &mut shutdown).await;

    let ConnCtx {
        world,
        outbound,
        stats,
        ..
    } = ctx;
    let dropped = outbound.dropped();
    drop(outbound);

    let writer_stats = match writer_stats {
        WriterState::Finished(stats) => stats,
        WriterState::Running(writer) if shut_down => {
            // The hub is flushing its final snapshot and shutdown notice; let it land first.
            let stats = finish_writer(writer, drain_timeout).await;
            cleanup.run().await;
            stats
        }
        WriterState::Running(writer) => {
            // Unregistering makes the hub drop its queue handle, which lets the writer finish.
            cleanup.run().await;
            finish_writer(writer, drain_timeout).await
        }
    };
    cleanup.run().await;
    drop(world);

    debug!(
        msgs_in = stats.msgs_in,
        msgs_out = writer_stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = writer_stats.bytes_out,
        invalid_json = stats.invalid_json,
        unknown_types = stats.unknown_types,
        dropped,
        write_failed = writer_stats.failed,
        "connection stats"
    );
    info!("client disconnected");
}

/// Sends the welcome and subscribes the connection to world sync.
async fn bootstrap_connection(
    world: &WorldHandle,
    outbound: &mut OutboundQueue,
    conn_id: u64,
    entity: EntityId,
    (arena_width, arena_height): (f32, f32),
) -> Result<(), NetError> {
    let welcome = WelcomeDto {
        player_id: entity,
        world_id: &world.world_id,
        arena_width,
        arena_height,
    };
    let text = encode_welcome(&welcome, now_millis()).map_err(NetError::Serialization)?;
    // Queued ahead of registration so it precedes the first snapshot.
    outbound.push_text(text).map_err(|_| NetError::OutboundClosed)?;
    world
        .register(conn_id, entity, Box::new(outbound.clone()))
        .await
        .map_err(|_| NetError::WorldClosed)
}

/// Ensures `removeEntity` and hub unregistration happen exactly once per connection.
struct CleanupGuard {
    world: WorldHandle,
    conn_id: u64,
    entity: EntityId,
    done: bool,
}

impl CleanupGuard {
    fn new(world: WorldHandle, conn_id: u64, entity: EntityId) -> Self {
        Self {
            world,
            conn_id,
            entity,
            done: false,
        }
    }

    async fn run(&mut self) {
        if std::mem::replace(&mut self.done, true) {
            return;
        }
        if let Err(WorldError::Closed) = self.world.leave(self.entity).await {
            debug!("world already stopped; nothing to leave");
        }
        self.world.unregister(self.conn_id).await;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        // Reached only when the session future was cancelled mid-flight.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let world = self.world.clone();
            let (conn_id, entity) = (self.conn_id, self.entity);
            runtime.spawn(async move {
                let _ = world.leave(entity).await;
                world.unregister(conn_id).await;
            });
        }
    }
}

#[derive(Debug, Default)]
struct ConnStats {
    msgs_in: u64,
    bytes_in: u64,
    invalid_json: u32,
    unknown_types: u64,
}

struct ConnCtx {
    entity: EntityId,
    world: WorldHandle,
    // Connection-owned handle on the outbound queue (pings, close frames).
    outbound: OutboundQueue,
    ping: PingTracker,
    stats: ConnStats,
    // Consecutive undecodable frames; reset by any valid frame.
    invalid_streak: u32,

    last_world_full_log: Instant,
    last_invalid_input_log: Instant,
    last_ping_full_log: Instant,

    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new(entity: EntityId, world: WorldHandle, outbound: OutboundQueue) -> Self {
        let now = throttle_start();
        Self {
            entity,
            world,
            outbound,
            ping: PingTracker::default(),
            stats: ConnStats::default(),
            invalid_streak: 0,
            last_world_full_log: now,
            last_invalid_input_log: now,
            last_ping_full_log: now,
            close_frame: None,
        }
    }

    fn send_command(&mut self, command: WorldCommand) -> Result<LoopControl, NetError> {
        match self.world.try_command(command) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(WorldError::Busy) => {
                if should_log(&mut self.last_world_full_log) {
                    warn!(entity_id = self.entity, "world command queue full; dropping input");
                }
                Ok(LoopControl::Continue)
            }
            Err(WorldError::Closed) => Err(NetError::WorldClosed),
        }
    }

    fn handle_text(&mut self, text: &str) -> Result<LoopControl, NetError> {
        self.stats.msgs_in += 1;
        self.stats.bytes_in += text.len() as u64;

        match decode_client_message(text) {
            Ok(Some(message)) => {
                self.invalid_streak = 0;
                self.handle_message(message)
            }
            Ok(None) => {
                self.invalid_streak = 0;
                self.stats.unknown_types += 1;
                Ok(LoopControl::Continue)
            }
            Err(err) => self.handle_invalid(text.len(), err),
        }
    }

    fn handle_message(&mut self, message: ClientMessage) -> Result<LoopControl, NetError> {
        if let ClientMessage::Pong { server_time } = message {
            if let Some(rtt) = self.ping.record_echo(server_time, now_millis()) {
                return self.send_command(WorldCommand::ReportRtt {
                    entity: self.entity,
                    rtt,
                });
            }
            return Ok(LoopControl::Continue);
        }
        match message.into_command(self.entity) {
            Some(command) => self.send_command(command),
            None => Ok(LoopControl::Continue),
        }
    }

    fn handle_invalid(&mut self, bytes: usize, err: DecodeError) -> Result<LoopControl, NetError> {
        self.stats.invalid_json += 1;
        self.invalid_streak += 1;
        if should_log(&mut self.last_invalid_input_log) {
            warn!(entity_id = self.entity, bytes, error = %err, "failed to parse client message");
        }
        if self.invalid_streak > MAX_INVALID_JSON {
            self.close_frame = Some(CloseFrame {
                code: close_code::POLICY,
                reason: "too many invalid messages".into(),
            });
            return Ok(LoopControl::Disconnect);
        }
        Ok(LoopControl::Continue)
    }

    fn handle_incoming(&mut self, incoming: Option<Result<Message, axum::Error>>) -> Result<LoopControl, NetError> {
        match incoming {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => self.handle_text(text.as_str()),
                Message::Binary(_) => {
                    self.close_frame = Some(CloseFrame {
                        code: close_code::UNSUPPORTED,
                        reason: "binary messages not supported".into(),
                    });
                    Ok(LoopControl::Disconnect)
                }
                Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
                Message::Close(_) => Ok(LoopControl::Disconnect),
            },
            Some(Err(e)) => {
                warn!(entity_id = self.entity, error = %e, "websocket recv error");
                Ok(LoopControl::Disconnect)
            }
            None => {
                info!(entity_id = self.entity, "websocket closed");
                Ok(LoopControl::Disconnect)
            }
        }
    }

    fn send_ping(&mut self) -> Result<LoopControl, NetError> {
        let text = encode_ping(now_millis()).map_err(NetError::Serialization)?;
        match self.outbound.push_text(text) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(DeliveryError::Full) => {
                if should_log(&mut self.last_ping_full_log) {
                    debug!(entity_id = self.entity, "outbound queue full; ping skipped");
                }
                Ok(LoopControl::Continue)
            }
            Err(DeliveryError::Closed) => Err(NetError::OutboundClosed),
        }
    }
}

enum WriterState {
    Running(JoinHandle<WriterStats>),
    Finished(WriterStats),
}

/// Runs until the client goes away, the writer stops or shutdown begins.
/// Returns the writer state and whether the loop ended because of shutdown.
async fn run_client_loop(
    stream: &mut SplitStream<WebSocket>,
    ctx: &mut ConnCtx,
    mut writer: JoinHandle<WriterStats>,
    shutdown: &mut watch::Receiver<bool>,
) -> (WriterState, bool) {
    let start = tokio::time::Instant::now() + PING_INTERVAL;
    let mut ping = tokio::time::interval_at(start, PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut fatal: Option<NetError> = None;
    let mut writer_result: Option<WriterStats> = None;
    let mut shut_down = *shutdown.borrow();

    while !shut_down {
        let control = tokio::select! {
            // Incoming Message from Client
            incoming = stream.next() => ctx.handle_incoming(incoming),

            _ = ping.tick() => ctx.send_ping(),

            // Writer ended on its own: the socket is no longer writable.
            result = &mut writer => {
                let stats = result.unwrap_or_else(|err| {
                    error!(error = %err, "writer task failed");
                    WriterStats { failed: true, ..WriterStats::default() }
                });
                writer_result = Some(stats);
                Ok(LoopControl::Disconnect)
            }

            changed = shutdown.changed() => {
                shut_down = changed.is_err() || *shutdown.borrow();
                Ok(if shut_down { LoopControl::Disconnect } else { LoopControl::Continue })
            }
        };

        match control {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Disconnect) => break,
            Err(e) => {
                fatal = Some(e);
                break;
            }
        }
    }

    if let Some(err) = fatal {
        warn!(error = ?err, "client loop exited with error");
    }
    if let Some(stats) = writer_result {
        return (WriterState::Finished(stats), shut_down);
    }
    if !shut_down && let Some(frame) = ctx.close_frame.take() {
        let _ = ctx.outbound.push(Message::Close(Some(frame)));
    }
    (WriterState::Running(writer), shut_down)
}

async fn finish_writer(mut writer: JoinHandle<WriterStats>, timeout: Duration) -> WriterStats {
    match tokio::time::timeout(timeout, &mut writer).await {
        Ok(Ok(stats)) => stats,
        Ok(Err(err)) => {
            error!(error = %err, "writer task failed");
            WriterStats::default()
        }
        Err(_) => {
            warn!("writer did not drain in time; aborting");
            writer.abort();
            WriterStats::default()
        }
    }
}
