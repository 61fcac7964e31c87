// Fixed-rate tick loop driving one world.

use super::types::{SharedWorld, WorldCommand};
use crate::domain::ports::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Largest dt a single tick may integrate. Guards against host suspension.
pub const MAX_TICK_STEP: Duration = Duration::from_millis(250);

/// Measures elapsed time between consecutive tick starts.
#[derive(Debug, Clone)]
pub struct DeltaTimer {
    last: Instant,
    max_step: Duration,
}

impl DeltaTimer {
    pub fn new(start: Instant, max_step: Duration) -> Self {
        Self {
            last: start,
            max_step,
        }
    }

    /// Seconds since the previous call, capped at `max_step`.
    pub fn measure(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        if elapsed > self.max_step {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                cap_ms = self.max_step.as_millis() as u64,
                "tick stalled; capping dt"
            );
            return self.max_step.as_secs_f32();
        }
        elapsed.as_secs_f32()
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Nominal tick cadence. dt is still measured, never assumed.
    pub tick_interval: Duration,
    pub max_step: Duration,
    /// Most commands drained in one input phase.
    pub max_commands_per_tick: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs_f64(1.0 / 60.0),
            max_step: MAX_TICK_STEP,
            max_commands_per_tick: 1024,
        }
    }
}

/// Runs ticks until the shutdown flag flips or every command sender is dropped.
///
/// The shutdown flag is only observed between ticks, so a started tick always completes.
pub async fn run_world(
    world_id: Arc<str>,
    world: SharedWorld,
    mut commands: mpsc::Receiver<WorldCommand>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(settings.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut timer = DeltaTimer::new(clock.now(), settings.max_step);
    let mut batch = Vec::with_capacity(settings.max_commands_per_tick.min(64));

    info!(world_id = %world_id, tick_ms = settings.tick_interval.as_millis() as u64, "world started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = interval.tick() => {}
        }

        let mut senders_gone = false;
        while batch.len() < settings.max_commands_per_tick {
            match commands.try_recv() {
                Ok(command) => batch.push(command),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    senders_gone = true;
                    break;
                }
            }
        }

        let now = clock.now();
        let dt = timer.measure(now);
        let report = {
            let mut sim = world.write().await;
            sim.step(now, dt, batch.drain(..))
        };
        if report.events > 0 {
            debug!(world_id = %world_id, tick = report.tick, events = report.events, "tick published events");
        }

        if senders_gone {
            info!(world_id = %world_id, "all command senders dropped");
            break;
        }
    }
    info!(world_id = %world_id, "world stopped");
}
