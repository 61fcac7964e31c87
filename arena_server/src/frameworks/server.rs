// Framework bootstrap for the arena server runtime.

use crate::domain::events::EventSink;
use crate::domain::ports::SystemClock;
use crate::domain::tuning::{Tuning, WeaponTable};
use crate::frameworks::config::{self, ServerConfig};
use crate::interface_adapters::content::{ContentLoadError, load_weapon_table};
use crate::interface_adapters::net::{ConnectionTracker, create_world_handler, world_status_handler, ws_handler};
use crate::interface_adapters::sink::BroadcastSink;
use crate::interface_adapters::state::AppState;
use crate::use_cases::hub::HubSettings;
use crate::use_cases::scheduler::SchedulerSettings;
use crate::use_cases::world_registry::SinkFactory;
use crate::use_cases::{RegistryError, SimulationConfig, SyncSettings, WorldRegistry, WorldSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::watch;

/// Fatal problems that stop the server before it accepts connections.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Content(#[from] ContentLoadError),
    #[error("failed to create world {world_id}: {reason:?}")]
    World { world_id: String, reason: RegistryError },
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Serves on `listener` with configuration from the environment until ctrl-c.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    run_until(listener, ServerConfig::from_env(), shutdown_signal()).await
}

/// Serves until `shutdown` resolves, then drains connections and worlds.
pub async fn run_until<F>(listener: tokio::net::TcpListener, config: ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    // build state
    let state = build_state(&config, shutdown_rx).await.map_err(|e| {
        tracing::error!(error = %e, "startup failed");
        std::io::Error::other(e)
    })?;
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/worlds", post(create_world_handler))
        .route("/worlds/{world_id}", get(world_status_handler))
        .with_state(state.clone());

    tracing::info!(
        %address,
        tick_rate_hz = config.tick_rate_hz,
        kill_target = config.match_rules.kill_target,
        "listening"
    );

    // Serve app and report errors rather than panicking
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        });

    if !state.connections.wait_idle(config.shutdown_grace).await {
        tracing::warn!(
            remaining = state.connections.active(),
            "connections still open after grace period"
        );
    }
    state.registry.wait_stopped(config.shutdown_grace).await;
    tracing::info!("server stopped");
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();
    let config = ServerConfig::from_env();

    let address = SocketAddr::new(config.bind_addr, config.port);

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run_until(listener, config, shutdown_signal()).await
}

fn load_weapons(config: &ServerConfig) -> std::result::Result<WeaponTable, StartupError> {
    match &config.weapon_config_path {
        Some(path) => {
            let table = load_weapon_table(path)?;
            tracing::info!(path = %path.display(), "weapon table loaded");
            Ok(table)
        }
        None => Ok(WeaponTable::default()),
    }
}

async fn build_state(
    config: &ServerConfig,
    shutdown: watch::Receiver<bool>,
) -> std::result::Result<Arc<AppState>, StartupError> {
    let tuning = Arc::new(Tuning {
        weapons: load_weapons(config)?,
        ..Tuning::default()
    });

    let settings = WorldSettings {
        simulation: SimulationConfig {
            tuning: tuning.clone(),
            rules: config.match_rules,
        },
        scheduler: SchedulerSettings {
            tick_interval: config.tick_interval(),
            ..SchedulerSettings::default()
        },
        hub: HubSettings {
            sync_interval: config::SYNC_INTERVAL,
            sync: SyncSettings {
                snapshot_interval: config::SNAPSHOT_INTERVAL,
                ..SyncSettings::default()
            },
        },
        command_capacity: config::COMMAND_CHANNEL_CAPACITY,
        event_capacity: config::EVENT_BROADCAST_CAPACITY,
        control_capacity: config::HUB_CONTROL_CAPACITY,
    };

    // Every world publishes its events onto its own broadcast channel.
    let sink_factory: SinkFactory = Arc::new(|events| Arc::new(BroadcastSink::new(events)) as Arc<dyn EventSink>);
    let registry = Arc::new(WorldRegistry::new(
        settings,
        Arc::new(SystemClock),
        sink_factory,
        shutdown.clone(),
    ));

    // The default world always exists so clients can connect without a room service.
    registry
        .create_world(config::DEFAULT_WORLD_ID)
        .await
        .map_err(|reason| StartupError::World {
            world_id: config::DEFAULT_WORLD_ID.to_string(),
            reason,
        })?;

    Ok(Arc::new(AppState {
        registry,
        default_world_id: Arc::from(config::DEFAULT_WORLD_ID),
        arena_width: tuning.arena.width,
        arena_height: tuning.arena.height,
        connections: ConnectionTracker::new(),
        shutdown,
        shutdown_grace: config.shutdown_grace,
    }))
}
