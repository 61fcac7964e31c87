use crate::domain::match_rules::MatchRules;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const EVENT_BROADCAST_CAPACITY: usize = 256;
pub const HUB_CONTROL_CAPACITY: usize = 64;

pub const SYNC_INTERVAL: Duration = Duration::from_millis(50);
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);

// How long shutdown waits for connections and world tasks to finish.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub const DEFAULT_WORLD_ID: &str = "default";

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_TICK_RATE_HZ: u32 = 60;
const MAX_TICK_RATE_HZ: u32 = 240;

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub fn http_port() -> u16 {
    env_parse("ARENA_SERVER_PORT").unwrap_or(DEFAULT_PORT)
}

pub fn bind_addr() -> IpAddr {
    env_parse("ARENA_BIND_ADDR").unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub fn tick_rate_hz() -> u32 {
    env_parse("TICK_RATE_HZ")
        .unwrap_or(DEFAULT_TICK_RATE_HZ)
        .clamp(1, MAX_TICK_RATE_HZ)
}

pub fn weapon_config_path() -> Option<PathBuf> {
    env::var("WEAPON_CONFIG_PATH")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `time_limit_secs == 0` disables the time limit.
pub fn match_rules_from(time_limit_secs: Option<u64>, kill_target: Option<u32>) -> MatchRules {
    let defaults = MatchRules::default();
    MatchRules {
        kill_target: kill_target.filter(|k| *k > 0).unwrap_or(defaults.kill_target),
        time_limit: match time_limit_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.time_limit,
        },
        ..defaults
    }
}

pub fn shutdown_grace() -> Duration {
    env_parse("SHUTDOWN_GRACE_SECS")
        .map(Duration::from_secs)
        .unwrap_or(SHUTDOWN_GRACE)
}

pub fn match_rules() -> MatchRules {
    match_rules_from(env_parse("MATCH_TIME_LIMIT_SECS"), env_parse("MATCH_KILL_TARGET"))
}

/// Everything the server reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub tick_rate_hz: u32,
    pub match_rules: MatchRules,
    // Unset means the builtin weapon table.
    pub weapon_config_path: Option<PathBuf>,
    // Bounds every shutdown wait: writer flush, open connections, world tasks.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            match_rules: MatchRules::default(),
            weapon_config_path: None,
            shutdown_grace: SHUTDOWN_GRACE,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: bind_addr(),
            port: http_port(),
            tick_rate_hz: tick_rate_hz(),
            match_rules: match_rules(),
            weapon_config_path: weapon_config_path(),
            shutdown_grace: shutdown_grace(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}
