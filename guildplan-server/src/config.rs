use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "data/rooms";
const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 300;
const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;
const DEFAULT_ROOM: &str = "bg3";
const DEFAULT_COMMAND: &str = "bg3";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub save_debounce: Duration,
    /// How long an unused room stays open in memory
    pub session_idle: Duration,
    /// Room the chat bot writes events into
    pub allowed_room: String,
    /// Slash command the bot answers to
    pub command: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            save_debounce: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            allowed_room: DEFAULT_ROOM.to_string(),
            command: DEFAULT_COMMAND.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Config {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Config {
            bind: text("GUILDPLAN_BIND", DEFAULT_BIND),
            port: number(&lookup, "GUILDPLAN_PORT", DEFAULT_PORT),
            data_dir: PathBuf::from(text("GUILDPLAN_DATA_DIR", DEFAULT_DATA_DIR)),
            save_debounce: Duration::from_millis(number(
                &lookup,
                "GUILDPLAN_SAVE_DEBOUNCE_MS",
                DEFAULT_SAVE_DEBOUNCE_MS,
            )),
            session_idle: Duration::from_secs(number(
                &lookup,
                "GUILDPLAN_SESSION_IDLE_SECS",
                DEFAULT_SESSION_IDLE_SECS,
            )),
            allowed_room: text("DISCORD_ALLOWED_ROOM", DEFAULT_ROOM),
            command: text("DISCORD_COMMAND", DEFAULT_COMMAND),
        }
    }
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}={:?} is not a valid number, using {}", key, raw, default);
            default
        }),
    }
}
