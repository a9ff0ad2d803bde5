use crate::message::SetupContents;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// Re-export existing config types
pub use crate::transport::NatsConfig;

/// Complete roomsync configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomsyncConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub setup: SetupConfig,
}

/// Identity and topics of this client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Sender id stamped on every outbound envelope
    #[serde(default = "default_client_id")]
    pub id: String,
    #[serde(default = "default_inbound_topics")]
    pub inbound_topics: Vec<String>,
    #[serde(default = "default_outbound_topic")]
    pub outbound_topic: String,
    /// Device id under which the back-end reports its link to this client.
    /// When that device goes offline, every device is considered offline.
    #[serde(default = "default_client_id")]
    pub upstream_id: String,
    /// Capacity of the session event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_client_id() -> String {
    "front-end".to_string()
}

fn default_inbound_topics() -> Vec<String> {
    vec!["front-end".to_string()]
}

fn default_outbound_topic() -> String {
    "back-end".to_string()
}

fn default_event_buffer() -> usize {
    256
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id: default_client_id(),
            inbound_topics: default_inbound_topics(),
            outbound_topic: default_outbound_topic(),
            upstream_id: default_client_id(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Timer engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TimerConfig {
    /// Tick period, also the amount subtracted from active timers per tick
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

fn default_period_ms() -> u64 {
    1000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
        }
    }
}

/// Startup setup document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupConfig {
    /// JSON file shaped like the contents of a `setup` message, applied
    /// once before the first message is handled
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl RoomsyncConfig {
    /// Apply env var overrides on top of file/default values
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ROOMSYNC_NATS_URL") {
            self.nats.url = v;
        }
        if let Ok(v) = std::env::var("ROOMSYNC_CLIENT_ID") {
            self.client.id = v;
        }
        if let Ok(v) = std::env::var("ROOMSYNC_SETUP_FILE") {
            self.setup.file = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("ROOMSYNC_TICK_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                self.timer.period_ms = ms;
            }
        }
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.timer.period_ms == 0 {
            bail!("timer.period_ms must be greater than zero");
        }
        if self.client.event_buffer == 0 {
            bail!("client.event_buffer must be greater than zero");
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<RoomsyncConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: RoomsyncConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

/// Load the startup setup document (same shape as `setup` contents)
pub fn load_setup_document(path: impl AsRef<Path>) -> Result<SetupContents> {
    let path = path.as_ref();
    let contents = std::fs::read(path)
        .with_context(|| format!("Failed to read setup document {}", path.display()))?;
    serde_json::from_slice(&contents)
        .with_context(|| format!("Failed to parse setup document {}", path.display()))
}
