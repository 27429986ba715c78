// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra client configuration

use std::fmt;

use crate::constants::DEFAULT_PORT;

/// Arming mode for partition arm commands.
///
/// Mode 0 is full arming; modes 1-3 are the panel's configurable
/// partial modes (typically "stay", "night" and "day").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArmMode {
    #[default]
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl ArmMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Mode0),
            1 => Some(Self::Mode1),
            2 => Some(Self::Mode2),
            3 => Some(Self::Mode3),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Mode0 => 0,
            Self::Mode1 => 1,
            Self::Mode2 => 2,
            Self::Mode3 => 3,
        }
    }
}

impl fmt::Display for ArmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode {}", self.as_u8())
    }
}

/// Configuration for connecting to a Satel panel.
#[derive(Debug, Clone)]
pub struct SatelConfig {
    /// ETHM module address
    pub host: String,
    /// Integration port (default: 7094)
    pub port: u16,
    /// Integration key; `None` selects the unencrypted protocol
    pub integration_key: Option<String>,
    /// Zones reported through change events
    pub monitored_zones: Vec<u32>,
    /// Outputs reported through change events
    pub monitored_outputs: Vec<u32>,
    /// Partitions reported through change events
    pub partitions: Vec<u32>,
    /// Whether to put the module into monitoring mode after connecting
    pub enable_monitoring: bool,
    /// Whether to read the names of monitored devices after connecting
    pub read_names: bool,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Time to wait for the reply to a request in milliseconds (default: 5000)
    pub response_timeout_ms: u64,
    /// Keep-alive interval in milliseconds (default: 20000)
    pub keep_alive_interval_ms: u64,
    /// Reconnection delay in milliseconds (base delay for exponential backoff)
    pub reconnect_delay_ms: u64,
    /// Upper bound for the reconnection delay in milliseconds
    pub max_reconnect_delay_ms: u64,
    /// Maximum number of retries for the initial connection (0 = no retries)
    pub max_connect_retries: u32,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for SatelConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: DEFAULT_PORT,
            integration_key: None,
            monitored_zones: Vec::new(),
            monitored_outputs: Vec::new(),
            partitions: Vec::new(),
            enable_monitoring: true,
            read_names: false,
            connect_timeout_ms: 10000,
            response_timeout_ms: 5000,
            keep_alive_interval_ms: 20000,
            reconnect_delay_ms: 15000,
            max_reconnect_delay_ms: 120000,
            max_connect_retries: 3,
            event_capacity: 256,
        }
    }
}

impl SatelConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> SatelConfigBuilder {
        SatelConfigBuilder::default()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_encrypted(&self) -> bool {
        self.integration_key.is_some()
    }

    /// Backoff delay before reconnection attempt `attempt` (1-based).
    pub fn reconnect_delay(&self, attempt: u32) -> u64 {
        let factor = 1u64 << attempt.saturating_sub(1).min(4);
        (self.reconnect_delay_ms * factor).min(self.max_reconnect_delay_ms)
    }
}

/// Builder for SatelConfig.
#[derive(Debug, Clone, Default)]
pub struct SatelConfigBuilder {
    config: SatelConfig,
}

impl SatelConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the integration key. An empty key keeps the connection unencrypted.
    pub fn integration_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.integration_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    pub fn monitored_zones(mut self, zones: impl Into<Vec<u32>>) -> Self {
        self.config.monitored_zones = zones.into();
        self
    }

    pub fn monitored_outputs(mut self, outputs: impl Into<Vec<u32>>) -> Self {
        self.config.monitored_outputs = outputs.into();
        self
    }

    pub fn partitions(mut self, partitions: impl Into<Vec<u32>>) -> Self {
        self.config.partitions = partitions.into();
        self
    }

    pub fn enable_monitoring(mut self, enable: bool) -> Self {
        self.config.enable_monitoring = enable;
        self
    }

    pub fn read_names(mut self, read_names: bool) -> Self {
        self.config.read_names = read_names;
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.config.response_timeout_ms = ms;
        self
    }

    pub fn keep_alive_interval_ms(mut self, ms: u64) -> Self {
        self.config.keep_alive_interval_ms = ms;
        self
    }

    pub fn reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.config.reconnect_delay_ms = ms;
        self
    }

    pub fn max_reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.config.max_reconnect_delay_ms = ms;
        self
    }

    pub fn max_connect_retries(mut self, retries: u32) -> Self {
        self.config.max_connect_retries = retries;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> SatelConfig {
        self.config
    }
}
