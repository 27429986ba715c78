// MIT License - Copyright (c) 2026 Peter Wright
// Command line client

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use satel_integra::{
    AlarmState, ArmMode, AsyncSatel, DeviceKind, Output, Partition, SatelConfig, SatelEvent, Zone,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "satel-integra")]
#[command(about = "Monitor and control a Satel Integra alarm panel through its ETHM module")]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(long, env = "SATEL_CONFIG")]
    config: Option<PathBuf>,

    /// ETHM module address (overrides the config file)
    #[arg(long, env = "SATEL_HOST")]
    host: Option<String>,

    /// Integration port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Integration key; enables the encrypted protocol
    #[arg(long, env = "SATEL_INTEGRATION_KEY", hide_env_values = true)]
    integration_key: Option<String>,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print panel events as JSON lines until interrupted
    Monitor {
        /// Zones to report (comma separated, adds to the config file)
        #[arg(long, value_delimiter = ',')]
        zones: Vec<u32>,
        /// Outputs to report
        #[arg(long, value_delimiter = ',')]
        outputs: Vec<u32>,
        /// Partitions to report
        #[arg(long, value_delimiter = ',')]
        partitions: Vec<u32>,
    },
    /// Arm partitions
    Arm {
        #[arg(long, env = "SATEL_CODE", hide_env_values = true)]
        code: String,
        #[arg(long, value_delimiter = ',', required = true)]
        partitions: Vec<u32>,
        /// Arming mode 0-3
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
        mode: u8,
    },
    /// Disarm partitions
    Disarm {
        #[arg(long, env = "SATEL_CODE", hide_env_values = true)]
        code: String,
        #[arg(long, value_delimiter = ',', required = true)]
        partitions: Vec<u32>,
    },
    /// Clear the alarm on partitions
    ClearAlarm {
        #[arg(long, env = "SATEL_CODE", hide_env_values = true)]
        code: String,
        #[arg(long, value_delimiter = ',', required = true)]
        partitions: Vec<u32>,
    },
    /// Switch an output on or off
    Output {
        #[arg(long, env = "SATEL_CODE", hide_env_values = true)]
        code: String,
        /// Output number
        output: u32,
        #[arg(value_enum)]
        state: Switch,
    },
    /// Print the panel model and firmware version
    Version,
    /// Print the panel clock
    Time,
    /// Print the name of a device
    Name {
        #[arg(value_enum)]
        kind: Kind,
        number: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Partition,
    Zone,
    User,
    Expander,
    Output,
}

impl From<Kind> for DeviceKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Partition => DeviceKind::Partition,
            Kind::Zone => DeviceKind::Zone,
            Kind::User => DeviceKind::User,
            Kind::Expander => DeviceKind::Expander,
            Kind::Output => DeviceKind::Output,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    panel: PanelToml,
    #[serde(default)]
    monitor: MonitorToml,
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    integration_key: Option<String>,
    #[serde(default)]
    read_names: bool,
    #[serde(default = "default_response_timeout")]
    response_timeout_ms: u64,
    #[serde(default = "default_keep_alive_interval")]
    keep_alive_interval_ms: u64,
    #[serde(default = "default_reconnect_delay")]
    reconnect_delay_ms: u64,
    #[serde(default = "default_max_connect_retries")]
    max_connect_retries: u32,
}

impl Default for PanelToml {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            integration_key: None,
            read_names: false,
            response_timeout_ms: default_response_timeout(),
            keep_alive_interval_ms: default_keep_alive_interval(),
            reconnect_delay_ms: default_reconnect_delay(),
            max_connect_retries: default_max_connect_retries(),
        }
    }
}

fn default_host() -> String {
    "192.168.1.100".to_string()
}
fn default_port() -> u16 {
    7094
}
fn default_response_timeout() -> u64 {
    5000
}
fn default_keep_alive_interval() -> u64 {
    20000
}
fn default_reconnect_delay() -> u64 {
    15000
}
fn default_max_connect_retries() -> u32 {
    3
}

#[derive(Debug, Default, Deserialize)]
struct MonitorToml {
    #[serde(default)]
    zones: Vec<u32>,
    #[serde(default)]
    outputs: Vec<u32>,
    #[serde(default)]
    partitions: Vec<u32>,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).context("Failed to parse config file")
}

fn build_satel_config(cli: &Cli, config: &Config) -> SatelConfig {
    let panel = &config.panel;
    let mut builder = SatelConfig::builder()
        .host(cli.host.clone().unwrap_or_else(|| panel.host.clone()))
        .port(cli.port.unwrap_or(panel.port))
        .read_names(panel.read_names)
        .response_timeout_ms(panel.response_timeout_ms)
        .keep_alive_interval_ms(panel.keep_alive_interval_ms)
        .reconnect_delay_ms(panel.reconnect_delay_ms)
        .max_connect_retries(panel.max_connect_retries)
        .monitored_zones(config.monitor.zones.clone())
        .monitored_outputs(config.monitor.outputs.clone())
        .partitions(config.monitor.partitions.clone());

    if let Some(key) = cli.integration_key.as_ref().or(panel.integration_key.as_ref()) {
        builder = builder.integration_key(key.as_str());
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// JSON event lines
// ---------------------------------------------------------------------------

// All lines share the {now, op, ...} flat structure

#[derive(Serialize)]
struct SimpleEvent {
    now: u64,
    op: String,
}

#[derive(Serialize)]
struct ZoneEvent {
    now: u64,
    op: String,
    zone: u32,
    attribute: String,
    active: bool,
    previous: Option<bool>,
}

#[derive(Serialize)]
struct OutputEvent {
    now: u64,
    op: String,
    output: u32,
    active: bool,
    previous: Option<bool>,
}

#[derive(Serialize)]
struct PartitionEvent {
    now: u64,
    op: String,
    partition: u32,
    state: String,
    previous: Option<String>,
    flags: u16,
}

#[derive(Serialize)]
struct PartitionReportEvent {
    now: u64,
    op: String,
    state: String,
    partitions: Vec<u32>,
}

#[derive(Serialize)]
struct Snapshot {
    now: u64,
    op: String,
    state: SnapshotState,
}

#[derive(Serialize)]
struct SnapshotState {
    zones: Vec<ZoneState>,
    outputs: Vec<OutputState>,
    partitions: Vec<PartitionState>,
}

#[derive(Serialize)]
struct ZoneState {
    id: u32,
    name: Option<String>,
    violated: Option<bool>,
    tamper: Option<bool>,
    alarm: Option<bool>,
    bypassed: Option<bool>,
    stale: bool,
}

#[derive(Serialize)]
struct OutputState {
    id: u32,
    name: Option<String>,
    active: Option<bool>,
    stale: bool,
}

#[derive(Serialize)]
struct PartitionState {
    id: u32,
    name: Option<String>,
    state: Option<String>,
    stale: bool,
}

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

fn print_json(payload: &impl Serialize) {
    match serde_json::to_string(payload) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Failed to serialize event: {e}"),
    }
}

fn print_event(event: &SatelEvent) {
    match event_payload(event, now_epoch_ms()) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Failed to serialize event: {e}"),
    }
}

/// JSON line for an event.
fn event_payload(event: &SatelEvent, now: u64) -> serde_json::Result<serde_json::Value> {
    match event {
        SatelEvent::Connected => serde_json::to_value(SimpleEvent {
            now,
            op: "CONNECTED".to_string(),
        }),
        SatelEvent::Disconnected => serde_json::to_value(SimpleEvent {
            now,
            op: "DISCONNECTED".to_string(),
        }),
        SatelEvent::MonitoringStarted => serde_json::to_value(SimpleEvent {
            now,
            op: "MONITORING_STARTED".to_string(),
        }),
        SatelEvent::ZoneChanged {
            zone_id,
            attribute,
            active,
            previous,
        } => serde_json::to_value(ZoneEvent {
            now,
            op: "ZONE_CHANGED".to_string(),
            zone: *zone_id,
            attribute: attribute.to_string(),
            active: *active,
            previous: *previous,
        }),
        SatelEvent::OutputChanged {
            output_id,
            active,
            previous,
        } => serde_json::to_value(OutputEvent {
            now,
            op: "OUTPUT_CHANGED".to_string(),
            output: *output_id,
            active: *active,
            previous: *previous,
        }),
        SatelEvent::PartitionChanged {
            partition_id,
            state,
            previous,
            flags,
        } => serde_json::to_value(PartitionEvent {
            now,
            op: "PARTITION_CHANGED".to_string(),
            partition: *partition_id,
            state: state.to_string(),
            previous: previous.map(|s| s.to_string()),
            flags: flags.bits(),
        }),
        SatelEvent::PartitionReport { state, partitions } => {
            serde_json::to_value(PartitionReportEvent {
                now,
                op: "PARTITION_REPORT".to_string(),
                state: state.to_string(),
                partitions: partitions.clone(),
            })
        }
    }
}

async fn build_snapshot(satel: &AsyncSatel) -> Snapshot {
    snapshot(
        satel.zones().await,
        satel.outputs().await,
        satel.partitions().await,
        now_epoch_ms(),
    )
}

fn snapshot(
    zones: Vec<Zone>,
    outputs: Vec<Output>,
    partitions: Vec<Partition>,
    now: u64,
) -> Snapshot {
    let zones = zones
        .into_iter()
        .map(|z| ZoneState {
            id: z.id,
            stale: z.violated.is_stale(),
            name: z.name,
            violated: z.violated.value(),
            tamper: z.tamper.value(),
            alarm: z.alarm.value(),
            bypassed: z.bypassed.value(),
        })
        .collect();

    let outputs = outputs
        .into_iter()
        .map(|o| OutputState {
            id: o.id,
            stale: o.active.is_stale(),
            name: o.name,
            active: o.active.value(),
        })
        .collect();

    let partitions = partitions
        .into_iter()
        .map(|p| PartitionState {
            id: p.id,
            stale: p.state.is_stale(),
            state: p.alarm_state().map(|s: AlarmState| s.to_string()),
            name: p.name,
        })
        .collect();

    Snapshot {
        now,
        op: "SNAPSHOT".to_string(),
        state: SnapshotState {
            zones,
            outputs,
            partitions,
        },
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn monitor(config: SatelConfig) -> Result<()> {
    let satel = AsyncSatel::start(config);
    let mut events = satel.subscribe();

    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event);
                    if event == SatelEvent::Connected {
                        print_json(&build_snapshot(&satel).await);
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event receiver lagged, missed {n} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    info!("Event channel closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }
    }

    satel.close().await;
    Ok(())
}

/// Connect once without monitoring, run a single operation and close.
async fn one_shot(config: SatelConfig, command: Commands) -> Result<()> {
    let config = SatelConfig {
        enable_monitoring: false,
        ..config
    };
    let satel = AsyncSatel::connect(config)
        .await
        .context("Failed to connect to the panel")?;

    let result = run_command(&satel, command).await;
    satel.close().await;
    result
}

async fn run_command(satel: &AsyncSatel, command: Commands) -> Result<()> {
    match command {
        Commands::Monitor { .. } => anyhow::bail!("monitor is not a one-shot command"),
        Commands::Arm {
            code,
            partitions,
            mode,
        } => {
            let mode = ArmMode::from_u8(mode).unwrap_or_default();
            satel.arm(&code, &partitions, mode).await?;
            info!("Partitions {:?} armed ({})", partitions, mode);
        }
        Commands::Disarm { code, partitions } => {
            satel.disarm(&code, &partitions).await?;
            info!("Partitions {:?} disarmed", partitions);
        }
        Commands::ClearAlarm { code, partitions } => {
            satel.clear_alarm(&code, &partitions).await?;
            info!("Alarm cleared on partitions {:?}", partitions);
        }
        Commands::Output {
            code,
            output,
            state,
        } => {
            let on = matches!(state, Switch::On);
            satel.set_output(&code, output, on).await?;
            info!("Output {} switched {}", output, if on { "on" } else { "off" });
        }
        Commands::Version => println!("{}", satel.read_version().await?),
        Commands::Time => println!("{}", satel.read_time().await?),
        Commands::Name { kind, number } => {
            let name = satel.read_device_name(kind.into(), number).await?;
            println!("{}", name.name);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level (e.g. RUST_LOG=satel_integra=trace).
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    // stdout carries the JSON lines; systemd journal already adds timestamps
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt()
            .without_time()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
    }

    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Monitor {
            ref zones,
            ref outputs,
            ref partitions,
        } => {
            config.monitor.zones.extend(zones);
            config.monitor.outputs.extend(outputs);
            config.monitor.partitions.extend(partitions);
            monitor(build_satel_config(&cli, &config)).await
        }
        _ => {
            let satel_config = build_satel_config(&cli, &config);
            one_shot(satel_config, cli.command).await
        }
    }
}
