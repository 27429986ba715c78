// MIT License - Copyright (c) 2026 Peter Wright
// Asynchronous Satel Integra client
//
//! # satel-integra
//!
//! Asynchronous client for Satel Integra alarm panels connected through an
//! ETHM-1 (Plus) Ethernet module, using the integration protocol on TCP
//! port 7094, optionally encrypted with the module's integration key.
//!
//! The client keeps a live picture of zones, outputs and partitions,
//! broadcasts changes as [`SatelEvent`]s, reconnects on its own and sends
//! arm/disarm/output commands.
//!
//! ## Quick Start
//!
//! ```no_run
//! use satel_integra::{AsyncSatel, SatelConfig, SatelEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SatelConfig::builder()
//!         .host("192.168.1.100")
//!         .integration_key("my-integration-key")
//!         .monitored_zones(vec![1, 2, 3])
//!         .monitored_outputs(vec![16])
//!         .partitions(vec![1])
//!         .build();
//!
//!     let satel = AsyncSatel::connect(config).await?;
//!
//!     let mut events = satel.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let SatelEvent::ZoneChanged { zone_id, attribute, active, .. } = event {
//!                 println!("Zone {} {}: {}", zone_id, attribute, active);
//!             }
//!         }
//!     });
//!
//!     satel.set_output("1234", 16, true).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     satel.close().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod comm;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod devices;
pub mod error;
pub mod event;
pub mod panel;
pub mod protocol;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use config::{ArmMode, SatelConfig, SatelConfigBuilder};
pub use constants::PanelModel;
pub use devices::{AlarmState, Observed, Output, Partition, PartitionStateFlags, Zone, ZoneAttribute};
pub use error::{Result, ResultCode, SatelError};
pub use event::{EventReceiver, SatelEvent};
pub use panel::AsyncSatel;
pub use protocol::{DeviceKind, DeviceName, PanelVersion};
