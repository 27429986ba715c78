// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra client events

use crate::devices::{AlarmState, PartitionStateFlags, ZoneAttribute};

/// All events that can be emitted by the client.
///
/// Users subscribe via `satel.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<SatelEvent>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatelEvent {
    /// Session to the ETHM module established
    Connected,
    /// Session lost or closed
    Disconnected,
    /// The module accepted the monitoring request
    MonitoringStarted,
    /// A monitored zone attribute changed or was observed for the first time
    /// on this connection
    ZoneChanged {
        zone_id: u32,
        attribute: ZoneAttribute,
        active: bool,
        previous: Option<bool>,
    },
    /// A monitored output changed
    OutputChanged {
        output_id: u32,
        active: bool,
        previous: Option<bool>,
    },
    /// A monitored partition's state changed
    PartitionChanged {
        partition_id: u32,
        state: AlarmState,
        previous: Option<AlarmState>,
        flags: PartitionStateFlags,
    },
    /// A partition report was received: the partitions currently in `state`
    PartitionReport {
        state: AlarmState,
        partitions: Vec<u32>,
    },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<SatelEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<SatelEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
