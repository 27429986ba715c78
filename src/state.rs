// MIT License - Copyright (c) 2026 Peter Wright
// Panel state model fed by decoded report frames

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::SatelConfig;
use crate::constants::PARTITIONS_MASK_LEN;
use crate::devices::{AlarmState, Output, Partition, Zone, ZoneAttribute};
use crate::event::SatelEvent;
use crate::protocol::{DeviceKind, Message, PARTITION_REPORTS, ReadCommand};

/// State shared between the reader task and the client facade.
pub type SharedState = Arc<RwLock<PanelState>>;

/// Last known state of every zone, output and partition seen so far.
///
/// Values are only ever written from frames received from the panel.
/// Entities listed in the configuration exist from the start (as unknown);
/// others are added when a report shows them active.
#[derive(Debug, Default)]
pub struct PanelState {
    zones: BTreeMap<u32, Zone>,
    outputs: BTreeMap<u32, Output>,
    partitions: BTreeMap<u32, Partition>,
    /// Latest partition list per partition report
    partition_reports: BTreeMap<AlarmState, Vec<u32>>,
    /// Reports received on the current connection
    reported: BTreeSet<ReadCommand>,
    /// Reports the panel refused to serve on the current connection
    unsupported: BTreeSet<ReadCommand>,
    monitored_zones: BTreeSet<u32>,
    monitored_outputs: BTreeSet<u32>,
    monitored_partitions: BTreeSet<u32>,
}

impl PanelState {
    pub fn new(config: &SatelConfig) -> Self {
        let monitored_zones: BTreeSet<u32> = config.monitored_zones.iter().copied().collect();
        let monitored_outputs: BTreeSet<u32> = config.monitored_outputs.iter().copied().collect();
        let monitored_partitions: BTreeSet<u32> = config.partitions.iter().copied().collect();

        Self {
            zones: monitored_zones.iter().map(|&id| (id, Zone::new(id))).collect(),
            outputs: monitored_outputs.iter().map(|&id| (id, Output::new(id))).collect(),
            partitions: monitored_partitions
                .iter()
                .map(|&id| (id, Partition::new(id)))
                .collect(),
            monitored_zones,
            monitored_outputs,
            monitored_partitions,
            ..Default::default()
        }
    }

    pub fn shared(config: &SatelConfig) -> SharedState {
        Arc::new(RwLock::new(Self::new(config)))
    }

    /// Apply a frame from the panel and return the resulting events.
    pub fn apply(&mut self, message: &Message) -> Vec<SatelEvent> {
        let command = message.command;
        let result = if let Some(attribute) = ZoneAttribute::from_report(command) {
            self.apply_zones(attribute, message)
        } else if command == ReadCommand::OutputsState {
            self.apply_outputs(message)
        } else if let Some(state) = AlarmState::from_report(command) {
            self.apply_partitions(state, message)
        } else {
            return Vec::new();
        };

        match result {
            Ok(events) => {
                self.reported.insert(command);
                events
            }
            Err(e) => {
                warn!("Ignoring malformed {} report: {}", command, e);
                Vec::new()
            }
        }
    }

    fn apply_zones(
        &mut self,
        attribute: ZoneAttribute,
        message: &Message,
    ) -> crate::error::Result<Vec<SatelEvent>> {
        let (active, covered) = message.device_bits()?;
        let active: BTreeSet<u32> = active.into_iter().collect();
        let mut events = Vec::new();

        for id in 1..=covered {
            let is_active = active.contains(&id);
            if !is_active && !self.zones.contains_key(&id) {
                continue;
            }
            let zone = self.zones.entry(id).or_insert_with(|| Zone::new(id));
            if let Some(previous) = zone.update(attribute, is_active)
                && self.monitored_zones.contains(&id)
            {
                debug!("Zone {} {}: {:?} -> {}", id, attribute, previous, is_active);
                events.push(SatelEvent::ZoneChanged {
                    zone_id: id,
                    attribute,
                    active: is_active,
                    previous,
                });
            }
        }
        Ok(events)
    }

    fn apply_outputs(&mut self, message: &Message) -> crate::error::Result<Vec<SatelEvent>> {
        let (active, covered) = message.device_bits()?;
        let active: BTreeSet<u32> = active.into_iter().collect();
        let mut events = Vec::new();

        for id in 1..=covered {
            let is_active = active.contains(&id);
            if !is_active && !self.outputs.contains_key(&id) {
                continue;
            }
            let output = self.outputs.entry(id).or_insert_with(|| Output::new(id));
            if let Some(previous) = output.update(is_active)
                && self.monitored_outputs.contains(&id)
            {
                debug!("Output {}: {:?} -> {}", id, previous, is_active);
                events.push(SatelEvent::OutputChanged {
                    output_id: id,
                    active: is_active,
                    previous,
                });
            }
        }
        Ok(events)
    }

    fn apply_partitions(
        &mut self,
        state: AlarmState,
        message: &Message,
    ) -> crate::error::Result<Vec<SatelEvent>> {
        let active = message.active_bits(PARTITIONS_MASK_LEN)?;
        for &id in &active {
            self.partitions.entry(id).or_insert_with(|| Partition::new(id));
        }
        for partition in self.partitions.values_mut() {
            partition.set_flag(state.flag(), active.contains(&partition.id));
        }

        let mut events = vec![SatelEvent::PartitionReport {
            state,
            partitions: active.clone(),
        }];
        self.partition_reports.insert(state, active);
        self.reported.insert(message.command);

        events.extend(self.commit_partitions());
        Ok(events)
    }

    /// Record a report the panel rejected. Its flag counts as clear for the
    /// rest of the connection and it is no longer reported missing.
    pub fn mark_unsupported(&mut self, command: ReadCommand) -> Vec<SatelEvent> {
        if self.reported.contains(&command) || !self.unsupported.insert(command) {
            return Vec::new();
        }
        let Some(state) = AlarmState::from_report(command) else {
            return Vec::new();
        };
        debug!("Treating {} as clear", command);
        for partition in self.partitions.values_mut() {
            partition.set_flag(state.flag(), false);
        }
        self.commit_partitions()
    }

    /// Publish pending partition flags once every partition report is accounted for.
    fn commit_partitions(&mut self) -> Vec<SatelEvent> {
        let mut events = Vec::new();
        if !self.has_all_partition_reports() {
            return events;
        }

        for partition in self.partitions.values_mut() {
            if let Some(previous) = partition.commit()
                && self.monitored_partitions.contains(&partition.id)
                && let Some(flags) = partition.flags()
            {
                let new_state = AlarmState::from_flags(flags);
                let previous = previous.map(AlarmState::from_flags);
                debug!("Partition {}: {:?} -> {}", partition.id, previous, new_state);
                events.push(SatelEvent::PartitionChanged {
                    partition_id: partition.id,
                    state: new_state,
                    previous,
                    flags,
                });
            }
        }
        events
    }

    fn has_all_partition_reports(&self) -> bool {
        PARTITION_REPORTS
            .iter()
            .all(|r| self.reported.contains(r) || self.unsupported.contains(r))
    }

    /// Start a new connection: everything known so far becomes stale.
    pub fn mark_stale(&mut self) {
        self.reported.clear();
        self.unsupported.clear();
        self.zones.values_mut().for_each(Zone::mark_stale);
        self.outputs.values_mut().for_each(Output::mark_stale);
        self.partitions.values_mut().for_each(Partition::mark_stale);
    }

    pub fn has_report(&self, command: ReadCommand) -> bool {
        self.reported.contains(&command)
    }

    /// Reports from `reports` not yet received on the current connection,
    /// leaving out those the panel rejected.
    pub fn missing_reports(&self, reports: &[ReadCommand]) -> Vec<ReadCommand> {
        reports
            .iter()
            .copied()
            .filter(|r| !self.reported.contains(r) && !self.unsupported.contains(r))
            .collect()
    }

    /// Store a device name read from the panel.
    pub fn set_name(&mut self, kind: DeviceKind, number: u32, name: String) {
        match kind {
            DeviceKind::Zone => {
                self.zones.entry(number).or_insert_with(|| Zone::new(number)).name = Some(name);
            }
            DeviceKind::Output => {
                self.outputs
                    .entry(number)
                    .or_insert_with(|| Output::new(number))
                    .name = Some(name);
            }
            DeviceKind::Partition => {
                self.partitions
                    .entry(number)
                    .or_insert_with(|| Partition::new(number))
                    .name = Some(name);
            }
            DeviceKind::User | DeviceKind::Expander => {}
        }
    }

    pub fn zones(&self) -> Vec<Zone> {
        self.zones.values().cloned().collect()
    }

    pub fn zone(&self, id: u32) -> Option<Zone> {
        self.zones.get(&id).cloned()
    }

    pub fn outputs(&self) -> Vec<Output> {
        self.outputs.values().cloned().collect()
    }

    pub fn output(&self, id: u32) -> Option<Output> {
        self.outputs.get(&id).cloned()
    }

    pub fn partitions(&self) -> Vec<Partition> {
        self.partitions.values().cloned().collect()
    }

    pub fn partition(&self, id: u32) -> Option<Partition> {
        self.partitions.get(&id).cloned()
    }

    /// Zones whose last known violation state is set.
    pub fn violated_zones(&self) -> Vec<u32> {
        self.zones
            .values()
            .filter(|z| z.is_violated())
            .map(|z| z.id)
            .collect()
    }

    pub fn active_outputs(&self) -> Vec<u32> {
        self.outputs
            .values()
            .filter(|o| o.is_active())
            .map(|o| o.id)
            .collect()
    }

    /// Latest partition list per partition report.
    pub fn partition_states(&self) -> BTreeMap<AlarmState, Vec<u32>> {
        self.partition_reports.clone()
    }

    pub fn alarm_state(&self, partition_id: u32) -> Option<AlarmState> {
        self.partitions.get(&partition_id)?.alarm_state()
    }
}
