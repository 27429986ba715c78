// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra partitions

use std::fmt;

use bitflags::bitflags;

use super::Observed;
use crate::protocol::ReadCommand;

bitflags! {
    /// Partition status flags, one per partition report.
    ///
    /// Each flag mirrors the partition's bit in the corresponding report
    /// frame (`0x09`, `0x0A`..`0x0C`, `0x2A`, `0x0E`..`0x10`, `0x13`, `0x14`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PartitionStateFlags: u16 {
        /// 0x09 - armed (suppressed)
        const ARMED_SUPPRESSED = 0x0001;
        /// 0x0A - really armed in mode 0
        const ARMED_MODE0      = 0x0002;
        /// 0x2A - armed in mode 1
        const ARMED_MODE1      = 0x0004;
        /// 0x0B - armed in mode 2
        const ARMED_MODE2      = 0x0008;
        /// 0x0C - armed in mode 3
        const ARMED_MODE3      = 0x0010;
        /// 0x0E - entry time running
        const ENTRY_TIME       = 0x0020;
        /// 0x0F - exit time, more than 10 s left
        const EXIT_OVER_10     = 0x0040;
        /// 0x10 - exit time, less than 10 s left
        const EXIT_UNDER_10    = 0x0080;
        /// 0x13 - alarm
        const ALARM            = 0x0100;
        /// 0x14 - fire alarm
        const FIRE_ALARM       = 0x0200;
    }
}

impl PartitionStateFlags {
    /// Flag carried by a partition report.
    pub fn from_report(command: ReadCommand) -> Option<Self> {
        AlarmState::from_report(command).map(AlarmState::flag)
    }
}

/// Alarm state of a partition, derived from its report flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlarmState {
    ArmedMode0,
    ArmedMode1,
    ArmedMode2,
    ArmedMode3,
    ArmedSuppressed,
    EntryTime,
    ExitCountdownOver10,
    ExitCountdownUnder10,
    Triggered,
    TriggeredFire,
    Disarmed,
}

/// Derivation order: the first state whose flag is set wins.
const PRECEDENCE: [AlarmState; 10] = [
    AlarmState::TriggeredFire,
    AlarmState::Triggered,
    AlarmState::EntryTime,
    AlarmState::ExitCountdownUnder10,
    AlarmState::ExitCountdownOver10,
    AlarmState::ArmedMode3,
    AlarmState::ArmedMode2,
    AlarmState::ArmedMode1,
    AlarmState::ArmedMode0,
    AlarmState::ArmedSuppressed,
];

impl AlarmState {
    /// The state reported by a partition report command.
    pub fn from_report(command: ReadCommand) -> Option<Self> {
        match command {
            ReadCommand::PartitionsArmedSuppressed => Some(Self::ArmedSuppressed),
            ReadCommand::PartitionsArmedMode0 => Some(Self::ArmedMode0),
            ReadCommand::PartitionsArmedMode1 => Some(Self::ArmedMode1),
            ReadCommand::PartitionsArmedMode2 => Some(Self::ArmedMode2),
            ReadCommand::PartitionsArmedMode3 => Some(Self::ArmedMode3),
            ReadCommand::PartitionsEntryTime => Some(Self::EntryTime),
            ReadCommand::PartitionsExitCountdownOver10 => Some(Self::ExitCountdownOver10),
            ReadCommand::PartitionsExitCountdownUnder10 => Some(Self::ExitCountdownUnder10),
            ReadCommand::PartitionsAlarm => Some(Self::Triggered),
            ReadCommand::PartitionsFireAlarm => Some(Self::TriggeredFire),
            _ => None,
        }
    }

    pub fn flag(self) -> PartitionStateFlags {
        match self {
            Self::ArmedMode0 => PartitionStateFlags::ARMED_MODE0,
            Self::ArmedMode1 => PartitionStateFlags::ARMED_MODE1,
            Self::ArmedMode2 => PartitionStateFlags::ARMED_MODE2,
            Self::ArmedMode3 => PartitionStateFlags::ARMED_MODE3,
            Self::ArmedSuppressed => PartitionStateFlags::ARMED_SUPPRESSED,
            Self::EntryTime => PartitionStateFlags::ENTRY_TIME,
            Self::ExitCountdownOver10 => PartitionStateFlags::EXIT_OVER_10,
            Self::ExitCountdownUnder10 => PartitionStateFlags::EXIT_UNDER_10,
            Self::Triggered => PartitionStateFlags::ALARM,
            Self::TriggeredFire => PartitionStateFlags::FIRE_ALARM,
            Self::Disarmed => PartitionStateFlags::empty(),
        }
    }

    pub fn from_flags(flags: PartitionStateFlags) -> Self {
        PRECEDENCE
            .into_iter()
            .find(|state| flags.contains(state.flag()))
            .unwrap_or(Self::Disarmed)
    }

    pub fn is_armed(&self) -> bool {
        matches!(
            self,
            Self::ArmedMode0
                | Self::ArmedMode1
                | Self::ArmedMode2
                | Self::ArmedMode3
                | Self::ArmedSuppressed
        )
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered | Self::TriggeredFire)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArmedMode0 => "armed_mode0",
            Self::ArmedMode1 => "armed_mode1",
            Self::ArmedMode2 => "armed_mode2",
            Self::ArmedMode3 => "armed_mode3",
            Self::ArmedSuppressed => "armed_suppressed",
            Self::EntryTime => "entry_time",
            Self::ExitCountdownOver10 => "exit_countdown_over_10",
            Self::ExitCountdownUnder10 => "exit_countdown_under_10",
            Self::Triggered => "triggered",
            Self::TriggeredFire => "triggered_fire",
            Self::Disarmed => "disarmed",
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single partition.
///
/// Report frames update `pending`; the flags are only published to `state`
/// once the whole set of partition reports has been seen on the current
/// connection (see [`crate::state::PanelState`]).
#[derive(Debug, Clone)]
pub struct Partition {
    pub id: u32,
    pub name: Option<String>,
    pub state: Observed<PartitionStateFlags>,
    pending: PartitionStateFlags,
}

impl Partition {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: None,
            state: Observed::Unknown,
            pending: PartitionStateFlags::empty(),
        }
    }

    pub fn set_flag(&mut self, flag: PartitionStateFlags, active: bool) {
        self.pending.set(flag, active);
    }

    /// Publish the collected flags.
    ///
    /// Returns the previously published flags when the change should be
    /// reported.
    pub fn commit(&mut self) -> Option<Option<PartitionStateFlags>> {
        self.state.update(self.pending)
    }

    pub fn flags(&self) -> Option<PartitionStateFlags> {
        self.state.value()
    }

    pub fn alarm_state(&self) -> Option<AlarmState> {
        self.state.value().map(AlarmState::from_flags)
    }

    pub fn mark_stale(&mut self) {
        self.state.mark_stale();
    }
}
