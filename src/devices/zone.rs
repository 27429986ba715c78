// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra zones

use std::fmt;

use super::Observed;
use crate::protocol::ReadCommand;

/// Zone properties reported by separate bitmask frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneAttribute {
    Violated,
    Tamper,
    Alarm,
    Bypassed,
}

impl ZoneAttribute {
    /// The attribute carried by a zone report.
    pub fn from_report(command: ReadCommand) -> Option<Self> {
        match command {
            ReadCommand::ZonesViolated => Some(Self::Violated),
            ReadCommand::ZonesTamper => Some(Self::Tamper),
            ReadCommand::ZonesAlarm => Some(Self::Alarm),
            ReadCommand::ZonesBypassed => Some(Self::Bypassed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Violated => "violated",
            Self::Tamper => "tamper",
            Self::Alarm => "alarm",
            Self::Bypassed => "bypassed",
        }
    }
}

impl fmt::Display for ZoneAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single zone (detector input).
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: u32,
    pub name: Option<String>,
    pub violated: Observed<bool>,
    pub tamper: Observed<bool>,
    pub alarm: Observed<bool>,
    pub bypassed: Observed<bool>,
}

impl Zone {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: None,
            violated: Observed::Unknown,
            tamper: Observed::Unknown,
            alarm: Observed::Unknown,
            bypassed: Observed::Unknown,
        }
    }

    pub fn attribute(&self, attribute: ZoneAttribute) -> &Observed<bool> {
        match attribute {
            ZoneAttribute::Violated => &self.violated,
            ZoneAttribute::Tamper => &self.tamper,
            ZoneAttribute::Alarm => &self.alarm,
            ZoneAttribute::Bypassed => &self.bypassed,
        }
    }

    fn attribute_mut(&mut self, attribute: ZoneAttribute) -> &mut Observed<bool> {
        match attribute {
            ZoneAttribute::Violated => &mut self.violated,
            ZoneAttribute::Tamper => &mut self.tamper,
            ZoneAttribute::Alarm => &mut self.alarm,
            ZoneAttribute::Bypassed => &mut self.bypassed,
        }
    }

    /// Apply one bit of a zone report.
    ///
    /// Returns the previous value when the change should be reported.
    pub fn update(&mut self, attribute: ZoneAttribute, active: bool) -> Option<Option<bool>> {
        self.attribute_mut(attribute).update(active)
    }

    pub fn mark_stale(&mut self) {
        self.violated.mark_stale();
        self.tamper.mark_stale();
        self.alarm.mark_stale();
        self.bypassed.mark_stale();
    }

    pub fn is_violated(&self) -> bool {
        self.violated.value().unwrap_or(false)
    }
}
