// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra device model

pub mod zone;
pub mod partition;
pub mod output;

pub use zone::{Zone, ZoneAttribute};
pub use partition::{AlarmState, Partition, PartitionStateFlags};
pub use output::Output;

use std::time::Instant;

/// A status value together with where it came from.
///
/// `Unknown` means no frame was ever received for the field. `Stale` keeps
/// the last value seen on a previous connection, which may no longer hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Observed<T> {
    #[default]
    Unknown,
    Fresh { value: T, updated: Instant },
    Stale { value: T, updated: Instant },
}

impl<T: Copy> Observed<T> {
    /// Last known value, fresh or stale.
    pub fn value(&self) -> Option<T> {
        match self {
            Self::Unknown => None,
            Self::Fresh { value, .. } | Self::Stale { value, .. } => Some(*value),
        }
    }

    /// Value received on the current connection.
    pub fn fresh(&self) -> Option<T> {
        match self {
            Self::Fresh { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    pub fn updated_at(&self) -> Option<Instant> {
        match self {
            Self::Unknown => None,
            Self::Fresh { updated, .. } | Self::Stale { updated, .. } => Some(*updated),
        }
    }

    /// Record an authoritative value and return the previous observation.
    pub fn set(&mut self, value: T) -> Self {
        std::mem::replace(
            self,
            Self::Fresh {
                value,
                updated: Instant::now(),
            },
        )
    }

    pub fn mark_stale(&mut self) {
        if let Self::Fresh { value, updated } = *self {
            *self = Self::Stale { value, updated };
        }
    }
}

impl<T: Copy + PartialEq> Observed<T> {
    /// Store `value`; returns the previous value (if any) when the observation
    /// is worth reporting: the value changed or it was not fresh before.
    pub fn update(&mut self, value: T) -> Option<Option<T>> {
        let previous = self.set(value);
        if previous.fresh() == Some(value) {
            None
        } else {
            Some(previous.value())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_lifecycle() {
        let mut status: Observed<bool> = Observed::default();
        assert!(status.is_unknown());
        assert_eq!(status.value(), None);

        status.set(true);
        assert!(status.is_fresh());
        assert_eq!(status.fresh(), Some(true));

        status.mark_stale();
        assert!(status.is_stale());
        assert_eq!(status.value(), Some(true));
        assert_eq!(status.fresh(), None);
        assert!(status.updated_at().is_some());
    }

    #[test]
    fn test_mark_stale_keeps_unknown() {
        let mut status: Observed<bool> = Observed::Unknown;
        status.mark_stale();
        assert!(status.is_unknown());
    }

    #[test]
    fn test_update_reports_changes() {
        let mut status = Observed::Unknown;
        // first value is reported with no previous value
        assert_eq!(status.update(false), Some(None));
        // same fresh value is not
        assert_eq!(status.update(false), None);
        assert_eq!(status.update(true), Some(Some(false)));

        // after a reconnect the same value is reported again
        status.mark_stale();
        assert_eq!(status.update(true), Some(Some(true)));
    }
}
