// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra outputs

use super::Observed;

/// A single output (relay or OC output).
#[derive(Debug, Clone)]
pub struct Output {
    pub id: u32,
    pub name: Option<String>,
    pub active: Observed<bool>,
}

impl Output {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: None,
            active: Observed::Unknown,
        }
    }

    /// Apply one bit of the outputs report.
    /// Returns the previous value when the change should be reported.
    pub fn update(&mut self, active: bool) -> Option<Option<bool>> {
        self.active.update(active)
    }

    pub fn mark_stale(&mut self) {
        self.active.mark_stale();
    }

    pub fn is_active(&self) -> bool {
        self.active.value().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_update() {
        let mut output = Output::new(16);
        assert!(!output.is_active());

        assert_eq!(output.update(true), Some(None));
        assert!(output.is_active());
        assert_eq!(output.update(true), None);
        assert_eq!(output.update(false), Some(Some(true)));
        assert!(!output.is_active());
    }
}
