//! Outputs: relays and voltage outputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputState {
    Off,
    On,
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "Off",
            Self::On => "On",
        })
    }
}

/// One control output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Wire-facing number, 1..=208
    pub number: u16,
    #[serde(default)]
    pub status: Option<OutputState>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Output {
    pub fn new(number: u16) -> Self {
        Self { number, status: None, description: None, updated_at: None }
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "Output ", self.number)
    }

    pub fn is_on(&self) -> bool {
        self.status == Some(OutputState::On)
    }

    pub(crate) fn set_status(&mut self, on: bool, at: DateTime<Utc>) -> bool {
        let status = Some(if on { OutputState::On } else { OutputState::Off });
        if self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_changes_report_once() {
        let mut output = Output::new(3);
        let now = Utc::now();
        assert!(output.set_status(true, now));
        assert!(output.is_on());
        assert!(!output.set_status(true, now));
        assert!(output.set_status(false, now));
    }
}
