//! Tasks: momentary automation triggers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Off,
    On,
}

/// One panel task. Activation is a pulse: the status goes `On` when the
/// panel reports the activation and falls back to `Off` after a short
/// grace period, leaving `last_activated` for edge-triggered consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Wire-facing number, 1..=32
    pub number: u16,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub last_activated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Off
}

impl Task {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            status: TaskStatus::Off,
            last_activated: None,
            description: None,
            updated_at: None,
        }
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "Task ", self.number)
    }

    pub(crate) fn activate(&mut self, at: DateTime<Utc>) -> bool {
        self.status = TaskStatus::On;
        self.last_activated = Some(at);
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn revert(&mut self, at: DateTime<Utc>) -> bool {
        if self.status == TaskStatus::Off {
            return false;
        }
        self.status = TaskStatus::Off;
        self.updated_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_pulses_and_reverts() {
        let mut task = Task::new(9);
        let now = Utc::now();
        assert!(task.activate(now));
        assert_eq!(task.status, TaskStatus::On);
        assert_eq!(task.last_activated, Some(now));
        assert!(task.revert(now));
        assert_eq!(task.status, TaskStatus::Off);
        // Reverting an idle task is a no-op.
        assert!(!task.revert(now));
        // The activation time survives the revert.
        assert_eq!(task.last_activated, Some(now));
    }
}
