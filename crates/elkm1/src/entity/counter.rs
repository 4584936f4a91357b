//! Counters: 16-bit panel variables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One panel counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    /// Wire-facing number, 1..=64
    pub number: u16,
    #[serde(default)]
    pub value: Option<u16>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Counter {
    pub fn new(number: u16) -> Self {
        Self { number, value: None, description: None, updated_at: None }
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "Counter ", self.number)
    }

    pub(crate) fn set_value(&mut self, value: u16, at: DateTime<Utc>) -> bool {
        if self.value == Some(value) {
            return false;
        }
        self.value = Some(value);
        self.updated_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_updates_once_per_change() {
        let mut counter = Counter::new(12);
        let now = Utc::now();
        assert!(counter.set_value(500, now));
        assert!(!counter.set_value(500, now));
        assert!(counter.set_value(65535, now));
    }
}
