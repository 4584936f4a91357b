//! Users: code slots, with four reserved system slots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user slot. Slots 200 through 203 are reserved by the panel and
/// pre-named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Wire-facing number, 1..=203
    pub number: u16,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(number: u16) -> Self {
        let description = match number {
            200 => Some("Unused".to_string()),
            201 => Some("Program Code".to_string()),
            202 => Some("ELK RP".to_string()),
            203 => Some("Quick Arm".to_string()),
            _ => None,
        };
        Self { number, description, updated_at: None }
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "User ", self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_slots_are_pre_named() {
        assert_eq!(User::new(200).description.as_deref(), Some("Unused"));
        assert_eq!(User::new(201).description.as_deref(), Some("Program Code"));
        assert_eq!(User::new(202).description.as_deref(), Some("ELK RP"));
        assert_eq!(User::new(203).description.as_deref(), Some("Quick Arm"));
        assert_eq!(User::new(5).description, None);
        assert_eq!(User::new(5).description_pretty(), "User 5");
    }
}
