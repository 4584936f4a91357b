//! In-memory mirror of every panel entity
//!
//! One module per entity kind. Entities are plain data: the dispatcher is
//! the only writer, every mutation goes through a typed update operation
//! that reports whether an observable field changed, and callbacks receive
//! clones so they always see a settled value.

pub mod area;
pub mod counter;
pub mod keypad;
pub mod output;
pub mod setting;
pub mod task;
pub mod thermostat;
pub mod user;
pub mod x10;
pub mod zone;

pub use area::{Area, AreaAlarm, AreaStatus, ArmLevel, ArmUpState, ArmedState, ChimeMode};
pub use counter::Counter;
pub use keypad::{Keypad, KeypadKey};
pub use output::{Output, OutputState};
pub use setting::{Setting, SettingFormat, SettingValue};
pub use task::{Task, TaskStatus};
pub use thermostat::{
    Thermostat, ThermostatElement, ThermostatFan, ThermostatHold, ThermostatMode,
};
pub use user::User;
pub use x10::{HouseCode, X10Device, X10Function, X10Status};
pub use zone::{Zone, ZoneAlarmConfig, ZoneDefinition, ZoneState, ZoneStatus};

use serde::{Deserialize, Serialize};

/// Entity classes the panel exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Zone,
    Output,
    Area,
    Keypad,
    Thermostat,
    X10,
    Task,
    User,
    Counter,
    Setting,
}

impl EntityKind {
    /// Fixed entity count for this kind.
    pub fn capacity(self) -> usize {
        match self {
            EntityKind::Zone | EntityKind::Output => 208,
            EntityKind::Area => 8,
            EntityKind::Keypad | EntityKind::Thermostat => 16,
            EntityKind::X10 => 256,
            EntityKind::Task => 32,
            EntityKind::User => 203,
            EntityKind::Counter => 64,
            EntityKind::Setting => 20,
        }
    }

    /// Description type code for `sd` requests, where one exists.
    pub fn description_type(self) -> Option<u8> {
        match self {
            EntityKind::Zone => Some(0),
            EntityKind::Area => Some(1),
            EntityKind::User => Some(2),
            EntityKind::Keypad => Some(3),
            EntityKind::Output => Some(4),
            EntityKind::Task => Some(5),
            EntityKind::X10 => Some(7),
            EntityKind::Setting => Some(9),
            EntityKind::Counter => Some(10),
            EntityKind::Thermostat => Some(11),
        }
    }
}

/// Render a description, generating `"<prefix><number>"` when the panel
/// has none set. Panel factory defaults like `Zone 004` count as unset so
/// the generated form wins.
pub(crate) fn pretty_description(description: Option<&str>, prefix: &str, number: u16) -> String {
    let fallback = format!("{prefix}{number}");
    match description {
        None | Some("") => fallback,
        Some(text) => {
            let bare = prefix.trim_end();
            if text == format!("{bare}{number:02}")
                || text == format!("{bare}{number:03}")
                || text == format!("{prefix}{number:02}")
                || text == format!("{prefix}{number:03}")
            {
                fallback
            } else {
                text.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_are_fixed() {
        assert_eq!(EntityKind::Zone.capacity(), 208);
        assert_eq!(EntityKind::X10.capacity(), 256);
        assert_eq!(EntityKind::User.capacity(), 203);
        assert_eq!(EntityKind::Setting.capacity(), 20);
    }

    #[test]
    fn factory_default_descriptions_fall_back() {
        assert_eq!(pretty_description(None, "Zone ", 4), "Zone 4");
        assert_eq!(pretty_description(Some("Zone 004"), "Zone ", 4), "Zone 4");
        assert_eq!(pretty_description(Some("Front Door"), "Zone ", 4), "Front Door");
    }
}
