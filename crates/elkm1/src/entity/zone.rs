//! Zones: physical inputs reporting one of four electrical states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Electrical input state, low two bits of the packed status nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneState {
    Unconfigured,
    Open,
    Eol,
    Short,
}

impl ZoneState {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Unconfigured,
            1 => Self::Open,
            2 => Self::Eol,
            3 => Self::Short,
            _ => return None,
        })
    }
}

impl fmt::Display for ZoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconfigured => "Unconfigured",
            Self::Open => "Open",
            Self::Eol => "EOL",
            Self::Short => "Short",
        })
    }
}

/// Zone status, next two bits of the packed nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneStatus {
    Normal,
    Trouble,
    Violated,
    Bypassed,
}

impl ZoneStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Normal,
            1 => Self::Trouble,
            2 => Self::Violated,
            3 => Self::Bypassed,
            _ => return None,
        })
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "Normal",
            Self::Trouble => "Trouble",
            Self::Violated => "Violated",
            Self::Bypassed => "Bypassed",
        })
    }
}

/// Zone definition (type) as programmed in the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneDefinition {
    Disabled,
    BurglarEntryExit1,
    BurglarEntryExit2,
    BurglarPerimeterInstant,
    BurglarInterior,
    BurglarInteriorFollower,
    BurglarInteriorNight,
    BurglarInteriorNightDelay,
    Burglar24Hour,
    BurglarBoxTamper,
    FireAlarm,
    FireVerified,
    FireSupervisory,
    AuxAlarm1,
    AuxAlarm2,
    Keyfob,
    NonAlarm,
    CarbonMonoxide,
    EmergencyAlarm,
    FreezeAlarm,
    GasAlarm,
    HeatAlarm,
    MedicalAlarm,
    PoliceAlarm,
    PoliceNoIndication,
    WaterAlarm,
    KeyMomentaryArmDisarm,
    KeyMomentaryArmAway,
    KeyMomentaryArmStay,
    KeyMomentaryDisarm,
    KeyOnOff,
    MuteAudibles,
    PowerSupervisory,
    Temperature,
    AnalogZone,
    PhoneKey,
    IntercomKey,
}

impl ZoneDefinition {
    pub fn from_code(code: u8) -> Option<Self> {
        use ZoneDefinition::*;
        const ALL: [ZoneDefinition; 37] = [
            Disabled,
            BurglarEntryExit1,
            BurglarEntryExit2,
            BurglarPerimeterInstant,
            BurglarInterior,
            BurglarInteriorFollower,
            BurglarInteriorNight,
            BurglarInteriorNightDelay,
            Burglar24Hour,
            BurglarBoxTamper,
            FireAlarm,
            FireVerified,
            FireSupervisory,
            AuxAlarm1,
            AuxAlarm2,
            Keyfob,
            NonAlarm,
            CarbonMonoxide,
            EmergencyAlarm,
            FreezeAlarm,
            GasAlarm,
            HeatAlarm,
            MedicalAlarm,
            PoliceAlarm,
            PoliceNoIndication,
            WaterAlarm,
            KeyMomentaryArmDisarm,
            KeyMomentaryArmAway,
            KeyMomentaryArmStay,
            KeyMomentaryDisarm,
            KeyOnOff,
            MuteAudibles,
            PowerSupervisory,
            Temperature,
            AnalogZone,
            PhoneKey,
            IntercomKey,
        ];
        ALL.get(code as usize).copied()
    }
}

impl fmt::Display for ZoneDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ZoneDefinition::*;
        f.write_str(match self {
            Disabled => "Disabled",
            BurglarEntryExit1 => "Burglar Entry/Exit 1",
            BurglarEntryExit2 => "Burglar Entry/Exit 2",
            BurglarPerimeterInstant => "Burglar Perimeter Instant",
            BurglarInterior => "Burglar Interior",
            BurglarInteriorFollower => "Burglar Interior Follower",
            BurglarInteriorNight => "Burglar Interior Night",
            BurglarInteriorNightDelay => "Burglar Interior Night Delay",
            Burglar24Hour => "Burglar 24 Hour",
            BurglarBoxTamper => "Burglar Box Tamper",
            FireAlarm => "Fire Alarm",
            FireVerified => "Fire Verified",
            FireSupervisory => "Fire Supervisory",
            AuxAlarm1 => "Aux Alarm 1",
            AuxAlarm2 => "Aux Alarm 2",
            Keyfob => "Keyfob",
            NonAlarm => "Non Alarm",
            CarbonMonoxide => "Carbon Monoxide",
            EmergencyAlarm => "Emergency Alarm",
            FreezeAlarm => "Freeze Alarm",
            GasAlarm => "Gas Alarm",
            HeatAlarm => "Heat Alarm",
            MedicalAlarm => "Medical Alarm",
            PoliceAlarm => "Police Alarm",
            PoliceNoIndication => "Police No Indication",
            WaterAlarm => "Water Alarm",
            KeyMomentaryArmDisarm => "Key Momentary Arm / Disarm",
            KeyMomentaryArmAway => "Key Momentary Arm Away",
            KeyMomentaryArmStay => "Key Momentary Arm Stay",
            KeyMomentaryDisarm => "Key Momentary Disarm",
            KeyOnOff => "Key On/Off",
            MuteAudibles => "Mute Audibles",
            PowerSupervisory => "Power Supervisory",
            Temperature => "Temperature",
            AnalogZone => "Analog Zone",
            PhoneKey => "Phone Key",
            IntercomKey => "Intercom Key",
        })
    }
}

/// Alarm configuration assigned to a zone (the first 26 definition codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAlarmConfig(pub u8);

impl ZoneAlarmConfig {
    pub fn from_code(code: u8) -> Option<Self> {
        (code <= 25).then_some(Self(code))
    }

    pub fn is_disabled(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ZoneAlarmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ZoneDefinition::from_code(self.0) {
            Some(def) => write!(f, "{def}"),
            None => write!(f, "Alarm {}", self.0),
        }
    }
}

/// One panel input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Wire-facing number, 1..=208
    pub number: u16,
    /// Owning area, 0 when unassigned
    #[serde(default)]
    pub area: u8,
    #[serde(default)]
    pub state: Option<ZoneState>,
    #[serde(default)]
    pub status: Option<ZoneStatus>,
    #[serde(default)]
    pub definition: Option<ZoneDefinition>,
    #[serde(default)]
    pub alarm: Option<ZoneAlarmConfig>,
    /// Analog zone voltage, when probed
    #[serde(default)]
    pub voltage: Option<f32>,
    /// Probe temperature in degrees Fahrenheit; `None` when no sensor
    #[serde(default)]
    pub temp: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Zone {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            area: 0,
            state: None,
            status: None,
            definition: None,
            alarm: None,
            voltage: None,
            temp: None,
            description: None,
            updated_at: None,
        }
    }

    /// A zone is enabled once state, definition, and alarm are all known,
    /// unless it is both unconfigured and defined disabled.
    pub fn enabled(&self) -> bool {
        match (self.state, self.definition, self.alarm) {
            (Some(state), Some(definition), Some(_)) => {
                !(state == ZoneState::Unconfigured && definition == ZoneDefinition::Disabled)
            }
            _ => false,
        }
    }

    /// Whether a temperature probe has reported on this zone.
    pub fn temp_enabled(&self) -> bool {
        self.temp.is_some()
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "Zone ", self.number)
    }

    pub(crate) fn set_state_status(&mut self, state: u8, status: u8, at: DateTime<Utc>) -> bool {
        let state = ZoneState::from_code(state);
        let status = ZoneStatus::from_code(status);
        if self.state == state && self.status == status {
            return false;
        }
        self.state = state;
        self.status = status;
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_definition(&mut self, code: u8, at: DateTime<Utc>) -> bool {
        let definition = ZoneDefinition::from_code(code);
        if self.definition == definition {
            return false;
        }
        self.definition = definition;
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_alarm(&mut self, code: u8, at: DateTime<Utc>) -> bool {
        let alarm = ZoneAlarmConfig::from_code(code);
        if self.alarm == alarm {
            return false;
        }
        self.alarm = alarm;
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_area(&mut self, area: u8, at: DateTime<Utc>) -> bool {
        if self.area == area {
            return false;
        }
        self.area = area;
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_voltage(&mut self, volts: f32, at: DateTime<Utc>) -> bool {
        if self.voltage == Some(volts) {
            return false;
        }
        self.voltage = Some(volts);
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_temp(&mut self, temp: Option<i32>, at: DateTime<Utc>) -> bool {
        if self.temp == temp {
            return false;
        }
        self.temp = temp;
        self.updated_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_requires_known_fields() {
        let mut zone = Zone::new(1);
        assert!(!zone.enabled());
        let now = Utc::now();
        zone.set_state_status(1, 0, now);
        zone.set_definition(3, now);
        assert!(!zone.enabled());
        zone.set_alarm(3, now);
        assert!(zone.enabled());
    }

    #[test]
    fn unconfigured_disabled_zone_is_not_enabled() {
        let mut zone = Zone::new(1);
        let now = Utc::now();
        zone.set_state_status(0, 0, now);
        zone.set_definition(0, now);
        zone.set_alarm(0, now);
        assert!(!zone.enabled());
    }

    #[test]
    fn unchanged_updates_report_no_change() {
        let mut zone = Zone::new(7);
        let now = Utc::now();
        assert!(zone.set_state_status(1, 2, now));
        assert!(!zone.set_state_status(1, 2, now));
        assert!(zone.set_definition(16, now));
        assert!(!zone.set_definition(16, now));
    }

    #[test]
    fn definition_codes_cover_full_range() {
        assert_eq!(ZoneDefinition::from_code(0), Some(ZoneDefinition::Disabled));
        assert_eq!(ZoneDefinition::from_code(33), Some(ZoneDefinition::Temperature));
        assert_eq!(ZoneDefinition::from_code(34), Some(ZoneDefinition::AnalogZone));
        assert_eq!(ZoneDefinition::from_code(36), Some(ZoneDefinition::IntercomKey));
        assert_eq!(ZoneDefinition::from_code(37), None);
    }
}
