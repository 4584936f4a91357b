//! Thermostats, including the Omnistat2 register extension

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::proto::message::ThermostatData;
use crate::proto::omnistat::{omni_temp_c, registers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermostatMode {
    Off,
    Heat,
    Cool,
    Auto,
    EmergencyHeat,
}

impl ThermostatMode {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Off,
            1 => Self::Heat,
            2 => Self::Cool,
            3 => Self::Auto,
            4 => Self::EmergencyHeat,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Heat => 1,
            Self::Cool => 2,
            Self::Auto => 3,
            Self::EmergencyHeat => 4,
        }
    }
}

impl fmt::Display for ThermostatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "Off",
            Self::Heat => "Heat",
            Self::Cool => "Cool",
            Self::Auto => "Auto",
            Self::EmergencyHeat => "Emergency Heat",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermostatHold {
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermostatFan {
    Auto,
    On,
}

impl ThermostatFan {
    pub fn code(self) -> u8 {
        match self {
            Self::Auto => 0,
            Self::On => 1,
        }
    }
}

/// Element selector for thermostat set commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatElement {
    Mode,
    Hold,
    Fan,
    GetTemp,
    SetpointCool,
    SetpointHeat,
}

impl ThermostatElement {
    pub fn code(self) -> u8 {
        match self {
            Self::Mode => 0,
            Self::Hold => 1,
            Self::Fan => 2,
            Self::GetTemp => 3,
            Self::SetpointCool => 4,
            Self::SetpointHeat => 5,
        }
    }
}

/// Extra readings available when the device is an Omnistat2 behind the
/// serial expander.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OmnistatReadings {
    #[serde(default)]
    pub model: Option<u8>,
    #[serde(default)]
    pub outside_temp_c: Option<f32>,
    #[serde(default)]
    pub temp3_c: Option<f32>,
    #[serde(default)]
    pub temp4_c: Option<f32>,
    #[serde(default)]
    pub humidity: Option<u8>,
}

/// One thermostat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thermostat {
    /// Wire-facing number, 1..=16
    pub number: u16,
    #[serde(default)]
    pub mode: Option<ThermostatMode>,
    #[serde(default)]
    pub hold: Option<ThermostatHold>,
    #[serde(default)]
    pub fan: Option<ThermostatFan>,
    /// Current temperature in degrees Fahrenheit; `None` when the panel
    /// reports no reading
    #[serde(default)]
    pub temp_f: Option<i32>,
    #[serde(default)]
    pub setpoint_heat: Option<u8>,
    #[serde(default)]
    pub setpoint_cool: Option<u8>,
    #[serde(default)]
    pub humidity: Option<u8>,
    #[serde(default)]
    pub omnistat: OmnistatReadings,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Thermostat {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            mode: None,
            hold: None,
            fan: None,
            temp_f: None,
            setpoint_heat: None,
            setpoint_cool: None,
            humidity: None,
            omnistat: OmnistatReadings::default(),
            description: None,
            updated_at: None,
        }
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "Thermostat ", self.number)
    }

    /// Whether the panel has ever reported a live temperature.
    pub fn temp_enabled(&self) -> bool {
        self.temp_f.is_some()
    }

    /// Current temperature in degrees Celsius.
    pub fn temp_c(&self) -> Option<f32> {
        self.temp_f.map(|f| (f as f32 - 32.0) * 5.0 / 9.0)
    }

    pub(crate) fn set_data(&mut self, data: &ThermostatData, at: DateTime<Utc>) -> bool {
        let mode = ThermostatMode::from_code(data.mode);
        let hold = Some(if data.hold { ThermostatHold::Active } else { ThermostatHold::Inactive });
        let fan = Some(if data.fan == 1 { ThermostatFan::On } else { ThermostatFan::Auto });
        // Zero means no reading; the thermostat slot is unpopulated.
        let temp_f = (data.temp != 0).then_some(i32::from(data.temp));
        let heat = Some(data.setpoint_heat);
        let cool = Some(data.setpoint_cool);
        let humidity = Some(data.humidity);
        if self.mode == mode
            && self.hold == hold
            && self.fan == fan
            && self.temp_f == temp_f
            && self.setpoint_heat == heat
            && self.setpoint_cool == cool
            && self.humidity == humidity
        {
            return false;
        }
        self.mode = mode;
        self.hold = hold;
        self.fan = fan;
        self.temp_f = temp_f;
        self.setpoint_heat = heat;
        self.setpoint_cool = cool;
        self.humidity = humidity;
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_temp(&mut self, temp: Option<i32>, at: DateTime<Utc>) -> bool {
        if self.temp_f == temp {
            return false;
        }
        self.temp_f = temp;
        self.updated_at = Some(at);
        true
    }

    /// Apply one Omnistat2 register value. Registers outside the decoded
    /// subset are logged and ignored.
    pub(crate) fn apply_register(&mut self, register: u8, value: u8, at: DateTime<Utc>) -> bool {
        let changed = match register {
            registers::MODEL => {
                let model = Some(value);
                let changed = self.omnistat.model != model;
                self.omnistat.model = model;
                changed
            }
            registers::CURRENT_TEMP => {
                let temp_f = Some((omni_temp_c(value) * 9.0 / 5.0 + 32.0).round() as i32);
                let changed = self.temp_f != temp_f;
                self.temp_f = temp_f;
                changed
            }
            registers::OUTSIDE_TEMP => {
                let temp = Some(omni_temp_c(value));
                let changed = self.omnistat.outside_temp_c != temp;
                self.omnistat.outside_temp_c = temp;
                changed
            }
            registers::TEMP_3 => {
                let temp = Some(omni_temp_c(value));
                let changed = self.omnistat.temp3_c != temp;
                self.omnistat.temp3_c = temp;
                changed
            }
            registers::TEMP_4 => {
                let temp = Some(omni_temp_c(value));
                let changed = self.omnistat.temp4_c != temp;
                self.omnistat.temp4_c = temp;
                changed
            }
            registers::HUMIDITY => {
                let humidity = Some(value);
                let changed = self.omnistat.humidity != humidity;
                self.omnistat.humidity = humidity;
                self.humidity = humidity;
                changed
            }
            other => {
                debug!(thermostat = self.number, register = other, value, "ignoring register");
                false
            }
        };
        if changed {
            self.updated_at = Some(at);
        }
        changed
    }
}
