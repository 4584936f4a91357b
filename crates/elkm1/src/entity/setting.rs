//! Custom settings: panel-programmable values with three display formats

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingFormat {
    Number,
    Timer,
    TimeOfDay,
}

impl SettingFormat {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Number,
            1 => Self::Timer,
            2 => Self::TimeOfDay,
            _ => return None,
        })
    }
}

impl fmt::Display for SettingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Number => "Number",
            Self::Timer => "Timer",
            Self::TimeOfDay => "Time of Day",
        })
    }
}

/// A decoded custom-setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettingValue {
    Number { value: u16 },
    /// Seconds
    Timer { value: u16 },
    TimeOfDay { hour: u8, minute: u8 },
}

impl SettingValue {
    /// Decode a raw wire value per the reported format. Time-of-day values
    /// are packed BCD `HHMM`.
    pub fn decode(raw: u16, format: SettingFormat) -> Self {
        match format {
            SettingFormat::Number => Self::Number { value: raw },
            SettingFormat::Timer => Self::Timer { value: raw },
            SettingFormat::TimeOfDay => Self::TimeOfDay {
                hour: bcd_to_dec((raw >> 8) as u8),
                minute: bcd_to_dec((raw & 0xFF) as u8),
            },
        }
    }

    /// Pack back to the raw wire value.
    pub fn encode(&self) -> u16 {
        match *self {
            Self::Number { value } | Self::Timer { value } => value,
            Self::TimeOfDay { hour, minute } => {
                (u16::from(dec_to_bcd(hour)) << 8) | u16::from(dec_to_bcd(minute))
            }
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Number { value } => write!(f, "{value}"),
            Self::Timer { value } => write!(f, "{value}s"),
            Self::TimeOfDay { hour, minute } => write!(f, "{hour:02}:{minute:02}"),
        }
    }
}

fn bcd_to_dec(b: u8) -> u8 {
    (b >> 4) * 10 + (b & 0x0F)
}

fn dec_to_bcd(d: u8) -> u8 {
    ((d / 10) << 4) | (d % 10)
}

/// One custom setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    /// Wire-facing number, 1..=20
    pub number: u16,
    #[serde(default)]
    pub value: Option<SettingValue>,
    #[serde(default = "default_format")]
    pub format: SettingFormat,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_format() -> SettingFormat {
    SettingFormat::Number
}

impl Setting {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            value: None,
            format: SettingFormat::Number,
            description: None,
            updated_at: None,
        }
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "Custom Setting ", self.number)
    }

    pub(crate) fn set_value(&mut self, raw: u16, format_code: u8, at: DateTime<Utc>) -> bool {
        let format = SettingFormat::from_code(format_code).unwrap_or(SettingFormat::Number);
        let value = Some(SettingValue::decode(raw, format));
        if self.value == value && self.format == format {
            return false;
        }
        self.value = value;
        self.format = format;
        self.updated_at = Some(at);
        true
    }
}
