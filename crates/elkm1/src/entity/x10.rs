//! Power-line (X10) devices: 16 house codes of 16 units each

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// X10 house code `A`..`P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HouseCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
}

impl HouseCode {
    pub fn from_index(index: u8) -> Option<Self> {
        use HouseCode::*;
        const ALL: [HouseCode; 16] = [A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P];
        ALL.get(index as usize).copied()
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() && upper <= 'P' {
            Self::from_index(upper as u8 - b'A')
        } else {
            None
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn letter(self) -> char {
        (b'A' + self.index()) as char
    }
}

impl fmt::Display for HouseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Convert a house/unit pair to the flat device index 0..=255.
///
/// Every derivation between the two forms goes through this pair of
/// helpers so the mapping cannot drift.
pub fn device_index(house: HouseCode, unit: u8) -> usize {
    usize::from(house.index()) * 16 + usize::from(unit - 1)
}

/// Convert a flat device index back to its house/unit pair.
pub fn device_address(index: usize) -> (HouseCode, u8) {
    let house = HouseCode::from_index((index / 16) as u8).unwrap_or(HouseCode::A);
    (house, (index % 16) as u8 + 1)
}

/// Function codes for the generic power-line control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum X10Function {
    AllUnitsOff,
    AllLightsOn,
    UnitOn,
    UnitOff,
    Dim,
    Bright,
    AllLightsOff,
    ExtendedCode,
    PresetDim,
    ExtendedData,
    StatusRequest,
    HailRequest,
    HailAck,
    StatusOn,
    StatusOff,
}

impl X10Function {
    pub fn code(self) -> u8 {
        match self {
            Self::AllUnitsOff => 1,
            Self::AllLightsOn => 2,
            Self::UnitOn => 3,
            Self::UnitOff => 4,
            Self::Dim => 5,
            Self::Bright => 6,
            Self::AllLightsOff => 7,
            Self::ExtendedCode => 8,
            Self::PresetDim => 9,
            Self::ExtendedData => 10,
            Self::StatusRequest => 11,
            Self::HailRequest => 12,
            Self::HailAck => 13,
            Self::StatusOn => 14,
            Self::StatusOff => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum X10Status {
    Off,
    On,
    Dimmed,
}

impl fmt::Display for X10Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "Off",
            Self::On => "On",
            Self::Dimmed => "Dimmed",
        })
    }
}

/// One power-line device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct X10Device {
    pub house: HouseCode,
    /// Unit code, 1..=16
    pub unit: u8,
    #[serde(default)]
    pub status: Option<X10Status>,
    /// Brightness percent: 0 off, 100 full on, 2..=99 dimmed
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl X10Device {
    pub fn new(index: usize) -> Self {
        let (house, unit) = device_address(index);
        Self { house, unit, status: None, level: 0, description: None, updated_at: None }
    }

    /// Flat index of this device.
    pub fn index(&self) -> usize {
        device_index(self.house, self.unit)
    }

    /// Devices with no description programmed are considered absent.
    pub fn enabled(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.is_empty())
    }

    pub fn description_pretty(&self) -> String {
        match self.description.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => format!("Light {}{}", self.house.letter(), self.unit),
        }
    }

    /// Apply a level report: 0 off, 1 full on, anything else a dim level.
    pub(crate) fn set_level_state(&mut self, level: u8, at: DateTime<Utc>) -> bool {
        let (status, level) = match level {
            0 => (X10Status::Off, 0),
            1 => (X10Status::On, 100),
            dim => (X10Status::Dimmed, dim),
        };
        if self.status == Some(status) && self.level == level {
            return false;
        }
        self.status = Some(status);
        self.level = level;
        self.updated_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn house_unit_index_is_bijective() {
        for index in 0..256 {
            let (house, unit) = device_address(index);
            assert_eq!(device_index(house, unit), index);
        }
        assert_eq!(device_index(HouseCode::A, 1), 0);
        assert_eq!(device_index(HouseCode::P, 16), 255);
        assert_eq!(device_address(66), (HouseCode::E, 3));
    }

    #[test]
    fn letters_round_trip() {
        assert_eq!(HouseCode::from_letter('c'), Some(HouseCode::C));
        assert_eq!(HouseCode::from_letter('Q'), None);
        assert_eq!(HouseCode::K.letter(), 'K');
    }

    #[test]
    fn level_reports_map_to_status() {
        let mut device = X10Device::new(66);
        let now = Utc::now();
        assert!(device.set_level_state(5, now));
        assert_eq!(device.status, Some(X10Status::Dimmed));
        assert_eq!(device.level, 5);
        assert!(device.set_level_state(1, now));
        assert_eq!(device.status, Some(X10Status::On));
        assert_eq!(device.level, 100);
        assert!(device.set_level_state(0, now));
        assert_eq!(device.status, Some(X10Status::Off));
        assert_eq!(device.level, 0);
    }
}
