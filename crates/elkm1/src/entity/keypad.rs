//! Keypads: user input devices bound to one area

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keys a keypad can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeypadKey {
    None,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Digit0,
    Star,
    Pound,
    F1,
    F2,
    F3,
    F4,
    Stay,
    Exit,
    Chime,
    Bypass,
    Elk,
    Down,
    Up,
    Right,
    Left,
    F5,
    F6,
    DataKeyMode,
}

impl KeypadKey {
    pub fn from_code(code: u8) -> Option<Self> {
        use KeypadKey::*;
        const ALL: [KeypadKey; 29] = [
            None, Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9,
            Digit0, Star, Pound, F1, F2, F3, F4, Stay, Exit, Chime, Bypass, Elk, Down, Up,
            Right, Left, F5, F6, DataKeyMode,
        ];
        ALL.get(code as usize).copied()
    }
}

impl fmt::Display for KeypadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use KeypadKey::*;
        f.write_str(match self {
            None => "None",
            Digit1 => "1",
            Digit2 => "2",
            Digit3 => "3",
            Digit4 => "4",
            Digit5 => "5",
            Digit6 => "6",
            Digit7 => "7",
            Digit8 => "8",
            Digit9 => "9",
            Digit0 => "0",
            Star => "*",
            Pound => "#",
            F1 => "F1",
            F2 => "F2",
            F3 => "F3",
            F4 => "F4",
            Stay => "Stay",
            Exit => "Exit",
            Chime => "Chime",
            Bypass => "Bypass",
            Elk => "Elk",
            Down => "Down",
            Up => "Up",
            Right => "Right",
            Left => "Left",
            F5 => "F5",
            F6 => "F6",
            DataKeyMode => "Data Entered",
        })
    }
}

/// One keypad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypad {
    /// Wire-facing number, 1..=16
    pub number: u16,
    /// Owning area, 0 when unassigned
    #[serde(default)]
    pub area: u8,
    #[serde(default)]
    pub last_key: Option<KeypadKey>,
    /// Function-key illumination levels
    #[serde(default)]
    pub illum: [u8; 6],
    /// Set while a bypass code is pending
    #[serde(default)]
    pub code_bypass: bool,
    /// Keypad temperature in degrees Fahrenheit; `None` when no sensor
    #[serde(default)]
    pub temp: Option<i32>,
    #[serde(default)]
    pub last_user_num: Option<u16>,
    #[serde(default)]
    pub last_user_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Keypad {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            area: 0,
            last_key: None,
            illum: [0; 6],
            code_bypass: false,
            temp: None,
            last_user_num: None,
            last_user_at: None,
            description: None,
            updated_at: None,
        }
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "Keypad ", self.number)
    }

    pub fn temp_enabled(&self) -> bool {
        self.temp.is_some()
    }

    pub(crate) fn set_area(&mut self, area: u8, at: DateTime<Utc>) -> bool {
        if self.area == area {
            return false;
        }
        self.area = area;
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_status(
        &mut self,
        key: u8,
        illum: [u8; 6],
        code_bypass: bool,
        at: DateTime<Utc>,
    ) -> bool {
        let key = KeypadKey::from_code(key);
        if self.last_key == key && self.illum == illum && self.code_bypass == code_bypass {
            return false;
        }
        self.last_key = key;
        self.illum = illum;
        self.code_bypass = code_bypass;
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

    pub(crate) fn note_user_code(&mut self, user: u16, at: DateTime<Utc>) -> bool {
        self.last_user_num = Some(user);
        self.last_user_at = Some(at);
        self.updated_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_codes_map_to_labels() {
        assert_eq!(KeypadKey::from_code(11), Some(KeypadKey::Star));
        assert_eq!(KeypadKey::from_code(28), Some(KeypadKey::DataKeyMode));
        assert_eq!(KeypadKey::from_code(29), None);
        assert_eq!(KeypadKey::Star.to_string(), "*");
    }

    #[test]
    fn repeated_status_is_silent() {
        let mut keypad = Keypad::new(2);
        let now = Utc::now();
        assert!(keypad.set_status(11, [0; 6], false, now));
        assert!(!keypad.set_status(11, [0; 6], false, now));
        assert!(keypad.set_status(11, [1, 0, 0, 0, 0, 0], false, now));
    }
}
