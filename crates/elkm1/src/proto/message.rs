//! Message kinds and per-tag payload schemas
//!
//! Every message the panel can emit or accept is named by a two-character
//! tag. Requests are lowercase, reports and replies uppercase; `a:` is a
//! legal tag (the colon is the tenth value of the wide alphabet used by the
//! arm-level field). Kinds the runtime routes get a typed decode struct
//! here; the remaining kinds are recognized but passed through opaque.

use crate::error::FrameError;

use super::frame::Frame;

/// Closed enumeration of every known message tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // Panel / programming mode
    ElkRpStatus,
    InstallerExit,
    TroubleStatusRequest,
    TroubleStatusReply,

    // Arming and alarms
    Disarm,
    ArmAway,
    ArmStay,
    ArmStayInstant,
    ArmNight,
    ArmNightInstant,
    ArmVacation,
    ArmNextAway,
    ArmNextStay,
    ArmForceAway,
    ArmForceStay,
    ArmingStatusRequest,
    ArmingStatusReport,
    AlarmByZoneRequest,
    AlarmByZoneReport,
    AlarmMemory,
    EntryExitTimer,
    UserCodeEntered,

    // Keypads
    KeypadAreaRequest,
    KeypadAreaReply,
    KeypadStatusRequest,
    KeypadStatusReport,
    KeypadPressRequest,
    KeypadPressReply,
    KeypadText,

    // Temperatures and thermostats
    TempAllRequest,
    TempAllReply,
    TempRequest,
    TempReply,
    ThermostatDataRequest,
    ThermostatDataReply,
    ThermostatSet,
    Omnistat2Request,
    Omnistat2Reply,

    // Voice
    SpeakWord,
    SpeakPhrase,

    // Tasks
    TaskActivate,
    TaskUpdate,

    // Version
    VersionRequest,
    VersionReply,

    // Outputs
    OutputUpdate,
    OutputOff,
    OutputOn,
    OutputStatusRequest,
    OutputStatusReport,
    OutputToggle,

    // Zones
    ZoneUpdate,
    ZoneBypassRequest,
    ZoneBypassReply,
    ZonePartitionRequest,
    ZonePartitionReport,
    ZoneStatusRequest,
    ZoneStatusReport,
    ZoneDefinitionRequest,
    ZoneDefinitionReply,
    ZoneTrigger,
    ZoneVoltageRequest,
    ZoneVoltageReply,

    // Power-line control
    PlcControl,
    PlcChangeUpdate,
    PlcTurnOff,
    PlcTurnOn,
    PlcStatusRequest,
    PlcStatusReply,
    PlcToggle,

    // Custom settings and counters
    ValueRead,
    ValueReadAll,
    ValueReadReply,
    ValueWrite,
    CounterRead,
    CounterWrite,
    CounterReply,

    // Real-time clock
    RtcRequest,
    RtcReply,
    RtcWrite,

    // Descriptions and heartbeat
    DescriptionRequest,
    DescriptionReply,
    EthernetHeartbeat,
}

impl MessageKind {
    /// Look up a kind by wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        use MessageKind::*;
        Some(match tag {
            "RP" => ElkRpStatus,
            "IE" => InstallerExit,
            "ss" => TroubleStatusRequest,
            "SS" => TroubleStatusReply,
            "a0" => Disarm,
            "a1" => ArmAway,
            "a2" => ArmStay,
            "a3" => ArmStayInstant,
            "a4" => ArmNight,
            "a5" => ArmNightInstant,
            "a6" => ArmVacation,
            "a7" => ArmNextAway,
            "a8" => ArmNextStay,
            "a9" => ArmForceAway,
            "a:" => ArmForceStay,
            "as" => ArmingStatusRequest,
            "AS" => ArmingStatusReport,
            "az" => AlarmByZoneRequest,
            "AZ" => AlarmByZoneReport,
            "AM" => AlarmMemory,
            "EE" => EntryExitTimer,
            "IC" => UserCodeEntered,
            "ka" => KeypadAreaRequest,
            "KA" => KeypadAreaReply,
            "kc" => KeypadStatusRequest,
            "KC" => KeypadStatusReport,
            "kf" => KeypadPressRequest,
            "KF" => KeypadPressReply,
            "dm" => KeypadText,
            "lw" => TempAllRequest,
            "LW" => TempAllReply,
            "st" => TempRequest,
            "ST" => TempReply,
            "tr" => ThermostatDataRequest,
            "TR" => ThermostatDataReply,
            "ts" => ThermostatSet,
            "t2" => Omnistat2Request,
            "T2" => Omnistat2Reply,
            "sw" => SpeakWord,
            "sp" => SpeakPhrase,
            "tn" => TaskActivate,
            "TC" => TaskUpdate,
            "vn" => VersionRequest,
            "VN" => VersionReply,
            "CC" => OutputUpdate,
            "cf" => OutputOff,
            "cn" => OutputOn,
            "cs" => OutputStatusRequest,
            "CS" => OutputStatusReport,
            "ct" => OutputToggle,
            "ZC" => ZoneUpdate,
            "zb" => ZoneBypassRequest,
            "ZB" => ZoneBypassReply,
            "zp" => ZonePartitionRequest,
            "ZP" => ZonePartitionReport,
            "zs" => ZoneStatusRequest,
            "ZS" => ZoneStatusReport,
            "zd" => ZoneDefinitionRequest,
            "ZD" => ZoneDefinitionReply,
            "zt" => ZoneTrigger,
            "zv" => ZoneVoltageRequest,
            "ZV" => ZoneVoltageReply,
            "pc" => PlcControl,
            "PC" => PlcChangeUpdate,
            "pf" => PlcTurnOff,
            "pn" => PlcTurnOn,
            "ps" => PlcStatusRequest,
            "PS" => PlcStatusReply,
            "pt" => PlcToggle,
            "cr" => ValueRead,
            "cp" => ValueReadAll,
            "CR" => ValueReadReply,
            "cw" => ValueWrite,
            "cv" => CounterRead,
            "cx" => CounterWrite,
            "CV" => CounterReply,
            "rr" => RtcRequest,
            "RR" => RtcReply,
            "rw" => RtcWrite,
            "sd" => DescriptionRequest,
            "SD" => DescriptionReply,
            "XK" => EthernetHeartbeat,
            _ => return None,
        })
    }

    /// Wire tag for this kind.
    pub fn tag(&self) -> &'static str {
        use MessageKind::*;
        match self {
            ElkRpStatus => "RP",
            InstallerExit => "IE",
            TroubleStatusRequest => "ss",
            TroubleStatusReply => "SS",
            Disarm => "a0",
            ArmAway => "a1",
            ArmStay => "a2",
            ArmStayInstant => "a3",
            ArmNight => "a4",
            ArmNightInstant => "a5",
            ArmVacation => "a6",
            ArmNextAway => "a7",
            ArmNextStay => "a8",
            ArmForceAway => "a9",
            ArmForceStay => "a:",
            ArmingStatusRequest => "as",
            ArmingStatusReport => "AS",
            AlarmByZoneRequest => "az",
            AlarmByZoneReport => "AZ",
            AlarmMemory => "AM",
            EntryExitTimer => "EE",
            UserCodeEntered => "IC",
            KeypadAreaRequest => "ka",
            KeypadAreaReply => "KA",
            KeypadStatusRequest => "kc",
            KeypadStatusReport => "KC",
            KeypadPressRequest => "kf",
            KeypadPressReply => "KF",
            KeypadText => "dm",
            TempAllRequest => "lw",
            TempAllReply => "LW",
            TempRequest => "st",
            TempReply => "ST",
            ThermostatDataRequest => "tr",
            ThermostatDataReply => "TR",
            ThermostatSet => "ts",
            Omnistat2Request => "t2",
            Omnistat2Reply => "T2",
            SpeakWord => "sw",
            SpeakPhrase => "sp",
            TaskActivate => "tn",
            TaskUpdate => "TC",
            VersionRequest => "vn",
            VersionReply => "VN",
            OutputUpdate => "CC",
            OutputOff => "cf",
            OutputOn => "cn",
            OutputStatusRequest => "cs",
            OutputStatusReport => "CS",
            OutputToggle => "ct",
            ZoneUpdate => "ZC",
            ZoneBypassRequest => "zb",
            ZoneBypassReply => "ZB",
            ZonePartitionRequest => "zp",
            ZonePartitionReport => "ZP",
            ZoneStatusRequest => "zs",
            ZoneStatusReport => "ZS",
            ZoneDefinitionRequest => "zd",
            ZoneDefinitionReply => "ZD",
            ZoneTrigger => "zt",
            ZoneVoltageRequest => "zv",
            ZoneVoltageReply => "ZV",
            PlcControl => "pc",
            PlcChangeUpdate => "PC",
            PlcTurnOff => "pf",
            PlcTurnOn => "pn",
            PlcStatusRequest => "ps",
            PlcStatusReply => "PS",
            PlcToggle => "pt",
            ValueRead => "cr",
            ValueReadAll => "cp",
            ValueReadReply => "CR",
            ValueWrite => "cw",
            CounterRead => "cv",
            CounterWrite => "cx",
            CounterReply => "CV",
            RtcRequest => "rr",
            RtcReply => "RR",
            RtcWrite => "rw",
            DescriptionRequest => "sd",
            DescriptionReply => "SD",
            EthernetHeartbeat => "XK",
        }
    }
}

fn ascii_u32(ctx: &'static str, s: &str) -> Result<u32, FrameError> {
    s.parse::<u32>().map_err(|_| FrameError::BadField(ctx))
}

fn need(ctx: &'static str, data: &str, len: usize) -> Result<(), FrameError> {
    if data.len() < len {
        Err(FrameError::ShortPayload(ctx))
    } else {
        Ok(())
    }
}

/// Arming status for all eight areas.
///
/// Payload `S[8] U[8] A[8]`: armed status and arm-up readiness in true hex,
/// alarm state in the wide alphabet (alarm codes run past 15).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmingStatus {
    pub armed: [u8; 8],
    pub arm_up: [u8; 8],
    pub alarm: [u8; 8],
}

impl ArmingStatus {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("AS", &frame.data, 24)?;
        let hex = frame.dehex();
        let wide = frame.dehex_fake();
        let mut out = Self { armed: [0; 8], arm_up: [0; 8], alarm: [0; 8] };
        for i in 0..8 {
            out.armed[i] = hex[i];
            out.arm_up[i] = hex[8 + i];
            out.alarm[i] = wide[16 + i];
        }
        Ok(out)
    }
}

/// Alarm-by-zone report: one configuration code per zone, wide alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmByZone {
    pub alarms: Vec<u8>,
}

impl AlarmByZone {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("AZ", &frame.data, 208)?;
        Ok(Self { alarms: frame.dehex_fake()[..208].to_vec() })
    }
}

/// Alarm memory: one flag per area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmMemory {
    pub areas: [bool; 8],
}

impl AlarmMemory {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("AM", &frame.data, 8)?;
        let wide = frame.dehex_fake();
        let mut areas = [false; 8];
        for (i, flag) in areas.iter_mut().enumerate() {
            *flag = wide[i] != 0;
        }
        Ok(Self { areas })
    }
}

/// Entry or exit timer update for one area.
///
/// Payload `A D ttt TTT S`: ASCII decimal timers with a trailing
/// wide-alphabet armed-state nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryExitTimer {
    pub area_index: usize,
    pub entrance: bool,
    pub timer1: u16,
    pub timer2: u16,
    pub armed: u8,
}

impl EntryExitTimer {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("EE", &frame.data, 9)?;
        let d = &frame.data;
        let area = ascii_u32("EE area", &d[0..1])?;
        if !(1..=8).contains(&area) {
            return Err(FrameError::BadField("EE area"));
        }
        Ok(Self {
            area_index: area as usize - 1,
            entrance: &d[1..2] == "1",
            timer1: ascii_u32("EE timer1", &d[2..5])? as u16,
            timer2: ascii_u32("EE timer2", &d[5..8])? as u16,
            armed: frame.dehex_fake()[8],
        })
    }
}

/// User code entry at a keypad.
///
/// A user number of zero on the wire means an invalid code was keyed; the
/// decode carries that as `user: None` with the failed digits, never as
/// user zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCodeEntered {
    pub user: Option<u16>,
    pub failed_code: Option<String>,
    pub keypad_index: usize,
}

impl UserCodeEntered {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("IC", &frame.data, 17)?;
        let d = &frame.data;
        let user = ascii_u32("IC user", &d[12..15])? as u16;
        let keypad = ascii_u32("IC keypad", &d[15..17])? as usize;
        if !(1..=16).contains(&keypad) {
            return Err(FrameError::BadField("IC keypad"));
        }
        let failed_code = if user == 0 {
            // Each code digit arrives as a two-character hex pair.
            Some(d[0..12].chars().skip(1).step_by(2).collect())
        } else {
            None
        };
        Ok(Self {
            user: (user > 0).then_some(user),
            failed_code,
            keypad_index: keypad - 1,
        })
    }
}

/// Keypad-to-area assignment for all sixteen keypads (0 = unassigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadAreas {
    pub areas: [u8; 16],
}

impl KeypadAreas {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("KA", &frame.data, 16)?;
        let wide = frame.dehex_fake();
        let mut areas = [0u8; 16];
        areas.copy_from_slice(&wide[..16]);
        Ok(Self { areas })
    }
}

/// Keypad key-change report.
///
/// Payload `NN DD L[6] C P[8]`: keypad number, key number, six function-key
/// illumination levels, code-bypass flag, and per-area chime modes (the
/// chime values are area state even though they ride the keypad report).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadStatus {
    pub keypad_index: usize,
    pub key: u8,
    pub illum: [u8; 6],
    pub code_bypass: bool,
    pub chime: [u8; 8],
}

impl KeypadStatus {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("KC", &frame.data, 19)?;
        let d = &frame.data;
        let keypad = ascii_u32("KC keypad", &d[0..2])? as usize;
        if !(1..=16).contains(&keypad) {
            return Err(FrameError::BadField("KC keypad"));
        }
        let hex = frame.dehex();
        let wide = frame.dehex_fake();
        let mut illum = [0u8; 6];
        illum.copy_from_slice(&hex[4..10]);
        let mut chime = [0u8; 8];
        chime.copy_from_slice(&wide[11..19]);
        Ok(Self {
            keypad_index: keypad - 1,
            key: ascii_u32("KC key", &d[2..4])? as u8,
            illum,
            code_bypass: &d[10..11] == "1",
            chime,
        })
    }
}

/// Groups a temperature reply can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempGroup {
    Zone,
    Keypad,
    Thermostat,
}

/// Requested-temperature reply: `G NN DDD`, all ASCII decimal.
///
/// The raw value is offset on the wire: zone probes by +60, keypad and
/// thermostat probes by +40. `degrees_f` undoes the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempReply {
    pub group: TempGroup,
    pub number: usize,
    pub raw: u16,
}

impl TempReply {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("ST", &frame.data, 6)?;
        let d = &frame.data;
        let group = match &d[0..1] {
            "0" => TempGroup::Zone,
            "1" => TempGroup::Keypad,
            "2" => TempGroup::Thermostat,
            _ => return Err(FrameError::BadField("ST group")),
        };
        Ok(Self {
            group,
            number: ascii_u32("ST number", &d[1..3])? as usize,
            raw: ascii_u32("ST temp", &d[3..6])? as u16,
        })
    }

    /// True temperature in degrees Fahrenheit.
    pub fn degrees_f(&self) -> i32 {
        let offset = match self.group {
            TempGroup::Zone => 60,
            TempGroup::Keypad | TempGroup::Thermostat => 40,
        };
        i32::from(self.raw) - offset
    }
}

/// Thermostat data reply: `NN M H F TT HH SS UU`, all ASCII decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermostatData {
    pub thermostat_index: usize,
    pub mode: u8,
    pub hold: bool,
    pub fan: u8,
    pub temp: u8,
    pub setpoint_heat: u8,
    pub setpoint_cool: u8,
    pub humidity: u8,
}

impl ThermostatData {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("TR", &frame.data, 13)?;
        let d = &frame.data;
        let number = ascii_u32("TR number", &d[0..2])? as usize;
        if !(1..=16).contains(&number) {
            return Err(FrameError::BadField("TR number"));
        }
        Ok(Self {
            thermostat_index: number - 1,
            mode: ascii_u32("TR mode", &d[2..3])? as u8,
            hold: &d[3..4] == "1",
            fan: ascii_u32("TR fan", &d[4..5])? as u8,
            temp: ascii_u32("TR temp", &d[5..7])? as u8,
            setpoint_heat: ascii_u32("TR heat", &d[7..9])? as u8,
            setpoint_cool: ascii_u32("TR cool", &d[9..11])? as u8,
            humidity: ascii_u32("TR humidity", &d[11..13])? as u8,
        })
    }
}

/// Momentary task activation: `NNN R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskChange {
    pub task_index: usize,
}

impl TaskChange {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("TC", &frame.data, 3)?;
        let number = ascii_u32("TC number", &frame.data[0..3])? as usize;
        if !(1..=32).contains(&number) {
            return Err(FrameError::BadField("TC number"));
        }
        Ok(Self { task_index: number - 1 })
    }
}

/// Single output change: `ZZZ S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChange {
    pub output_index: usize,
    pub on: bool,
}

impl OutputChange {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("CC", &frame.data, 4)?;
        let number = ascii_u32("CC number", &frame.data[0..3])? as usize;
        if !(1..=208).contains(&number) {
            return Err(FrameError::BadField("CC number"));
        }
        Ok(Self { output_index: number - 1, on: &frame.data[3..4] == "1" })
    }
}

/// Output status for all 208 outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStatus {
    pub on: Vec<bool>,
}

impl OutputStatus {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("CS", &frame.data, 208)?;
        Ok(Self { on: frame.dehex_fake()[..208].iter().map(|&v| v != 0).collect() })
    }
}

/// Split a packed zone nibble into its input state and status.
///
/// Low two bits are the electrical state, the next two the status.
pub fn split_zone_nibble(nibble: u8) -> (u8, u8) {
    (nibble & 0b11, (nibble >> 2) & 0b11)
}

/// Single zone change: `ZZZ S` with a packed state/status nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneChange {
    pub zone_index: usize,
    pub state: u8,
    pub status: u8,
}

impl ZoneChange {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("ZC", &frame.data, 4)?;
        let number = ascii_u32("ZC number", &frame.data[0..3])? as usize;
        if !(1..=208).contains(&number) {
            return Err(FrameError::BadField("ZC number"));
        }
        let (state, status) = split_zone_nibble(frame.dehex()[3]);
        Ok(Self { zone_index: number - 1, state, status })
    }
}

/// Zone status for all 208 zones, one packed nibble each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatus {
    /// `(state, status)` per zone
    pub zones: Vec<(u8, u8)>,
}

impl ZoneStatus {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("ZS", &frame.data, 208)?;
        Ok(Self {
            zones: frame.dehex()[..208].iter().map(|&n| split_zone_nibble(n)).collect(),
        })
    }
}

/// Zone definition codes for all 208 zones, wide alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDefinitions {
    pub definitions: Vec<u8>,
}

impl ZoneDefinitions {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("ZD", &frame.data, 208)?;
        Ok(Self { definitions: frame.dehex_fake()[..208].to_vec() })
    }
}

/// Owning area per zone (0 = unassigned), wide alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonePartitions {
    pub areas: Vec<u8>,
}

impl ZonePartitions {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("ZP", &frame.data, 208)?;
        Ok(Self { areas: frame.dehex_fake()[..208].to_vec() })
    }
}

/// Analog zone voltage: `ZZZ DDD`, tenths of a volt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneVoltage {
    pub zone_index: usize,
    pub volts: f32,
}

impl ZoneVoltage {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("ZV", &frame.data, 6)?;
        let number = ascii_u32("ZV number", &frame.data[0..3])? as usize;
        if !(1..=208).contains(&number) {
            return Err(FrameError::BadField("ZV number"));
        }
        let tenths = ascii_u32("ZV volts", &frame.data[3..6])?;
        Ok(Self { zone_index: number - 1, volts: tenths as f32 / 10.0 })
    }
}

/// Power-line device change: `H UU LL`.
///
/// A unit of zero addresses the whole house code (all-on / all-off
/// commands); level 0 is off, 1 on, 2..=99 a dim percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlcChange {
    pub house_index: u8,
    pub unit: u8,
    pub level: u8,
}

impl PlcChange {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("PC", &frame.data, 5)?;
        let house = frame.data.as_bytes()[0];
        if !(b'A'..=b'P').contains(&house) {
            return Err(FrameError::BadField("PC house"));
        }
        let unit = ascii_u32("PC unit", &frame.data[1..3])? as u8;
        if unit > 16 {
            return Err(FrameError::BadField("PC unit"));
        }
        Ok(Self {
            house_index: house - b'A',
            unit,
            level: ascii_u32("PC level", &frame.data[3..5])? as u8,
        })
    }
}

/// Power-line status for one bank of 64 units: `B D[64]`, wide alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlcStatus {
    pub bank: u8,
    pub levels: Vec<u8>,
}

impl PlcStatus {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("PS", &frame.data, 65)?;
        let bank = ascii_u32("PS bank", &frame.data[0..1])? as u8;
        if bank > 3 {
            return Err(FrameError::BadField("PS bank"));
        }
        Ok(Self { bank, levels: frame.dehex_fake()[1..65].to_vec() })
    }
}

/// Counter value reply: `NN DDDDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterValue {
    pub counter_index: usize,
    pub value: u16,
}

impl CounterValue {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("CV", &frame.data, 7)?;
        let number = ascii_u32("CV number", &frame.data[0..2])? as usize;
        if !(1..=64).contains(&number) {
            return Err(FrameError::BadField("CV number"));
        }
        Ok(Self {
            counter_index: number - 1,
            value: ascii_u32("CV value", &frame.data[2..7])? as u16,
        })
    }
}

/// One decoded custom-setting entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingEntry {
    pub setting_index: usize,
    pub value: u16,
    pub format: u8,
}

/// Custom-setting read reply.
///
/// `NN DDDDD F` for one setting; a leading `00` instead carries all twenty
/// settings as consecutive `DDDDD F` groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingValues {
    pub entries: Vec<SettingEntry>,
}

impl SettingValues {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("CR", &frame.data, 8)?;
        let d = &frame.data;
        let number = ascii_u32("CR number", &d[0..2])? as usize;
        let mut entries = Vec::new();
        if number == 0 {
            need("CR", d, 2 + 20 * 6)?;
            for i in 0..20 {
                let off = 2 + i * 6;
                entries.push(SettingEntry {
                    setting_index: i,
                    value: ascii_u32("CR value", &d[off..off + 5])? as u16,
                    format: ascii_u32("CR format", &d[off + 5..off + 6])? as u8,
                });
            }
        } else {
            if number > 20 {
                return Err(FrameError::BadField("CR number"));
            }
            entries.push(SettingEntry {
                setting_index: number - 1,
                value: ascii_u32("CR value", &d[2..7])? as u16,
                format: ascii_u32("CR format", &d[7..8])? as u8,
            });
        }
        Ok(Self { entries })
    }
}

/// Panel and ethernet-module firmware versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub m1: String,
    pub m1xep: String,
}

impl VersionInfo {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("VN", &frame.data, 12)?;
        let d = &frame.data;
        Ok(Self {
            m1: format!("{}.{}.{}", &d[0..2], &d[2..4], &d[4..6]),
            m1xep: format!("{}.{}.{}", &d[6..8], &d[8..10], &d[10..12]),
        })
    }
}

/// Description text reply: `TT NNN` then sixteen name characters.
///
/// A reply numbered below the request means the panel wrapped past the last
/// set description; the scanner uses that to end its traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub desc_type: u8,
    pub number: usize,
    pub name: String,
}

impl Description {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("SD", &frame.data, 21)?;
        let d = &frame.data;
        // The panel sets the high bit of the first name character on
        // entries flagged to show on keypads; mask it back to ASCII.
        let mut name: String = d[5..21].to_string();
        if let Some(first) = name.as_bytes().first().copied() {
            if first >= 0x80 {
                name.replace_range(0..1, &((first & 0x7F) as char).to_string());
            }
        }
        Ok(Self {
            desc_type: ascii_u32("SD type", &d[0..2])? as u8,
            number: ascii_u32("SD number", &d[2..5])? as usize,
            name: name.trim_end().to_string(),
        })
    }
}

/// Remote-programming status: `0` disconnected, `1` connected, `2`
/// initializing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElkRp {
    pub status: u8,
}

impl ElkRp {
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        need("RP", &frame.data, 1)?;
        Ok(Self { status: ascii_u32("RP status", &frame.data[0..1])? as u8 })
    }
}

/// Builders for every request frame the runtime sends.
pub mod requests {
    use super::{Frame, MessageKind};

    pub fn arming_status() -> Frame {
        Frame::new(MessageKind::ArmingStatusRequest)
    }

    pub fn alarm_by_zone() -> Frame {
        Frame::new(MessageKind::AlarmByZoneRequest)
    }

    /// Arm or disarm one area. The user code is left-zero-padded to six
    /// digits on the wire, so four-digit codes become `00XXXX`.
    pub fn arm(kind: MessageKind, area_number: u8, user_code: &str) -> Frame {
        Frame::with_data(kind, format!("{area_number}{user_code:0>6}"))
    }

    pub fn zone_status() -> Frame {
        Frame::new(MessageKind::ZoneStatusRequest)
    }

    pub fn zone_definition() -> Frame {
        Frame::new(MessageKind::ZoneDefinitionRequest)
    }

    pub fn zone_partition() -> Frame {
        Frame::new(MessageKind::ZonePartitionRequest)
    }

    pub fn zone_voltage(zone_number: u16) -> Frame {
        Frame::with_data(MessageKind::ZoneVoltageRequest, format!("{zone_number:03}"))
    }

    /// Temperature probe: group 0 zones, 1 keypads, 2 thermostats.
    pub fn temp(group: u8, number: u16) -> Frame {
        Frame::with_data(MessageKind::TempRequest, format!("{group}{number:02}"))
    }

    pub fn output_status() -> Frame {
        Frame::new(MessageKind::OutputStatusRequest)
    }

    pub fn output_on(output_number: u16, duration_s: u16) -> Frame {
        Frame::with_data(
            MessageKind::OutputOn,
            format!("{output_number:03}{duration_s:05}"),
        )
    }

    pub fn output_off(output_number: u16) -> Frame {
        Frame::with_data(MessageKind::OutputOff, format!("{output_number:03}"))
    }

    pub fn output_toggle(output_number: u16) -> Frame {
        Frame::with_data(MessageKind::OutputToggle, format!("{output_number:03}"))
    }

    pub fn task_activate(task_number: u16) -> Frame {
        Frame::with_data(MessageKind::TaskActivate, format!("{task_number:03}"))
    }

    pub fn keypad_areas() -> Frame {
        Frame::new(MessageKind::KeypadAreaRequest)
    }

    pub fn keypad_status(keypad_number: u16) -> Frame {
        Frame::with_data(MessageKind::KeypadStatusRequest, format!("{keypad_number:02}"))
    }

    pub fn thermostat_data(thermostat_number: u16) -> Frame {
        Frame::with_data(
            MessageKind::ThermostatDataRequest,
            format!("{thermostat_number:02}"),
        )
    }

    /// Set one thermostat element: `NN VV E`.
    pub fn thermostat_set(thermostat_number: u16, value: u8, element: u8) -> Frame {
        Frame::with_data(
            MessageKind::ThermostatSet,
            format!("{thermostat_number:02}{value:02}{element}"),
        )
    }

    /// Generic power-line control: `H UU FF EE TTTT`.
    pub fn plc_control(house: char, unit: u8, function: u8, extended: u8, duration_s: u16) -> Frame {
        let duration = duration_s.min(9999);
        Frame::with_data(
            MessageKind::PlcControl,
            format!("{house}{unit:02}{function:02}{extended:02}{duration:04}"),
        )
    }

    pub fn plc_on(house: char, unit: u8) -> Frame {
        Frame::with_data(MessageKind::PlcTurnOn, format!("{house}{unit:02}"))
    }

    pub fn plc_off(house: char, unit: u8) -> Frame {
        Frame::with_data(MessageKind::PlcTurnOff, format!("{house}{unit:02}"))
    }

    pub fn plc_toggle(house: char, unit: u8) -> Frame {
        Frame::with_data(MessageKind::PlcToggle, format!("{house}{unit:02}"))
    }

    pub fn plc_status(bank: u8) -> Frame {
        Frame::with_data(MessageKind::PlcStatusRequest, format!("{bank}"))
    }

    pub fn counter_read(counter_number: u16) -> Frame {
        Frame::with_data(MessageKind::CounterRead, format!("{counter_number:02}"))
    }

    pub fn counter_write(counter_number: u16, value: u16) -> Frame {
        Frame::with_data(
            MessageKind::CounterWrite,
            format!("{counter_number:02}{value:05}"),
        )
    }

    pub fn value_read(setting_number: u16) -> Frame {
        Frame::with_data(MessageKind::ValueRead, format!("{setting_number:02}"))
    }

    pub fn value_read_all() -> Frame {
        Frame::new(MessageKind::ValueReadAll)
    }

    pub fn value_write(setting_number: u16, raw_value: u16) -> Frame {
        Frame::with_data(
            MessageKind::ValueWrite,
            format!("{setting_number:02}{raw_value:05}"),
        )
    }

    pub fn version() -> Frame {
        Frame::new(MessageKind::VersionRequest)
    }

    /// Description request: `TT NNN`.
    pub fn description(desc_type: u8, number: u16) -> Frame {
        Frame::with_data(
            MessageKind::DescriptionRequest,
            format!("{desc_type:02}{number:03}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: MessageKind, data: &str) -> Frame {
        Frame::with_data(kind, data)
    }

    #[test]
    fn tag_round_trips_for_every_kind() {
        let tags = [
            "RP", "IE", "ss", "SS", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8",
            "a9", "a:", "as", "AS", "az", "AZ", "AM", "EE", "IC", "ka", "KA", "kc", "KC",
            "kf", "KF", "dm", "lw", "LW", "st", "ST", "tr", "TR", "ts", "t2", "T2", "sw",
            "sp", "tn", "TC", "vn", "VN", "CC", "cf", "cn", "cs", "CS", "ct", "ZC", "zb",
            "ZB", "zp", "ZP", "zs", "ZS", "zd", "ZD", "zt", "zv", "ZV", "pc", "PC", "pf",
            "pn", "ps", "PS", "pt", "cr", "cp", "CR", "cw", "cv", "cx", "CV", "rr", "RR",
            "rw", "sd", "SD", "XK",
        ];
        for tag in tags {
            let kind = MessageKind::from_tag(tag).unwrap_or_else(|| panic!("tag {tag}"));
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(MessageKind::from_tag("qq"), None);
    }

    #[test]
    fn arming_status_splits_dialects() {
        // Area 1 armed away, arm-up fully armed, alarm code 17 (fire
        // supervisory, past the true-hex range).
        let data = format!("{}{}{}", "10000000", "40000000", "A0000000");
        let st = ArmingStatus::decode(&frame(MessageKind::ArmingStatusReport, &data)).unwrap();
        assert_eq!(st.armed[0], 1);
        assert_eq!(st.arm_up[0], 4);
        assert_eq!(st.alarm[0], 17);
    }

    #[test]
    fn entry_exit_timer_mixes_decimal_and_wide() {
        let ee = EntryExitTimer::decode(&frame(MessageKind::EntryExitTimer, "21060120:")).unwrap();
        assert_eq!(ee.area_index, 1);
        assert!(ee.entrance);
        assert_eq!(ee.timer1, 60);
        assert_eq!(ee.timer2, 120);
        assert_eq!(ee.armed, 10);
    }

    #[test]
    fn user_code_zero_is_invalid_sentinel() {
        let ic = UserCodeEntered::decode(&frame(
            MessageKind::UserCodeEntered,
            "00000000000000502",
        ))
        .unwrap();
        assert_eq!(ic.user, Some(5));
        assert_eq!(ic.failed_code, None);
        assert_eq!(ic.keypad_index, 1);

        let bad = UserCodeEntered::decode(&frame(
            MessageKind::UserCodeEntered,
            "01020304050600003",
        ))
        .unwrap();
        assert_eq!(bad.user, None);
        assert_eq!(bad.failed_code.as_deref(), Some("123456"));
        assert_eq!(bad.keypad_index, 2);
    }

    #[test]
    fn zone_nibble_splits_state_and_status() {
        // 0xC = 0b1100: unconfigured input, bypassed status
        assert_eq!(split_zone_nibble(12), (0, 3));
        let zc = ZoneChange::decode(&frame(MessageKind::ZoneUpdate, "005C")).unwrap();
        assert_eq!(zc.zone_index, 4);
        assert_eq!(zc.state, 0);
        assert_eq!(zc.status, 3);
    }

    #[test]
    fn zone_status_report_covers_all_zones() {
        let data = format!("9{}", "0".repeat(207));
        let zs = ZoneStatus::decode(&frame(MessageKind::ZoneStatusReport, &data)).unwrap();
        assert_eq!(zs.zones.len(), 208);
        // 9 = 0b1001: short input, violated status
        assert_eq!(zs.zones[0], (1, 2));
        assert_eq!(zs.zones[1], (0, 0));
    }

    #[test]
    fn plc_status_carries_bank_and_levels() {
        let data = format!("1{}{}", "0".repeat(2), format!("5{}", "0".repeat(61)));
        let ps = PlcStatus::decode(&frame(MessageKind::PlcStatusReply, &data)).unwrap();
        assert_eq!(ps.bank, 1);
        assert_eq!(ps.levels.len(), 64);
        assert_eq!(ps.levels[2], 5);
    }

    #[test]
    fn setting_reply_single_and_bulk() {
        let one = SettingValues::decode(&frame(MessageKind::ValueReadReply, "03123450")).unwrap();
        assert_eq!(one.entries.len(), 1);
        assert_eq!(one.entries[0].setting_index, 2);
        assert_eq!(one.entries[0].value, 12345);
        assert_eq!(one.entries[0].format, 0);

        let mut bulk = String::from("00");
        for i in 0..20 {
            bulk.push_str(&format!("{:05}1", i * 100));
        }
        let all = SettingValues::decode(&frame(MessageKind::ValueReadReply, &bulk)).unwrap();
        assert_eq!(all.entries.len(), 20);
        assert_eq!(all.entries[19].value, 1900);
        assert_eq!(all.entries[19].format, 1);
    }

    #[test]
    fn version_reply_formats_dotted() {
        let data = format!("050312010200{}", "0".repeat(36));
        let vn = VersionInfo::decode(&frame(MessageKind::VersionReply, &data)).unwrap();
        assert_eq!(vn.m1, "05.03.12");
        assert_eq!(vn.m1xep, "01.02.00");
    }

    #[test]
    fn description_trims_and_masks_keypad_flag() {
        let sd = Description::decode(&frame(
            MessageKind::DescriptionReply,
            "00004Front Door      ",
        ))
        .unwrap();
        assert_eq!(sd.desc_type, 0);
        assert_eq!(sd.number, 4);
        assert_eq!(sd.name, "Front Door");
    }

    #[test]
    fn arm_request_pads_user_code() {
        let f = requests::arm(MessageKind::ArmAway, 1, "1234");
        assert_eq!(f.data, "1001234");
        let f6 = requests::arm(MessageKind::Disarm, 3, "123456");
        assert_eq!(f6.data, "3123456");
    }

    #[test]
    fn temp_reply_offsets_by_group() {
        let zone = TempReply::decode(&frame(MessageKind::TempReply, "005135")).unwrap();
        assert_eq!(zone.degrees_f(), 75);
        let keypad = TempReply::decode(&frame(MessageKind::TempReply, "103112")).unwrap();
        assert_eq!(keypad.degrees_f(), 72);
        // Raw zero decodes to the sensor-absent value.
        let absent = TempReply::decode(&frame(MessageKind::TempReply, "201000")).unwrap();
        assert_eq!(absent.degrees_f(), -40);
    }
}
