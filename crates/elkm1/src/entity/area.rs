//! Areas: independently armable partitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::proto::MessageKind;

/// How long after a user-code entry an arming transition is still
/// attributed to that user.
const USER_ATTRIBUTION_WINDOW_MS: i64 = 1_000;

/// Arm levels a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmLevel {
    Disarm,
    Away,
    Stay,
    StayInstant,
    Night,
    NightInstant,
    Vacation,
    NextAway,
    NextStay,
    ForceAway,
    ForceStay,
}

impl ArmLevel {
    /// The request kind carrying this level.
    pub fn message_kind(self) -> MessageKind {
        match self {
            Self::Disarm => MessageKind::Disarm,
            Self::Away => MessageKind::ArmAway,
            Self::Stay => MessageKind::ArmStay,
            Self::StayInstant => MessageKind::ArmStayInstant,
            Self::Night => MessageKind::ArmNight,
            Self::NightInstant => MessageKind::ArmNightInstant,
            Self::Vacation => MessageKind::ArmVacation,
            Self::NextAway => MessageKind::ArmNextAway,
            Self::NextStay => MessageKind::ArmNextStay,
            Self::ForceAway => MessageKind::ArmForceAway,
            Self::ForceStay => MessageKind::ArmForceStay,
        }
    }
}

/// Armed state as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmedState {
    Disarmed,
    ArmedAway,
    ArmedStay,
    ArmedStayInstant,
    ArmedNight,
    ArmedNightInstant,
    ArmedVacation,
}

impl ArmedState {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Disarmed,
            1 => Self::ArmedAway,
            2 => Self::ArmedStay,
            3 => Self::ArmedStayInstant,
            4 => Self::ArmedNight,
            5 => Self::ArmedNightInstant,
            6 => Self::ArmedVacation,
            _ => return None,
        })
    }
}

impl fmt::Display for ArmedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disarmed => "Disarmed",
            Self::ArmedAway => "Armed Away",
            Self::ArmedStay => "Armed Stay",
            Self::ArmedStayInstant => "Armed Stay Instant",
            Self::ArmedNight => "Armed to Night",
            Self::ArmedNightInstant => "Armed to Night Instant",
            Self::ArmedVacation => "Armed to Vacation",
        })
    }
}

/// Effective area status, combining the armed state with alarm and timer
/// activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaStatus {
    Disarmed,
    ArmedAway,
    ArmedStay,
    ArmedStayInstant,
    ArmedNight,
    ArmedNightInstant,
    ArmedVacation,
    AlarmPending,
    AlarmTriggered,
    EntryTimerRunning,
    ExitTimerRunning,
}

/// Readiness to arm, distinct from the armed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmUpState {
    NotReady,
    Ready,
    ReadyViolatedBypass,
    ArmedExitTimer,
    Armed,
    ForceArmedViolated,
    ArmedBypass,
}

impl ArmUpState {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::NotReady,
            1 => Self::Ready,
            2 => Self::ReadyViolatedBypass,
            3 => Self::ArmedExitTimer,
            4 => Self::Armed,
            5 => Self::ForceArmedViolated,
            6 => Self::ArmedBypass,
            _ => return None,
        })
    }
}

/// Active alarm kind for an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaAlarm {
    None,
    EntranceDelay,
    AbortDelay,
    FullFire,
    FullMedical,
    FullPolice,
    FullBurglar,
    FullAux1,
    FullAux2,
    FullAux3,
    FullAux4,
    FullCarbonMonoxide,
    FullEmergency,
    FullFreeze,
    FullGas,
    FullHeat,
    FullWater,
    FullFireSupervisory,
    FullFireVerify,
}

impl AreaAlarm {
    pub fn from_code(code: u8) -> Option<Self> {
        use AreaAlarm::*;
        const ALL: [AreaAlarm; 19] = [
            None,
            EntranceDelay,
            AbortDelay,
            FullFire,
            FullMedical,
            FullPolice,
            FullBurglar,
            FullAux1,
            FullAux2,
            FullAux3,
            FullAux4,
            FullCarbonMonoxide,
            FullEmergency,
            FullFreeze,
            FullGas,
            FullHeat,
            FullWater,
            FullFireSupervisory,
            FullFireVerify,
        ];
        ALL.get(code as usize).copied()
    }
}

impl fmt::Display for AreaAlarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AreaAlarm::*;
        f.write_str(match self {
            None => "No Alarm Active",
            EntranceDelay => "Entrance Delay is Active",
            AbortDelay => "Alarm Abort Delay Active",
            FullFire => "Fire Alarm",
            FullMedical => "Medical Alarm",
            FullPolice => "Police Alarm",
            FullBurglar => "Burglar Alarm",
            FullAux1 => "Aux 1 Alarm",
            FullAux2 => "Aux 2 Alarm",
            FullAux3 => "Aux 3 Alarm",
            FullAux4 => "Aux 4 Alarm",
            FullCarbonMonoxide => "Carbon Monoxide Alarm",
            FullEmergency => "Emergency Alarm",
            FullFreeze => "Freeze Alarm",
            FullGas => "Gas Alarm",
            FullHeat => "Heat Alarm",
            FullWater => "Water Alarm",
            FullFireSupervisory => "Fire Supervisory",
            FullFireVerify => "Verify Fire",
        })
    }
}

/// Chime configuration, reported per area through keypad status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChimeMode {
    Off,
    SingleBeep,
    ConstantBeep,
    BothBeep,
    Chime,
    ChimeSingleBeep,
    ChimeConstantBeep,
    ChimeBothBeep,
}

impl ChimeMode {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0b0000 => Self::Off,
            0b0001 => Self::SingleBeep,
            0b0010 => Self::ConstantBeep,
            0b0011 => Self::BothBeep,
            0b1000 => Self::Chime,
            0b1001 => Self::ChimeSingleBeep,
            0b1010 => Self::ChimeConstantBeep,
            0b1011 => Self::ChimeBothBeep,
            _ => return None,
        })
    }
}

/// One alarm partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Wire-facing number, 1..=8
    pub number: u16,
    #[serde(default)]
    pub armed: Option<ArmedState>,
    #[serde(default)]
    pub arm_up: Option<ArmUpState>,
    #[serde(default)]
    pub alarm: Option<AreaAlarm>,
    #[serde(default)]
    pub chime: Option<ChimeMode>,
    /// Alarm memory flag from the panel
    #[serde(default)]
    pub alarm_memory: bool,
    #[serde(default)]
    pub timer_entrance_1: u16,
    #[serde(default)]
    pub timer_entrance_2: u16,
    #[serde(default)]
    pub timer_exit_1: u16,
    #[serde(default)]
    pub timer_exit_2: u16,
    /// Last user who keyed a code on a keypad of this area
    #[serde(default)]
    pub last_user_num: Option<u16>,
    #[serde(default)]
    pub last_user_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_armed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_armed_by: Option<u16>,
    #[serde(default)]
    pub last_disarmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_disarmed_by: Option<u16>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Derived zone membership by zone index; rebuilt from partition
    /// reports, never persisted.
    #[serde(skip)]
    pub member_zone: Vec<bool>,
    /// Derived keypad membership by keypad index.
    #[serde(skip)]
    pub member_keypad: Vec<bool>,
}

impl Area {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            armed: None,
            arm_up: None,
            alarm: None,
            chime: None,
            alarm_memory: false,
            timer_entrance_1: 0,
            timer_entrance_2: 0,
            timer_exit_1: 0,
            timer_exit_2: 0,
            last_user_num: None,
            last_user_at: None,
            last_armed_at: None,
            last_armed_by: None,
            last_disarmed_at: None,
            last_disarmed_by: None,
            description: None,
            updated_at: None,
            member_zone: vec![false; 208],
            member_keypad: vec![false; 16],
        }
    }

    /// Reset derived membership after a snapshot restore.
    pub(crate) fn reset_membership(&mut self) {
        self.member_zone = vec![false; 208];
        self.member_keypad = vec![false; 16];
    }

    pub fn description_pretty(&self) -> String {
        super::pretty_description(self.description.as_deref(), "Area ", self.number)
    }

    /// True while any alarm other than `None` is reported.
    pub fn alarm_active(&self) -> bool {
        matches!(self.alarm, Some(alarm) if alarm != AreaAlarm::None)
    }

    /// True while any entry or exit timer is counting.
    pub fn timers_active(&self) -> bool {
        self.timer_entrance_1 > 0
            || self.timer_entrance_2 > 0
            || self.timer_exit_1 > 0
            || self.timer_exit_2 > 0
    }

    /// Effective status: alarms dominate, then running timers, then the
    /// reported armed state.
    pub fn status(&self) -> Option<AreaStatus> {
        match self.alarm {
            Some(AreaAlarm::EntranceDelay) => return Some(AreaStatus::AlarmPending),
            Some(alarm) if alarm != AreaAlarm::None => return Some(AreaStatus::AlarmTriggered),
            _ => {}
        }
        if self.timer_exit_1 > 0 || self.timer_exit_2 > 0 {
            return Some(AreaStatus::ExitTimerRunning);
        }
        if self.timer_entrance_1 > 0 || self.timer_entrance_2 > 0 {
            return Some(AreaStatus::EntryTimerRunning);
        }
        self.armed.map(|armed| match armed {
            ArmedState::Disarmed => AreaStatus::Disarmed,
            ArmedState::ArmedAway => AreaStatus::ArmedAway,
            ArmedState::ArmedStay => AreaStatus::ArmedStay,
            ArmedState::ArmedStayInstant => AreaStatus::ArmedStayInstant,
            ArmedState::ArmedNight => AreaStatus::ArmedNight,
            ArmedState::ArmedNightInstant => AreaStatus::ArmedNightInstant,
            ArmedState::ArmedVacation => AreaStatus::ArmedVacation,
        })
    }

    /// Number of member zones.
    pub fn member_zones(&self) -> usize {
        self.member_zone.iter().filter(|&&m| m).count()
    }

    /// Number of member keypads.
    pub fn member_keypads(&self) -> usize {
        self.member_keypad.iter().filter(|&&m| m).count()
    }

    /// Record a user-code entry on a keypad belonging to this area.
    pub(crate) fn note_user_code(&mut self, user: u16, at: DateTime<Utc>) {
        self.last_user_num = Some(user);
        self.last_user_at = Some(at);
    }

    /// Apply one slice of an arming status report. The armed, arm-up, and
    /// alarm fields settle together before the change is reported, and an
    /// arming transition close enough to the last code entry is attributed
    /// to that user.
    pub(crate) fn set_arming(
        &mut self,
        armed_code: u8,
        arm_up_code: u8,
        alarm_code: u8,
        at: DateTime<Utc>,
    ) -> bool {
        let armed = ArmedState::from_code(armed_code);
        let arm_up = ArmUpState::from_code(arm_up_code);
        let alarm = AreaAlarm::from_code(alarm_code);
        if self.armed == armed && self.arm_up == arm_up && self.alarm == alarm {
            return false;
        }
        self.armed = armed;
        let within_window = self
            .last_user_at
            .map(|entered| (at - entered) < Duration::milliseconds(USER_ATTRIBUTION_WINDOW_MS))
            .unwrap_or(false);
        if within_window {
            if armed == Some(ArmedState::Disarmed) {
                self.last_disarmed_at = Some(at);
                self.last_disarmed_by = self.last_user_num;
            } else {
                self.last_armed_at = Some(at);
                self.last_armed_by = self.last_user_num;
            }
        }
        self.arm_up = arm_up;
        self.alarm = alarm;
        self.updated_at = Some(at);
        true
    }

    /// Apply an entry/exit timer update. Both timers of the reported
    /// direction arrive in full on every update.
    pub(crate) fn set_entry_exit(
        &mut self,
        entrance: bool,
        timer1: u16,
        timer2: u16,
        armed_code: u8,
        at: DateTime<Utc>,
    ) -> bool {
        self.armed = ArmedState::from_code(armed_code);
        if entrance {
            self.timer_entrance_1 = timer1;
            self.timer_entrance_2 = timer2;
        } else {
            self.timer_exit_1 = timer1;
            self.timer_exit_2 = timer2;
        }
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_chime(&mut self, code: u8, at: DateTime<Utc>) -> bool {
        let chime = ChimeMode::from_code(code);
        if self.chime == chime {
            return false;
        }
        self.chime = chime;
        self.updated_at = Some(at);
        true
    }

    pub(crate) fn set_alarm_memory(&mut self, flag: bool, at: DateTime<Utc>) -> bool {
        if self.alarm_memory == flag {
            return false;
        }
        self.alarm_memory = flag;
        self.updated_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arming_transition_attributes_recent_user() {
        let mut area = Area::new(2);
        let entered = Utc::now();
        area.note_user_code(5, entered);
        let armed_at = entered + Duration::milliseconds(300);
        assert!(area.set_arming(1, 4, 0, armed_at));
        assert_eq!(area.last_armed_by, Some(5));
        assert_eq!(area.last_armed_at, Some(armed_at));
        assert_eq!(area.last_disarmed_by, None);
    }

    #[test]
    fn stale_user_entry_is_not_attributed() {
        let mut area = Area::new(1);
        let entered = Utc::now();
        area.note_user_code(7, entered);
        let armed_at = entered + Duration::milliseconds(1500);
        assert!(area.set_arming(1, 4, 0, armed_at));
        assert_eq!(area.last_armed_by, None);
    }

    #[test]
    fn disarm_attribution_targets_disarm_fields() {
        let mut area = Area::new(1);
        area.set_arming(1, 4, 0, Utc::now());
        let entered = Utc::now();
        area.note_user_code(3, entered);
        let disarmed_at = entered + Duration::milliseconds(200);
        assert!(area.set_arming(0, 1, 0, disarmed_at));
        assert_eq!(area.last_disarmed_by, Some(3));
        assert_eq!(area.last_disarmed_at, Some(disarmed_at));
    }

    #[test]
    fn status_prefers_alarm_then_timers() {
        let mut area = Area::new(1);
        let now = Utc::now();
        area.set_arming(1, 4, 0, now);
        assert_eq!(area.status(), Some(AreaStatus::ArmedAway));

        area.set_entry_exit(false, 30, 60, 1, now);
        assert_eq!(area.status(), Some(AreaStatus::ExitTimerRunning));
        area.set_entry_exit(false, 0, 0, 1, now);
        area.set_entry_exit(true, 15, 0, 1, now);
        assert_eq!(area.status(), Some(AreaStatus::EntryTimerRunning));

        area.set_arming(1, 4, 1, now);
        assert_eq!(area.status(), Some(AreaStatus::AlarmPending));
        area.set_arming(1, 4, 6, now);
        assert_eq!(area.status(), Some(AreaStatus::AlarmTriggered));
    }

    #[test]
    fn unchanged_arming_report_is_silent() {
        let mut area = Area::new(1);
        let now = Utc::now();
        assert!(area.set_arming(2, 4, 0, now));
        assert!(!area.set_arming(2, 4, 0, now));
    }
}
