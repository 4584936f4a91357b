//! The entity arena and every typed update the dispatcher can apply
//!
//! `PanelState` owns all entities, created up front at fixed capacities.
//! The dispatcher (and the scanner through it) is the only writer; each
//! `apply_*` operation does the index math, maintains the cross-entity
//! invariants, and reports which entities observably changed so callbacks
//! can fire afterwards.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::entity::x10::device_index;
use crate::entity::{
    Area, Counter, EntityKind, Keypad, Output, Setting, Task, Thermostat, User, X10Device, Zone,
};
use crate::proto::message::{
    AlarmByZone, AlarmMemory, ArmingStatus, CounterValue, Description, EntryExitTimer,
    KeypadAreas, KeypadStatus, OutputChange, OutputStatus, PlcChange, PlcStatus, SettingValues,
    TaskChange, TempGroup, TempReply, ThermostatData, UserCodeEntered, VersionInfo, ZoneChange,
    ZonePartitions, ZoneStatus, ZoneVoltage,
};
use crate::proto::omnistat::Packet;

/// Reference to one entity that changed during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeRef {
    pub kind: EntityKind,
    pub index: usize,
}

impl ChangeRef {
    pub fn new(kind: EntityKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// Live mirror of the whole panel.
#[derive(Debug, Clone)]
pub struct PanelState {
    pub zones: Vec<Zone>,
    pub outputs: Vec<Output>,
    pub areas: Vec<Area>,
    pub keypads: Vec<Keypad>,
    pub thermostats: Vec<Thermostat>,
    pub x10: Vec<X10Device>,
    pub tasks: Vec<Task>,
    pub counters: Vec<Counter>,
    pub settings: Vec<Setting>,
    pub users: Vec<User>,
    pub version: Option<VersionInfo>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl PanelState {
    /// Create every entity at its fixed capacity with default values.
    pub fn new() -> Self {
        Self {
            zones: (1..=208).map(Zone::new).collect(),
            outputs: (1..=208).map(Output::new).collect(),
            areas: (1..=8).map(Area::new).collect(),
            keypads: (1..=16).map(Keypad::new).collect(),
            thermostats: (1..=16).map(Thermostat::new).collect(),
            x10: (0..256).map(X10Device::new).collect(),
            tasks: (1..=32).map(Task::new).collect(),
            counters: (1..=64).map(Counter::new).collect(),
            settings: (1..=20).map(Setting::new).collect(),
            users: (1..=203).map(User::new).collect(),
            version: None,
            last_heartbeat: None,
        }
    }

    /// Arming status fans out to all eight areas.
    pub fn apply_arming_status(&mut self, report: &ArmingStatus, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for (i, area) in self.areas.iter_mut().enumerate() {
            if area.set_arming(report.armed[i], report.arm_up[i], report.alarm[i], at) {
                changes.push(ChangeRef::new(EntityKind::Area, i));
            }
        }
        changes
    }

    pub fn apply_alarm_memory(&mut self, report: &AlarmMemory, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for (i, area) in self.areas.iter_mut().enumerate() {
            if area.set_alarm_memory(report.areas[i], at) {
                changes.push(ChangeRef::new(EntityKind::Area, i));
            }
        }
        changes
    }

    pub fn apply_entry_exit(&mut self, timer: &EntryExitTimer, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let area = &mut self.areas[timer.area_index];
        if area.set_entry_exit(timer.entrance, timer.timer1, timer.timer2, timer.armed, at) {
            vec![ChangeRef::new(EntityKind::Area, timer.area_index)]
        } else {
            Vec::new()
        }
    }

    /// A code entry lands on the keypad and, when the code named a real
    /// user, on the keypad's owning area so a following arming transition
    /// can be attributed.
    pub fn apply_user_code(&mut self, entry: &UserCodeEntered, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        let keypad = &mut self.keypads[entry.keypad_index];
        match entry.user {
            Some(user) => {
                keypad.note_user_code(user, at);
                changes.push(ChangeRef::new(EntityKind::Keypad, entry.keypad_index));
                let area = keypad.area;
                if area >= 1 && area <= 8 {
                    self.areas[usize::from(area) - 1].note_user_code(user, at);
                }
            }
            None => {
                warn!(
                    keypad = keypad.number,
                    code = entry.failed_code.as_deref().unwrap_or(""),
                    "invalid user code entered"
                );
            }
        }
        changes
    }

    pub fn apply_zone_status(&mut self, report: &ZoneStatus, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for (i, zone) in self.zones.iter_mut().enumerate() {
            let (state, status) = report.zones[i];
            if zone.set_state_status(state, status, at) {
                changes.push(ChangeRef::new(EntityKind::Zone, i));
            }
        }
        changes
    }

    pub fn apply_zone_update(&mut self, change: &ZoneChange, at: DateTime<Utc>) -> Vec<ChangeRef> {
        if self.zones[change.zone_index].set_state_status(change.state, change.status, at) {
            vec![ChangeRef::new(EntityKind::Zone, change.zone_index)]
        } else {
            Vec::new()
        }
    }

    pub fn apply_zone_definitions(
        &mut self,
        report: &crate::proto::message::ZoneDefinitions,
        at: DateTime<Utc>,
    ) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for (i, zone) in self.zones.iter_mut().enumerate() {
            if zone.set_definition(report.definitions[i], at) {
                changes.push(ChangeRef::new(EntityKind::Zone, i));
            }
        }
        changes
    }

    pub fn apply_alarm_by_zone(&mut self, report: &AlarmByZone, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for (i, zone) in self.zones.iter_mut().enumerate() {
            if zone.set_alarm(report.alarms[i], at) {
                changes.push(ChangeRef::new(EntityKind::Zone, i));
            }
        }
        changes
    }

    /// Partition report: every zone records its owning area, and the
    /// derived per-area membership is rebuilt from scratch.
    pub fn apply_zone_partitions(
        &mut self,
        report: &ZonePartitions,
        at: DateTime<Utc>,
    ) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for (i, zone) in self.zones.iter_mut().enumerate() {
            if zone.set_area(report.areas[i], at) {
                changes.push(ChangeRef::new(EntityKind::Zone, i));
            }
        }
        self.rebuild_zone_membership();
        changes
    }

    fn rebuild_zone_membership(&mut self) {
        for area in &mut self.areas {
            area.member_zone.iter_mut().for_each(|m| *m = false);
        }
        for (i, zone) in self.zones.iter().enumerate() {
            let area = zone.area;
            if area >= 1 && area <= 8 {
                self.areas[usize::from(area) - 1].member_zone[i] = true;
            }
        }
    }

    pub fn apply_zone_voltage(&mut self, report: &ZoneVoltage, at: DateTime<Utc>) -> Vec<ChangeRef> {
        if self.zones[report.zone_index].set_voltage(report.volts, at) {
            vec![ChangeRef::new(EntityKind::Zone, report.zone_index)]
        } else {
            Vec::new()
        }
    }

    /// Temperature replies route by group: zones 1..=16, keypads, or
    /// thermostats. For keypads and thermostats a raw reading of zero
    /// means no probe is attached; zone probes are only ever polled when
    /// the zone is defined as a temperature input, so their readings are
    /// taken as-is (raw zero is a real -60 F).
    pub fn apply_temp_reply(&mut self, reply: &TempReply, at: DateTime<Utc>) -> Vec<ChangeRef> {
        if reply.number == 0 {
            return Vec::new();
        }
        let index = reply.number - 1;
        let gated = (reply.raw != 0).then(|| reply.degrees_f());
        match reply.group {
            TempGroup::Zone if index < 16 => {
                if self.zones[index].set_temp(Some(reply.degrees_f()), at) {
                    return vec![ChangeRef::new(EntityKind::Zone, index)];
                }
            }
            TempGroup::Keypad if index < 16 => {
                if self.keypads[index].set_temp(gated, at) {
                    return vec![ChangeRef::new(EntityKind::Keypad, index)];
                }
            }
            TempGroup::Thermostat if index < 16 => {
                if self.thermostats[index].set_temp(gated, at) {
                    return vec![ChangeRef::new(EntityKind::Thermostat, index)];
                }
            }
            _ => debug!(?reply, "temperature reply out of range"),
        }
        Vec::new()
    }

    pub fn apply_output_status(&mut self, report: &OutputStatus, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for (i, output) in self.outputs.iter_mut().enumerate() {
            if output.set_status(report.on[i], at) {
                changes.push(ChangeRef::new(EntityKind::Output, i));
            }
        }
        changes
    }

    pub fn apply_output_update(&mut self, change: &OutputChange, at: DateTime<Utc>) -> Vec<ChangeRef> {
        if self.outputs[change.output_index].set_status(change.on, at) {
            vec![ChangeRef::new(EntityKind::Output, change.output_index)]
        } else {
            Vec::new()
        }
    }

    /// Keypad area assignments, with the derived per-area keypad
    /// membership rebuilt the same way zone membership is.
    pub fn apply_keypad_areas(&mut self, report: &KeypadAreas, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for (i, keypad) in self.keypads.iter_mut().enumerate() {
            if keypad.set_area(report.areas[i], at) {
                changes.push(ChangeRef::new(EntityKind::Keypad, i));
            }
        }
        self.rebuild_keypad_membership();
        changes
    }

    fn rebuild_keypad_membership(&mut self) {
        for area in &mut self.areas {
            area.member_keypad.iter_mut().for_each(|m| *m = false);
        }
        for (i, keypad) in self.keypads.iter().enumerate() {
            let area = keypad.area;
            if area >= 1 && area <= 8 {
                self.areas[usize::from(area) - 1].member_keypad[i] = true;
            }
        }
    }

    /// Rebuild both derived membership tables from the entity-side
    /// assignments, used after a snapshot restore.
    pub(crate) fn rebuild_memberships(&mut self) {
        self.rebuild_zone_membership();
        self.rebuild_keypad_membership();
    }

    /// Keypad status report. The trailing chime values are area state even
    /// though they arrive on the keypad report.
    pub fn apply_keypad_status(&mut self, report: &KeypadStatus, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        if self.keypads[report.keypad_index].set_status(
            report.key,
            report.illum,
            report.code_bypass,
            at,
        ) {
            changes.push(ChangeRef::new(EntityKind::Keypad, report.keypad_index));
        }
        for (i, area) in self.areas.iter_mut().enumerate() {
            if area.set_chime(report.chime[i], at) {
                changes.push(ChangeRef::new(EntityKind::Area, i));
            }
        }
        changes
    }

    pub fn apply_task_update(&mut self, change: &TaskChange, at: DateTime<Utc>) -> Vec<ChangeRef> {
        self.tasks[change.task_index].activate(at);
        vec![ChangeRef::new(EntityKind::Task, change.task_index)]
    }

    /// Drop a task back to off after its activation pulse.
    pub fn revert_task(&mut self, index: usize, at: DateTime<Utc>) -> Vec<ChangeRef> {
        if self.tasks[index].revert(at) {
            vec![ChangeRef::new(EntityKind::Task, index)]
        } else {
            Vec::new()
        }
    }

    pub fn apply_thermostat_data(&mut self, data: &ThermostatData, at: DateTime<Utc>) -> Vec<ChangeRef> {
        if self.thermostats[data.thermostat_index].set_data(data, at) {
            vec![ChangeRef::new(EntityKind::Thermostat, data.thermostat_index)]
        } else {
            Vec::new()
        }
    }

    /// Apply a decoded Omnistat2 reply to its thermostat.
    pub fn apply_omnistat(&mut self, packet: &Packet, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let number = usize::from(packet.device);
        if !(1..=16).contains(&number) {
            debug!(device = packet.device, "omnistat reply for unknown device");
            return Vec::new();
        }
        let index = number - 1;
        let mut changed = false;
        for (register, value) in packet.register_values() {
            changed |= self.thermostats[index].apply_register(register, value, at);
        }
        if changed {
            vec![ChangeRef::new(EntityKind::Thermostat, index)]
        } else {
            Vec::new()
        }
    }

    /// A level change for one device, or for a whole house code when the
    /// unit is zero.
    pub fn apply_plc_change(&mut self, change: &PlcChange, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        let house_base = usize::from(change.house_index) * 16;
        let targets = if change.unit == 0 {
            house_base..house_base + 16
        } else {
            let index = house_base + usize::from(change.unit) - 1;
            index..index + 1
        };
        for index in targets {
            if self.x10[index].set_level_state(change.level, at) {
                changes.push(ChangeRef::new(EntityKind::X10, index));
            }
        }
        changes
    }

    /// One bank of 64 unit states.
    pub fn apply_plc_status(&mut self, report: &PlcStatus, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        let base = usize::from(report.bank) * 64;
        for (offset, &level) in report.levels.iter().enumerate() {
            let index = base + offset;
            if self.x10[index].set_level_state(level, at) {
                changes.push(ChangeRef::new(EntityKind::X10, index));
            }
        }
        changes
    }

    pub fn apply_counter(&mut self, value: &CounterValue, at: DateTime<Utc>) -> Vec<ChangeRef> {
        if self.counters[value.counter_index].set_value(value.value, at) {
            vec![ChangeRef::new(EntityKind::Counter, value.counter_index)]
        } else {
            Vec::new()
        }
    }

    pub fn apply_settings(&mut self, values: &SettingValues, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let mut changes = Vec::new();
        for entry in &values.entries {
            if self.settings[entry.setting_index].set_value(entry.value, entry.format, at) {
                changes.push(ChangeRef::new(EntityKind::Setting, entry.setting_index));
            }
        }
        changes
    }

    /// Store a description reply on whichever entity class it names.
    pub fn apply_description(&mut self, reply: &Description, at: DateTime<Utc>) -> Vec<ChangeRef> {
        let Some(kind) = Self::kind_for_description(reply.desc_type) else {
            debug!(desc_type = reply.desc_type, "description type not tracked");
            return Vec::new();
        };
        if reply.number == 0 || reply.number > kind.capacity() {
            return Vec::new();
        }
        let index = reply.number - 1;
        let name = (!reply.name.is_empty()).then(|| reply.name.clone());
        let slot = match kind {
            EntityKind::Zone => &mut self.zones[index].description,
            EntityKind::Area => &mut self.areas[index].description,
            EntityKind::User => &mut self.users[index].description,
            EntityKind::Keypad => &mut self.keypads[index].description,
            EntityKind::Output => &mut self.outputs[index].description,
            EntityKind::Task => &mut self.tasks[index].description,
            EntityKind::X10 => &mut self.x10[index].description,
            EntityKind::Setting => &mut self.settings[index].description,
            EntityKind::Counter => &mut self.counters[index].description,
            EntityKind::Thermostat => &mut self.thermostats[index].description,
        };
        if *slot == name {
            return Vec::new();
        }
        *slot = name;
        match kind {
            EntityKind::Zone => self.zones[index].updated_at = Some(at),
            EntityKind::Area => self.areas[index].updated_at = Some(at),
            EntityKind::User => self.users[index].updated_at = Some(at),
            EntityKind::Keypad => self.keypads[index].updated_at = Some(at),
            EntityKind::Output => self.outputs[index].updated_at = Some(at),
            EntityKind::Task => self.tasks[index].updated_at = Some(at),
            EntityKind::X10 => self.x10[index].updated_at = Some(at),
            EntityKind::Setting => self.settings[index].updated_at = Some(at),
            EntityKind::Counter => self.counters[index].updated_at = Some(at),
            EntityKind::Thermostat => self.thermostats[index].updated_at = Some(at),
        }
        vec![ChangeRef::new(kind, index)]
    }

    fn kind_for_description(desc_type: u8) -> Option<EntityKind> {
        [
            EntityKind::Zone,
            EntityKind::Output,
            EntityKind::Area,
            EntityKind::Keypad,
            EntityKind::Thermostat,
            EntityKind::X10,
            EntityKind::Task,
            EntityKind::User,
            EntityKind::Counter,
            EntityKind::Setting,
        ]
        .into_iter()
        .find(|kind| kind.description_type() == Some(desc_type))
    }

    pub fn apply_version(&mut self, version: VersionInfo) -> bool {
        if self.version.as_ref() == Some(&version) {
            return false;
        }
        self.version = Some(version);
        true
    }

    pub fn note_heartbeat(&mut self, at: DateTime<Utc>) {
        self.last_heartbeat = Some(at);
    }

    /// Look up an X10 device by address.
    pub fn x10_device(&self, house: crate::entity::HouseCode, unit: u8) -> &X10Device {
        &self.x10[device_index(house, unit)]
    }
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

// Re-exported so callers can translate between flat indices and addresses
// without reaching into the entity module.
pub use crate::entity::x10::device_address as x10_address;
pub use crate::entity::x10::device_index as x10_index;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ZoneStatus as ZoneStatusEnum;
    use crate::proto::message::{self, MessageKind};
    use crate::proto::Frame;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn partition_report_rebuilds_membership() {
        let mut panel = PanelState::new();
        let mut areas = vec![0u8; 208];
        areas[0] = 1;
        areas[5] = 1;
        areas[7] = 2;
        panel.apply_zone_partitions(&ZonePartitions { areas: areas.clone() }, now());
        assert!(panel.areas[0].member_zone[0]);
        assert!(panel.areas[0].member_zone[5]);
        assert!(panel.areas[1].member_zone[7]);
        assert_eq!(panel.areas[0].member_zones(), 2);

        // Zone 6 moves to area 2; area 1 must drop it.
        areas[5] = 2;
        panel.apply_zone_partitions(&ZonePartitions { areas }, now());
        assert!(!panel.areas[0].member_zone[5]);
        assert!(panel.areas[1].member_zone[5]);
        for (i, zone) in panel.zones.iter().enumerate() {
            let member = panel.areas[0].member_zone[i];
            assert_eq!(member, zone.area == 1, "zone {}", i + 1);
        }
    }

    #[test]
    fn user_code_then_arming_attributes_within_window() {
        let mut panel = PanelState::new();
        panel.apply_keypad_areas(
            &KeypadAreas { areas: [2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0] },
            now(),
        );
        let entered = now();
        panel.apply_user_code(
            &UserCodeEntered { user: Some(5), failed_code: None, keypad_index: 1 },
            entered,
        );
        let armed_at = entered + chrono::Duration::milliseconds(300);
        let report = ArmingStatus {
            armed: [0, 1, 0, 0, 0, 0, 0, 0],
            arm_up: [1, 4, 1, 1, 1, 1, 1, 1],
            alarm: [0; 8],
        };
        panel.apply_arming_status(&report, armed_at);
        assert_eq!(panel.areas[1].last_armed_by, Some(5));
        assert_eq!(panel.areas[1].last_armed_at, Some(armed_at));
        assert_eq!(panel.keypads[1].last_user_num, Some(5));
    }

    #[test]
    fn plc_bank_routing_offsets_by_64() {
        let mut panel = PanelState::new();
        let mut levels = vec![0u8; 64];
        levels[2] = 5;
        let changes = panel.apply_plc_status(&PlcStatus { bank: 1, levels }, now());
        let index = 64 + 2;
        assert!(changes.contains(&ChangeRef::new(EntityKind::X10, index)));
        assert_eq!(panel.x10[index].status, Some(crate::entity::X10Status::Dimmed));
        assert_eq!(panel.x10[index].level, 5);
        let (house, unit) = x10_address(index);
        assert_eq!((house, unit), (crate::entity::HouseCode::E, 3));
    }

    #[test]
    fn zone_update_routes_packed_nibble() {
        let mut panel = PanelState::new();
        let frame = Frame::with_data(MessageKind::ZoneUpdate, "005C");
        let change = message::ZoneChange::decode(&frame).unwrap();
        panel.apply_zone_update(&change, now());
        let zone = &panel.zones[4];
        assert_eq!(zone.state, Some(crate::entity::ZoneState::Unconfigured));
        assert_eq!(zone.status, Some(ZoneStatusEnum::Bypassed));
    }

    #[test]
    fn bulk_setting_reply_updates_twenty() {
        let mut panel = PanelState::new();
        let mut payload = String::from("00");
        for i in 0..20 {
            payload.push_str(&format!("{:05}0", i));
        }
        let frame = Frame::with_data(MessageKind::ValueReadReply, payload);
        let values = SettingValues::decode(&frame).unwrap();
        let changes = panel.apply_settings(&values, now());
        // Setting 1 decodes to zero which is also its unknown-to-known
        // transition, so all twenty report a change.
        assert_eq!(changes.len(), 20);
        assert_eq!(
            panel.settings[7].value,
            Some(crate::entity::SettingValue::Number { value: 7 })
        );
    }

    #[test]
    fn temp_replies_route_by_group() {
        let mut panel = PanelState::new();

        // Group 0 is a zone probe, offset by 60.
        let zone = TempReply::decode(&Frame::with_data(MessageKind::TempReply, "005135")).unwrap();
        let changes = panel.apply_temp_reply(&zone, now());
        assert_eq!(changes, vec![ChangeRef::new(EntityKind::Zone, 4)]);
        assert_eq!(panel.zones[4].temp, Some(75));

        // Group 1 is a keypad, offset by 40.
        let keypad = TempReply::decode(&Frame::with_data(MessageKind::TempReply, "103112")).unwrap();
        let changes = panel.apply_temp_reply(&keypad, now());
        assert_eq!(changes, vec![ChangeRef::new(EntityKind::Keypad, 2)]);
        assert_eq!(panel.keypads[2].temp, Some(72));
        assert!(panel.keypads[2].temp_enabled());

        // Group 2 is a thermostat; raw zero means no sensor there.
        let absent =
            TempReply::decode(&Frame::with_data(MessageKind::TempReply, "207000")).unwrap();
        assert!(panel.apply_temp_reply(&absent, now()).is_empty());
        assert_eq!(panel.thermostats[6].temp_f, None);
        assert!(!panel.thermostats[6].temp_enabled());
        let keypad_absent =
            TempReply::decode(&Frame::with_data(MessageKind::TempReply, "104000")).unwrap();
        assert!(panel.apply_temp_reply(&keypad_absent, now()).is_empty());
        assert_eq!(panel.keypads[3].temp, None);

        // A zone probe reading raw zero is a real -60 F, not an absent
        // sensor; zones are only polled when a probe is defined.
        let cold = TempReply::decode(&Frame::with_data(MessageKind::TempReply, "009000")).unwrap();
        let changes = panel.apply_temp_reply(&cold, now());
        assert_eq!(changes, vec![ChangeRef::new(EntityKind::Zone, 8)]);
        assert_eq!(panel.zones[8].temp, Some(-60));
        assert!(panel.zones[8].temp_enabled());

        let live = TempReply::decode(&Frame::with_data(MessageKind::TempReply, "207112")).unwrap();
        let changes = panel.apply_temp_reply(&live, now());
        assert_eq!(changes, vec![ChangeRef::new(EntityKind::Thermostat, 6)]);
        assert_eq!(panel.thermostats[6].temp_f, Some(72));
    }

    #[test]
    fn description_reply_lands_on_entity() {
        let mut panel = PanelState::new();
        let reply = Description { desc_type: 0, number: 4, name: "Front Door".into() };
        let changes = panel.apply_description(&reply, now());
        assert_eq!(changes, vec![ChangeRef::new(EntityKind::Zone, 3)]);
        assert_eq!(panel.zones[3].description.as_deref(), Some("Front Door"));
        assert_eq!(panel.zones[3].description_pretty(), "Front Door");
    }

    #[test]
    fn all_house_plc_change_touches_sixteen_units() {
        let mut panel = PanelState::new();
        let change = PlcChange { house_index: 2, unit: 0, level: 1 };
        let changes = panel.apply_plc_change(&change, now());
        assert_eq!(changes.len(), 16);
        assert!(panel.x10[32..48].iter().all(|d| d.level == 100));
    }
}
