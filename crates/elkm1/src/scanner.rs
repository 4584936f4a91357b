//! Staged enumeration of every entity at connect time
//!
//! The scanner walks a fixed stage order, sending the status and
//! configuration requests for each entity class and waiting on the
//! mailbox for their replies. Description probing uses the panel's
//! skip-empty behavior: a request for an unset slot returns the next set
//! one, so the traversal costs one request per set name instead of one
//! per slot. A timeout moves on to the next stage rather than failing
//! the scan.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dispatch::Coordinator;
use crate::elk::RuntimeState;
use crate::entity::{EntityKind, ZoneDefinition};
use crate::error::FrameError;
use crate::events::Inbound;
use crate::panel::{ChangeRef, PanelState};
use crate::proto::message::{
    requests, AlarmByZone, ArmingStatus, CounterValue, Description, KeypadAreas, KeypadStatus,
    OutputStatus, PlcStatus, SettingValues, TempReply, ThermostatData, VersionInfo,
    ZoneDefinitions, ZonePartitions, ZoneStatus, ZoneVoltage,
};
use crate::proto::omnistat::Packet;
use crate::proto::{Frame, MessageKind};
use crate::queue::Pending;

/// Reply budget for the zone status report, which the panel can be slow
/// to assemble.
const ZONE_STATUS_TIMEOUT: Duration = Duration::from_secs(30);

/// Reply budget for everything else.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Scanner stages, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanStage {
    Idle,
    Start,
    Zones,
    Outputs,
    Areas,
    Keypads,
    Tasks,
    Thermostats,
    X10,
    Users,
    Counters,
    Settings,
    Version,
}

const STAGES: [ScanStage; 11] = [
    ScanStage::Zones,
    ScanStage::Outputs,
    ScanStage::Areas,
    ScanStage::Keypads,
    ScanStage::Tasks,
    ScanStage::Thermostats,
    ScanStage::X10,
    ScanStage::Users,
    ScanStage::Counters,
    ScanStage::Settings,
    ScanStage::Version,
];

impl Coordinator {
    /// Run one full enumeration pass. Entered on connect and again when
    /// the panel leaves installer mode.
    pub(crate) async fn rescan(&mut self) {
        info!("scan starting");
        self.rescan_in_progress = true;
        self.stage = ScanStage::Start;
        for stage in STAGES {
            if self.is_shutdown() || self.rescan_requested {
                break;
            }
            self.stage = stage;
            debug!(?stage, "scan stage");
            match stage {
                ScanStage::Zones => self.scan_zones().await,
                ScanStage::Outputs => self.scan_outputs().await,
                ScanStage::Areas => self.scan_areas().await,
                ScanStage::Keypads => self.scan_keypads().await,
                ScanStage::Tasks => self.scan_descriptions(EntityKind::Task).await,
                ScanStage::Thermostats => self.scan_thermostats().await,
                ScanStage::X10 => self.scan_x10().await,
                ScanStage::Users => self.scan_descriptions(EntityKind::User).await,
                ScanStage::Counters => self.scan_counters().await,
                ScanStage::Settings => self.scan_settings().await,
                ScanStage::Version => self.scan_version().await,
                ScanStage::Idle | ScanStage::Start => {}
            }
            // Keep non-scanner traffic flowing between stages.
            self.process_pass().await;
        }
        self.rescan_in_progress = false;
        self.stage = ScanStage::Idle;
        self.set_resume_state(RuntimeState::Running);
        if *self.runtime_tx.borrow() != RuntimeState::Paused {
            let _ = self.runtime_tx.send(RuntimeState::Running);
        }
        info!("scan complete");
    }

    /// Send a request and wait for its reply kind, optionally matched on
    /// a payload prefix.
    async fn exchange(
        &self,
        request: Frame,
        reply: MessageKind,
        prefix: Option<String>,
        timeout: Duration,
    ) -> Option<Inbound> {
        self.queue.push(Pending::new(request));
        self.mailbox.wait_for(reply, prefix.as_deref(), timeout).await
    }

    /// Decode a scanner reply and apply it to the arena, firing callbacks.
    async fn apply_reply<T>(
        &self,
        decoded: Result<T, FrameError>,
        apply: impl FnOnce(&mut PanelState, &T) -> Vec<ChangeRef>,
    ) {
        match decoded {
            Ok(value) => {
                let changes = {
                    let mut panel = self.panel.write().await;
                    apply(&mut panel, &value)
                };
                self.emit_changes(&changes).await;
            }
            Err(e) => warn!(stage = ?self.stage, error = %e, "undecodable scan reply"),
        }
    }

    async fn scan_zones(&mut self) {
        if let Some(inbound) = self
            .exchange(requests::zone_status(), MessageKind::ZoneStatusReport, None, ZONE_STATUS_TIMEOUT)
            .await
        {
            self.apply_reply(ZoneStatus::decode(&inbound.frame), |p, d| {
                p.apply_zone_status(d, inbound.at)
            })
            .await;
        } else {
            warn!("no zone status report, continuing");
            return;
        }
        if let Some(inbound) = self
            .exchange(requests::alarm_by_zone(), MessageKind::AlarmByZoneReport, None, REPLY_TIMEOUT)
            .await
        {
            self.apply_reply(AlarmByZone::decode(&inbound.frame), |p, d| {
                p.apply_alarm_by_zone(d, inbound.at)
            })
            .await;
        }
        if let Some(inbound) = self
            .exchange(requests::zone_definition(), MessageKind::ZoneDefinitionReply, None, REPLY_TIMEOUT)
            .await
        {
            self.apply_reply(ZoneDefinitions::decode(&inbound.frame), |p, d| {
                p.apply_zone_definitions(d, inbound.at)
            })
            .await;
        }
        if let Some(inbound) = self
            .exchange(requests::zone_partition(), MessageKind::ZonePartitionReport, None, REPLY_TIMEOUT)
            .await
        {
            self.apply_reply(ZonePartitions::decode(&inbound.frame), |p, d| {
                p.apply_zone_partitions(d, inbound.at)
            })
            .await;
        }

        // Analog zones report a voltage, temperature zones a probe value.
        let (analog, temperature) = {
            let panel = self.panel.read().await;
            let mask = self.masks.get(EntityKind::Zone);
            let analog: Vec<u16> = panel
                .zones
                .iter()
                .filter(|z| {
                    mask[usize::from(z.number) - 1]
                        && z.definition == Some(ZoneDefinition::AnalogZone)
                })
                .map(|z| z.number)
                .collect();
            let temperature: Vec<u16> = panel
                .zones
                .iter()
                .take(16)
                .filter(|z| {
                    mask[usize::from(z.number) - 1]
                        && z.definition == Some(ZoneDefinition::Temperature)
                })
                .map(|z| z.number)
                .collect();
            (analog, temperature)
        };
        for number in analog {
            if let Some(inbound) = self
                .exchange(
                    requests::zone_voltage(number),
                    MessageKind::ZoneVoltageReply,
                    Some(format!("{number:03}")),
                    REPLY_TIMEOUT,
                )
                .await
            {
                self.apply_reply(ZoneVoltage::decode(&inbound.frame), |p, d| {
                    p.apply_zone_voltage(d, inbound.at)
                })
                .await;
            }
        }
        for number in temperature {
            if let Some(inbound) = self
                .exchange(
                    requests::temp(0, number),
                    MessageKind::TempReply,
                    Some(format!("0{number:02}")),
                    REPLY_TIMEOUT,
                )
                .await
            {
                self.apply_reply(TempReply::decode(&inbound.frame), |p, d| {
                    p.apply_temp_reply(d, inbound.at)
                })
                .await;
            }
        }

        self.scan_descriptions(EntityKind::Zone).await;
    }

    async fn scan_outputs(&mut self) {
        if let Some(inbound) = self
            .exchange(requests::output_status(), MessageKind::OutputStatusReport, None, REPLY_TIMEOUT)
            .await
        {
            self.apply_reply(OutputStatus::decode(&inbound.frame), |p, d| {
                p.apply_output_status(d, inbound.at)
            })
            .await;
        }
        self.scan_descriptions(EntityKind::Output).await;
    }

    async fn scan_areas(&mut self) {
        if let Some(inbound) = self
            .exchange(requests::arming_status(), MessageKind::ArmingStatusReport, None, REPLY_TIMEOUT)
            .await
        {
            self.apply_reply(ArmingStatus::decode(&inbound.frame), |p, d| {
                p.apply_arming_status(d, inbound.at)
            })
            .await;
        }
        self.scan_descriptions(EntityKind::Area).await;
    }

    async fn scan_keypads(&mut self) {
        if let Some(inbound) = self
            .exchange(requests::keypad_areas(), MessageKind::KeypadAreaReply, None, REPLY_TIMEOUT)
            .await
        {
            self.apply_reply(KeypadAreas::decode(&inbound.frame), |p, d| {
                p.apply_keypad_areas(d, inbound.at)
            })
            .await;
        } else {
            warn!("no keypad area reply, skipping keypad stage");
            return;
        }
        for number in 1..=16u16 {
            if !self.masks.included(EntityKind::Keypad, usize::from(number) - 1) {
                continue;
            }
            if let Some(inbound) = self
                .exchange(
                    requests::keypad_status(number),
                    MessageKind::KeypadStatusReport,
                    Some(format!("{number:02}")),
                    REPLY_TIMEOUT,
                )
                .await
            {
                self.apply_reply(KeypadStatus::decode(&inbound.frame), |p, d| {
                    p.apply_keypad_status(d, inbound.at)
                })
                .await;
            }
            if let Some(inbound) = self
                .exchange(
                    requests::temp(1, number),
                    MessageKind::TempReply,
                    Some(format!("1{number:02}")),
                    REPLY_TIMEOUT,
                )
                .await
            {
                self.apply_reply(TempReply::decode(&inbound.frame), |p, d| {
                    p.apply_temp_reply(d, inbound.at)
                })
                .await;
            }
        }
        self.scan_descriptions(EntityKind::Keypad).await;
    }

    async fn scan_thermostats(&mut self) {
        for number in 1..=16u16 {
            if !self.masks.included(EntityKind::Thermostat, usize::from(number) - 1) {
                continue;
            }
            let mut live = false;
            if let Some(inbound) = self
                .exchange(
                    requests::thermostat_data(number),
                    MessageKind::ThermostatDataReply,
                    Some(format!("{number:02}")),
                    REPLY_TIMEOUT,
                )
                .await
            {
                if let Ok(data) = ThermostatData::decode(&inbound.frame) {
                    live = data.temp != 0;
                    self.apply_reply(Ok(data), |p: &mut PanelState, d: &ThermostatData| {
                        p.apply_thermostat_data(d, inbound.at)
                    })
                    .await;
                }
            }
            // Only populated slots are worth an Omnistat probe; the
            // expander never answers for the rest.
            if live {
                let poll = Packet::poll_group(number as u8, 2);
                let reply_prefix = format!("{:02X}", 0x80 | number as u8);
                if let Some(inbound) = self
                    .exchange(
                        poll.to_frame(),
                        MessageKind::Omnistat2Reply,
                        Some(reply_prefix),
                        REPLY_TIMEOUT,
                    )
                    .await
                {
                    self.apply_reply(Packet::decode(&inbound.frame.data), |p, d| {
                        p.apply_omnistat(d, inbound.at)
                    })
                    .await;
                }
            }
        }
        self.scan_descriptions(EntityKind::Thermostat).await;
    }

    async fn scan_x10(&mut self) {
        for bank in 0..=3u8 {
            let base = usize::from(bank) * 64;
            let wanted = self.masks.get(EntityKind::X10)[base..base + 64]
                .iter()
                .any(|&included| included);
            if !wanted {
                continue;
            }
            if let Some(inbound) = self
                .exchange(
                    requests::plc_status(bank),
                    MessageKind::PlcStatusReply,
                    Some(bank.to_string()),
                    REPLY_TIMEOUT,
                )
                .await
            {
                self.apply_reply(PlcStatus::decode(&inbound.frame), |p, d| {
                    p.apply_plc_status(d, inbound.at)
                })
                .await;
            }
        }
        self.scan_descriptions(EntityKind::X10).await;
    }

    async fn scan_counters(&mut self) {
        for number in 1..=64u16 {
            if !self.masks.included(EntityKind::Counter, usize::from(number) - 1) {
                continue;
            }
            if let Some(inbound) = self
                .exchange(
                    requests::counter_read(number),
                    MessageKind::CounterReply,
                    Some(format!("{number:02}")),
                    REPLY_TIMEOUT,
                )
                .await
            {
                self.apply_reply(CounterValue::decode(&inbound.frame), |p, d| {
                    p.apply_counter(d, inbound.at)
                })
                .await;
            }
        }
        self.scan_descriptions(EntityKind::Counter).await;
    }

    async fn scan_settings(&mut self) {
        if let Some(inbound) = self
            .exchange(requests::value_read_all(), MessageKind::ValueReadReply, None, REPLY_TIMEOUT)
            .await
        {
            self.apply_reply(SettingValues::decode(&inbound.frame), |p, d| {
                p.apply_settings(d, inbound.at)
            })
            .await;
        }
        self.scan_descriptions(EntityKind::Setting).await;
    }

    async fn scan_version(&mut self) {
        if let Some(inbound) = self
            .exchange(requests::version(), MessageKind::VersionReply, None, REPLY_TIMEOUT)
            .await
        {
            match VersionInfo::decode(&inbound.frame) {
                Ok(version) => {
                    info!(m1 = %version.m1, m1xep = %version.m1xep, "panel version");
                    self.panel.write().await.apply_version(version);
                }
                Err(e) => warn!(error = %e, "bad version reply"),
            }
        }
    }

    /// Walk descriptions for one entity class using the panel's
    /// skip-empty traversal. The panel answers a request for an unset
    /// slot with the next set one; a reply numbered below the request
    /// means it wrapped, so the walk is done.
    async fn scan_descriptions(&mut self, kind: EntityKind) {
        let Some(desc_type) = kind.description_type() else { return };
        let capacity = kind.capacity();
        let mut next = 1usize;
        while next <= capacity {
            if self.is_shutdown() {
                return;
            }
            let Some(inbound) = self
                .exchange(
                    requests::description(desc_type, next as u16),
                    MessageKind::DescriptionReply,
                    Some(format!("{desc_type:02}")),
                    REPLY_TIMEOUT,
                )
                .await
            else {
                warn!(?kind, next, "description scan timed out");
                return;
            };
            let reply = match Description::decode(&inbound.frame) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(?kind, error = %e, "bad description reply");
                    return;
                }
            };
            if reply.number == 0 || reply.number < next {
                break;
            }
            let changes = {
                let mut panel = self.panel.write().await;
                panel.apply_description(&reply, inbound.at)
            };
            self.emit_changes(&changes).await;
            next = reply.number + 1;
        }
        debug!(?kind, "descriptions scanned");
    }
}
