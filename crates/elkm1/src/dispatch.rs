//! Inbound dispatcher: the single consumer of the mailbox
//!
//! The coordinator task owns all entity mutation. It drains the mailbox
//! in FIFO order, routes each frame to the panel arena, fires callbacks
//! with settled entity clones, runs the scanner on startup and whenever
//! the panel leaves installer mode, and tracks the remote-programming
//! pause.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::config::Masks;
use crate::elk::{CallbackRegistry, PanelEvent, RuntimeState};
use crate::events::{Inbound, Mailbox};
use crate::panel::{ChangeRef, PanelState};
use crate::proto::message::{
    AlarmByZone, AlarmMemory, ArmingStatus, CounterValue, Description, ElkRp, EntryExitTimer,
    KeypadAreas, KeypadStatus, OutputChange, OutputStatus, PlcChange, PlcStatus, SettingValues,
    TaskChange, TempReply, ThermostatData, UserCodeEntered, VersionInfo, ZoneChange,
    ZoneDefinitions, ZonePartitions, ZoneStatus,
};
use crate::proto::omnistat::Packet;
use crate::proto::MessageKind;
use crate::queue::SendQueue;
use crate::scanner::ScanStage;

/// Frames older than this are dropped instead of dispatched.
const STALE_AGE: Duration = Duration::from_secs(120);

/// How long a task stays on after its activation pulse.
pub(crate) const TASK_PULSE: Duration = Duration::from_secs(1);

/// Kinds dispatched automatically outside an explicit scanner wait.
const AUTO_PROCESS: &[MessageKind] = &[
    MessageKind::AlarmMemory,
    MessageKind::ArmingStatusReport,
    MessageKind::AlarmByZoneReport,
    MessageKind::OutputUpdate,
    MessageKind::ValueReadReply,
    MessageKind::OutputStatusReport,
    MessageKind::CounterReply,
    MessageKind::EntryExitTimer,
    MessageKind::UserCodeEntered,
    MessageKind::InstallerExit,
    MessageKind::KeypadAreaReply,
    MessageKind::KeypadStatusReport,
    MessageKind::PlcChangeUpdate,
    MessageKind::PlcStatusReply,
    MessageKind::ElkRpStatus,
    MessageKind::RtcReply,
    MessageKind::DescriptionReply,
    MessageKind::Omnistat2Reply,
    MessageKind::TaskUpdate,
    MessageKind::ThermostatDataReply,
    MessageKind::TempReply,
    MessageKind::VersionReply,
    MessageKind::EthernetHeartbeat,
    MessageKind::ZoneUpdate,
    MessageKind::ZoneDefinitionReply,
    MessageKind::ZonePartitionReport,
    MessageKind::ZoneStatusReport,
];

/// Kinds the scanner consumes through its explicit waits while a rescan
/// is in progress.
const RESCAN_BLACKLIST: &[MessageKind] =
    &[MessageKind::ZoneDefinitionReply, MessageKind::ZoneStatusReport];

/// Outcome of a dispatch pass that needs the caller to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    Rescan,
}

/// The coordinator: exclusive owner of entity mutation.
pub(crate) struct Coordinator {
    pub panel: Arc<RwLock<PanelState>>,
    pub mailbox: Arc<Mailbox>,
    pub queue: Arc<SendQueue>,
    pub callbacks: Arc<CallbackRegistry>,
    pub runtime_tx: Arc<watch::Sender<RuntimeState>>,
    pub masks: Masks,
    pub(crate) stage: ScanStage,
    pub(crate) rescan_requested: bool,
    pub(crate) rescan_in_progress: bool,
    resume_state: RuntimeState,
    task_reverts: VecDeque<(tokio::time::Instant, usize)>,
    shutdown: watch::Receiver<bool>,
    stale_dropped: u64,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        panel: Arc<RwLock<PanelState>>,
        mailbox: Arc<Mailbox>,
        queue: Arc<SendQueue>,
        callbacks: Arc<CallbackRegistry>,
        runtime_tx: Arc<watch::Sender<RuntimeState>>,
        masks: Masks,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            panel,
            mailbox,
            queue,
            callbacks,
            runtime_tx,
            masks,
            stage: ScanStage::Idle,
            rescan_requested: true,
            rescan_in_progress: false,
            resume_state: RuntimeState::Connecting,
            task_reverts: VecDeque::new(),
            shutdown,
            stale_dropped: 0,
        }
    }

    /// Main loop: scan when requested, otherwise dispatch and service
    /// task-pulse timers until shutdown.
    pub(crate) async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            while self.rescan_requested && !*self.shutdown.borrow() {
                self.rescan_requested = false;
                self.rescan().await;
            }
            // The scanner's waits consume wakeups without draining other
            // frames; catch up before sleeping.
            if !self.mailbox.is_empty() {
                self.process_pass().await;
                continue;
            }
            let mailbox = Arc::clone(&self.mailbox);
            let mut shutdown = self.shutdown.clone();
            let next_revert = self.task_reverts.front().map(|&(at, _)| at);
            tokio::select! {
                _ = mailbox.notified() => {
                    self.process_pass().await;
                }
                _ = sleep_until_opt(next_revert) => {
                    self.revert_due_tasks().await;
                }
                _ = shutdown.changed() => {}
            }
        }
        debug!("coordinator stopped");
    }

    /// Drain the mailbox. Returns early when a frame demands a rescan so
    /// the caller can start it before touching anything else.
    pub(crate) async fn process_pass(&mut self) {
        loop {
            let rescan = self.rescan_in_progress;
            let next = self
                .mailbox
                .take_next(|frame| rescan && RESCAN_BLACKLIST.contains(&frame.kind));
            let Some(inbound) = next else { break };

            if inbound.age() > STALE_AGE {
                self.stale_dropped += 1;
                warn!(
                    kind = ?inbound.frame.kind,
                    total = self.stale_dropped,
                    "dropping stale frame"
                );
                continue;
            }

            // Any inbound frame can satisfy a pending command's expected
            // reply and cancel its retry.
            self.queue.cancel_expected(&inbound.frame.match_key());

            if !AUTO_PROCESS.contains(&inbound.frame.kind) {
                debug!(kind = ?inbound.frame.kind, "ignoring unrouted frame");
                continue;
            }
            if self.dispatch(inbound).await == Some(Directive::Rescan) {
                self.rescan_requested = true;
                return;
            }
        }
    }

    /// Route one frame. Decode failures are logged and recovered locally.
    async fn dispatch(&mut self, inbound: Inbound) -> Option<Directive> {
        let frame = &inbound.frame;
        let at = inbound.at;
        macro_rules! apply {
            ($decode:expr, $apply:expr) => {
                match $decode {
                    Ok(decoded) => {
                        let changes = {
                            let mut panel = self.panel.write().await;
                            $apply(&mut *panel, &decoded)
                        };
                        self.emit_changes(&changes).await;
                    }
                    Err(e) => warn!(kind = ?frame.kind, error = %e, "dropping undecodable frame"),
                }
            };
        }

        match frame.kind {
            MessageKind::InstallerExit => {
                info!("panel left installer mode, rescanning");
                return Some(Directive::Rescan);
            }
            MessageKind::ElkRpStatus => match ElkRp::decode(frame) {
                Ok(rp) => self.apply_elkrp(rp.status),
                Err(e) => warn!(error = %e, "bad remote-programming status"),
            },
            MessageKind::EthernetHeartbeat => {
                self.panel.write().await.note_heartbeat(at);
            }
            MessageKind::RtcReply => {
                debug!(data = %frame.data, "clock report");
            }
            MessageKind::ArmingStatusReport => {
                apply!(ArmingStatus::decode(frame), |p: &mut PanelState, d| p
                    .apply_arming_status(d, at))
            }
            MessageKind::AlarmMemory => {
                apply!(AlarmMemory::decode(frame), |p: &mut PanelState, d| p
                    .apply_alarm_memory(d, at))
            }
            MessageKind::AlarmByZoneReport => {
                apply!(AlarmByZone::decode(frame), |p: &mut PanelState, d| p
                    .apply_alarm_by_zone(d, at))
            }
            MessageKind::EntryExitTimer => {
                apply!(EntryExitTimer::decode(frame), |p: &mut PanelState, d| p
                    .apply_entry_exit(d, at))
            }
            MessageKind::UserCodeEntered => {
                apply!(UserCodeEntered::decode(frame), |p: &mut PanelState, d| p
                    .apply_user_code(d, at))
            }
            MessageKind::KeypadAreaReply => {
                apply!(KeypadAreas::decode(frame), |p: &mut PanelState, d| p
                    .apply_keypad_areas(d, at))
            }
            MessageKind::KeypadStatusReport => {
                apply!(KeypadStatus::decode(frame), |p: &mut PanelState, d| p
                    .apply_keypad_status(d, at))
            }
            MessageKind::TaskUpdate => match TaskChange::decode(frame) {
                Ok(change) => {
                    let changes = {
                        let mut panel = self.panel.write().await;
                        panel.apply_task_update(&change, at)
                    };
                    self.emit_changes(&changes).await;
                    self.task_reverts
                        .push_back((tokio::time::Instant::now() + TASK_PULSE, change.task_index));
                }
                Err(e) => warn!(error = %e, "bad task update"),
            },
            MessageKind::OutputUpdate => {
                apply!(OutputChange::decode(frame), |p: &mut PanelState, d| p
                    .apply_output_update(d, at))
            }
            MessageKind::OutputStatusReport => {
                apply!(OutputStatus::decode(frame), |p: &mut PanelState, d| p
                    .apply_output_status(d, at))
            }
            MessageKind::ZoneUpdate => {
                apply!(ZoneChange::decode(frame), |p: &mut PanelState, d| p
                    .apply_zone_update(d, at))
            }
            MessageKind::ZoneStatusReport => {
                apply!(ZoneStatus::decode(frame), |p: &mut PanelState, d| p
                    .apply_zone_status(d, at))
            }
            MessageKind::ZoneDefinitionReply => {
                apply!(ZoneDefinitions::decode(frame), |p: &mut PanelState, d| p
                    .apply_zone_definitions(d, at))
            }
            MessageKind::ZonePartitionReport => {
                apply!(ZonePartitions::decode(frame), |p: &mut PanelState, d| p
                    .apply_zone_partitions(d, at))
            }
            MessageKind::TempReply => {
                apply!(TempReply::decode(frame), |p: &mut PanelState, d| p
                    .apply_temp_reply(d, at))
            }
            MessageKind::ThermostatDataReply => {
                apply!(ThermostatData::decode(frame), |p: &mut PanelState, d| p
                    .apply_thermostat_data(d, at))
            }
            MessageKind::Omnistat2Reply => {
                apply!(Packet::decode(&frame.data), |p: &mut PanelState, d| p
                    .apply_omnistat(d, at))
            }
            MessageKind::PlcChangeUpdate => {
                apply!(PlcChange::decode(frame), |p: &mut PanelState, d| p
                    .apply_plc_change(d, at))
            }
            MessageKind::PlcStatusReply => {
                apply!(PlcStatus::decode(frame), |p: &mut PanelState, d| p
                    .apply_plc_status(d, at))
            }
            MessageKind::CounterReply => {
                apply!(CounterValue::decode(frame), |p: &mut PanelState, d| p
                    .apply_counter(d, at))
            }
            MessageKind::ValueReadReply => {
                apply!(SettingValues::decode(frame), |p: &mut PanelState, d| p
                    .apply_settings(d, at))
            }
            MessageKind::DescriptionReply => {
                apply!(Description::decode(frame), |p: &mut PanelState, d| p
                    .apply_description(d, at))
            }
            MessageKind::VersionReply => match VersionInfo::decode(frame) {
                Ok(version) => {
                    info!(m1 = %version.m1, m1xep = %version.m1xep, "panel version");
                    self.panel.write().await.apply_version(version);
                }
                Err(e) => warn!(error = %e, "bad version reply"),
            },
            other => debug!(kind = ?other, "no route for frame"),
        }
        None
    }

    /// Remote-programming transitions. A connect latches the pause until
    /// the panel reports the session gone; commands queued meanwhile are
    /// stale by then and get flushed rather than sent.
    fn apply_elkrp(&mut self, status: u8) {
        match status {
            0 => {
                if *self.runtime_tx.borrow() == RuntimeState::Paused {
                    let flushed = self.queue.flush();
                    self.queue.set_paused(false);
                    info!(flushed, resume = ?self.resume_state, "remote programming disconnected");
                    let _ = self.runtime_tx.send(self.resume_state);
                }
            }
            1 | 2 => {
                if *self.runtime_tx.borrow() != RuntimeState::Paused {
                    self.resume_state = *self.runtime_tx.borrow();
                    self.queue.set_paused(true);
                    info!(status, "remote programming connected, pausing");
                    let _ = self.runtime_tx.send(RuntimeState::Paused);
                }
            }
            other => warn!(status = other, "unknown remote-programming status"),
        }
    }

    /// Whether shutdown has been signalled.
    pub(crate) fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// State to return to when a remote-programming pause lifts.
    pub(crate) fn set_resume_state(&mut self, state: RuntimeState) {
        self.resume_state = state;
    }

    /// Fire callbacks for the given changes with settled entity clones.
    pub(crate) async fn emit_changes(&self, changes: &[ChangeRef]) {
        if changes.is_empty() {
            return;
        }
        let panel = self.panel.read().await;
        for &change in changes {
            let event = PanelEvent::capture(&panel, change);
            self.callbacks.emit(change, event);
        }
    }

    /// Return pulsed tasks to off once their grace period elapses.
    async fn revert_due_tasks(&mut self) {
        let now = tokio::time::Instant::now();
        while let Some(&(at, index)) = self.task_reverts.front() {
            if at > now {
                break;
            }
            self.task_reverts.pop_front();
            let changes = {
                let mut panel = self.panel.write().await;
                panel.revert_task(index, chrono::Utc::now())
            };
            self.emit_changes(&changes).await;
        }
    }
}

async fn sleep_until_opt(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
