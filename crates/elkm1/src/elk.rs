//! Public façade: connect, observe, command
//!
//! `Elk` owns the background tasks (reader, writer, coordinator), hands
//! out entity clones for reads, queues commands for the writer, and
//! routes change notifications. Per-entity callbacks run on the
//! coordinator task; changes with no registered listener are promoted to
//! the default broadcast stream so applications have one place to watch
//! everything.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{ElkConfig, Masks};
use crate::dispatch::Coordinator;
use crate::entity::{
    Area, ArmLevel, Counter, EntityKind, HouseCode, Keypad, Output, Setting, SettingValue, Task,
    Thermostat, ThermostatElement, ThermostatFan, ThermostatMode, User, X10Device, X10Function,
    Zone,
};
use crate::error::Error;
use crate::events::Mailbox;
use crate::panel::{ChangeRef, PanelState};
use crate::proto::message::{requests, VersionInfo};
use crate::proto::Frame;
use crate::queue::{run_writer, Pending, SendQueue};
use crate::snapshot;
use crate::transport::{self, BoxSink, BoxSource, Host};

/// Default capacity of the promoted-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Process-wide runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeState {
    Disconnected,
    Connecting,
    Running,
    /// Latched while an ElkRP remote-programming session is attached
    Paused,
}

/// A change notification carrying a settled clone of the entity.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    Zone(Zone),
    Output(Output),
    Area(Area),
    Keypad(Keypad),
    Thermostat(Thermostat),
    X10(X10Device),
    Task(Task),
    Counter(Counter),
    Setting(Setting),
    User(User),
}

impl PanelEvent {
    pub(crate) fn capture(panel: &PanelState, change: ChangeRef) -> Self {
        match change.kind {
            EntityKind::Zone => Self::Zone(panel.zones[change.index].clone()),
            EntityKind::Output => Self::Output(panel.outputs[change.index].clone()),
            EntityKind::Area => Self::Area(panel.areas[change.index].clone()),
            EntityKind::Keypad => Self::Keypad(panel.keypads[change.index].clone()),
            EntityKind::Thermostat => Self::Thermostat(panel.thermostats[change.index].clone()),
            EntityKind::X10 => Self::X10(panel.x10[change.index].clone()),
            EntityKind::Task => Self::Task(panel.tasks[change.index].clone()),
            EntityKind::Counter => Self::Counter(panel.counters[change.index].clone()),
            EntityKind::Setting => Self::Setting(panel.settings[change.index].clone()),
            EntityKind::User => Self::User(panel.users[change.index].clone()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Zone(_) => EntityKind::Zone,
            Self::Output(_) => EntityKind::Output,
            Self::Area(_) => EntityKind::Area,
            Self::Keypad(_) => EntityKind::Keypad,
            Self::Thermostat(_) => EntityKind::Thermostat,
            Self::X10(_) => EntityKind::X10,
            Self::Task(_) => EntityKind::Task,
            Self::Counter(_) => EntityKind::Counter,
            Self::Setting(_) => EntityKind::Setting,
            Self::User(_) => EntityKind::User,
        }
    }

    /// Wire-facing number of the entity that changed.
    pub fn number(&self) -> u16 {
        match self {
            Self::Zone(z) => z.number,
            Self::Output(o) => o.number,
            Self::Area(a) => a.number,
            Self::Keypad(k) => k.number,
            Self::Thermostat(t) => t.number,
            Self::X10(d) => d.index() as u16 + 1,
            Self::Task(t) => t.number,
            Self::Counter(c) => c.number,
            Self::Setting(s) => s.number,
            Self::User(u) => u.number,
        }
    }
}

/// Handle returned by `callback_add`, consumed by `callback_remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(Uuid);

type CallbackFn = Arc<dyn Fn(PanelEvent) + Send + Sync>;

/// Per-entity listeners plus the promoted default stream.
pub struct CallbackRegistry {
    listeners: StdMutex<HashMap<(EntityKind, usize), Vec<(Uuid, CallbackFn)>>>,
    owners: StdMutex<HashMap<Uuid, (EntityKind, usize)>>,
    default_tx: broadcast::Sender<PanelEvent>,
}

impl CallbackRegistry {
    pub(crate) fn new() -> Self {
        let (default_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            listeners: StdMutex::new(HashMap::new()),
            owners: StdMutex::new(HashMap::new()),
            default_tx,
        }
    }

    pub(crate) fn add(&self, kind: EntityKind, index: usize, callback: CallbackFn) -> CallbackId {
        let id = Uuid::new_v4();
        self.listeners
            .lock()
            .expect("listener lock")
            .entry((kind, index))
            .or_default()
            .push((id, callback));
        self.owners.lock().expect("owner lock").insert(id, (kind, index));
        CallbackId(id)
    }

    pub(crate) fn remove(&self, id: CallbackId) -> bool {
        let Some(slot) = self.owners.lock().expect("owner lock").remove(&id.0) else {
            return false;
        };
        let mut listeners = self.listeners.lock().expect("listener lock");
        if let Some(entries) = listeners.get_mut(&slot) {
            entries.retain(|(entry_id, _)| *entry_id != id.0);
        }
        true
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.default_tx.subscribe()
    }

    /// Invoke the entity's listeners, or promote the event to the default
    /// stream when it has none.
    pub(crate) fn emit(&self, change: ChangeRef, event: PanelEvent) {
        let callbacks: Vec<CallbackFn> = {
            let listeners = self.listeners.lock().expect("listener lock");
            listeners
                .get(&(change.kind, change.index))
                .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };
        if callbacks.is_empty() {
            let _ = self.default_tx.send(event);
            return;
        }
        for callback in callbacks {
            callback(event.clone());
        }
    }
}

/// The connected panel client.
pub struct Elk {
    config: ElkConfig,
    panel: Arc<RwLock<PanelState>>,
    queue: Arc<SendQueue>,
    mailbox: Arc<Mailbox>,
    callbacks: Arc<CallbackRegistry>,
    runtime_tx: Arc<watch::Sender<RuntimeState>>,
    runtime_rx: watch::Receiver<RuntimeState>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Elk {
    /// Validate the configuration, open the transport, and start the
    /// runtime. The connect-time scan begins immediately; state fills in
    /// as replies arrive (or instantly from the fast-load snapshot).
    pub async fn connect(config: ElkConfig) -> Result<Self, Error> {
        config.validate()?;
        let host = Host::parse(&config.host)?;
        let (source, sink) = transport::connect(&host).await?;
        Self::start(config, source, sink).await
    }

    /// Start the runtime over a caller-supplied transport. The `host`
    /// field is still validated but not opened.
    pub async fn with_transport(
        config: ElkConfig,
        source: BoxSource,
        sink: BoxSink,
    ) -> Result<Self, Error> {
        config.validate()?;
        Self::start(config, source, sink).await
    }

    async fn start(config: ElkConfig, source: BoxSource, sink: BoxSink) -> Result<Self, Error> {
        let masks = Masks::from_config(&config)?;

        let mut initial = PanelState::new();
        if config.fastload {
            if let Some(path) = &config.fastload_file {
                match snapshot::load(path).await {
                    Ok(snap) => snap.restore_into(&mut initial),
                    Err(e) => warn!(error = %e, "fast load skipped, cold start"),
                }
            }
        }

        let panel = Arc::new(RwLock::new(initial));
        let mailbox = Arc::new(Mailbox::new());
        let queue = Arc::new(SendQueue::new());
        let callbacks = Arc::new(CallbackRegistry::new());
        let (runtime_tx, runtime_rx) = watch::channel(RuntimeState::Connecting);
        let runtime_tx = Arc::new(runtime_tx);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        // Reader: transport lines into the mailbox.
        {
            let mailbox = Arc::clone(&mailbox);
            let runtime_tx = Arc::clone(&runtime_tx);
            let shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = read_loop(source, mailbox, shutdown).await {
                    error!(error = %e, "reader stopped");
                    let _ = runtime_tx.send(RuntimeState::Disconnected);
                }
                debug!("reader stopped");
            }));
        }

        // Writer: outbound queue to the transport.
        tasks.push(tokio::spawn(run_writer(
            Arc::clone(&queue),
            sink,
            config.ratelimit,
            shutdown_rx.clone(),
        )));

        // Coordinator: dispatch, scan, callbacks.
        let coordinator = Coordinator::new(
            Arc::clone(&panel),
            Arc::clone(&mailbox),
            Arc::clone(&queue),
            Arc::clone(&callbacks),
            Arc::clone(&runtime_tx),
            masks,
            shutdown_rx.clone(),
        );
        tasks.push(tokio::spawn(coordinator.run()));

        // Snapshot writer: persist on the quiet running-to-paused edge.
        if config.fastload {
            if let Some(path) = config.fastload_file.clone() {
                let panel = Arc::clone(&panel);
                let mut runtime = runtime_rx.clone();
                let mut shutdown = shutdown_rx.clone();
                tasks.push(tokio::spawn(async move {
                    let mut previous = *runtime.borrow();
                    loop {
                        tokio::select! {
                            changed = runtime.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                                let current = *runtime.borrow();
                                if previous == RuntimeState::Running
                                    && current == RuntimeState::Paused
                                {
                                    let state = panel.read().await;
                                    if let Err(e) = snapshot::save(&state, &path).await {
                                        warn!(error = %e, "snapshot save failed");
                                    }
                                }
                                previous = current;
                            }
                            _ = shutdown.changed() => break,
                        }
                    }
                }));
            }
        }

        info!(host = %config.host, "runtime started");
        Ok(Self {
            config,
            panel,
            queue,
            mailbox,
            callbacks,
            runtime_tx,
            runtime_rx,
            shutdown_tx,
            tasks,
        })
    }

    /// Current runtime state.
    pub fn runtime_state(&self) -> RuntimeState {
        *self.runtime_rx.borrow()
    }

    /// Watch runtime-state transitions.
    pub fn watch_runtime(&self) -> watch::Receiver<RuntimeState> {
        self.runtime_rx.clone()
    }

    /// Subscribe to the promoted default event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.callbacks.subscribe()
    }

    /// Register a change callback for one entity. Callbacks run on the
    /// dispatcher task and must not block; forward to your own executor
    /// for anything heavy. For power-line devices the number is the flat
    /// device index plus one.
    pub fn callback_add(
        &self,
        kind: EntityKind,
        number: u16,
        callback: impl Fn(PanelEvent) + Send + Sync + 'static,
    ) -> Result<CallbackId, Error> {
        let index = usize::from(number)
            .checked_sub(1)
            .filter(|&i| i < kind.capacity())
            .ok_or_else(|| Error::Config(format!("{kind:?} number {number} out of range")))?;
        Ok(self.callbacks.add(kind, index, Arc::new(callback)))
    }

    /// Remove a previously registered callback.
    pub fn callback_remove(&self, id: CallbackId) -> bool {
        self.callbacks.remove(id)
    }

    // Reads. All return clones so callers never hold a lock.

    pub async fn zone(&self, number: u16) -> Option<Zone> {
        self.panel.read().await.zones.get(usize::from(number).checked_sub(1)?).cloned()
    }

    pub async fn zones(&self) -> Vec<Zone> {
        self.panel.read().await.zones.clone()
    }

    pub async fn output(&self, number: u16) -> Option<Output> {
        self.panel.read().await.outputs.get(usize::from(number).checked_sub(1)?).cloned()
    }

    pub async fn area(&self, number: u16) -> Option<Area> {
        self.panel.read().await.areas.get(usize::from(number).checked_sub(1)?).cloned()
    }

    pub async fn areas(&self) -> Vec<Area> {
        self.panel.read().await.areas.clone()
    }

    pub async fn keypad(&self, number: u16) -> Option<Keypad> {
        self.panel.read().await.keypads.get(usize::from(number).checked_sub(1)?).cloned()
    }

    pub async fn thermostat(&self, number: u16) -> Option<Thermostat> {
        self.panel.read().await.thermostats.get(usize::from(number).checked_sub(1)?).cloned()
    }

    pub async fn x10_device(&self, house: HouseCode, unit: u8) -> Option<X10Device> {
        if !(1..=16).contains(&unit) {
            return None;
        }
        Some(self.panel.read().await.x10_device(house, unit).clone())
    }

    pub async fn task(&self, number: u16) -> Option<Task> {
        self.panel.read().await.tasks.get(usize::from(number).checked_sub(1)?).cloned()
    }

    pub async fn counter(&self, number: u16) -> Option<Counter> {
        self.panel.read().await.counters.get(usize::from(number).checked_sub(1)?).cloned()
    }

    pub async fn setting(&self, number: u16) -> Option<Setting> {
        self.panel.read().await.settings.get(usize::from(number).checked_sub(1)?).cloned()
    }

    pub async fn user(&self, number: u16) -> Option<User> {
        self.panel.read().await.users.get(usize::from(number).checked_sub(1)?).cloned()
    }

    /// Panel and ethernet-module firmware versions, once scanned.
    pub async fn version(&self) -> Option<VersionInfo> {
        self.panel.read().await.version.clone()
    }

    // Commands. These queue immediately and return; results come back as
    // entity changes. While the panel is paused for remote programming,
    // queued commands are discarded at send time.

    /// Arm or disarm an area. The user code must be four or six digits.
    pub fn arm(&self, area: u16, level: ArmLevel, user_code: &str) -> Result<(), Error> {
        if !(1..=8).contains(&area) {
            return Err(Error::Config(format!("area {area} out of range")));
        }
        if !matches!(user_code.len(), 4 | 6) || !user_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Config("user code must be 4 or 6 digits".into()));
        }
        self.send(requests::arm(level.message_kind(), area as u8, user_code));
        Ok(())
    }

    /// Shortcut for `arm(area, ArmLevel::Disarm, code)`.
    pub fn disarm(&self, area: u16, user_code: &str) -> Result<(), Error> {
        self.arm(area, ArmLevel::Disarm, user_code)
    }

    /// Turn an output on, optionally for a duration (0 = unlimited).
    pub fn output_on(&self, output: u16, duration_s: u16) -> Result<(), Error> {
        self.check_number(EntityKind::Output, output)?;
        self.send(requests::output_on(output, duration_s));
        Ok(())
    }

    pub fn output_off(&self, output: u16) -> Result<(), Error> {
        self.check_number(EntityKind::Output, output)?;
        self.send(requests::output_off(output));
        Ok(())
    }

    pub fn output_toggle(&self, output: u16) -> Result<(), Error> {
        self.check_number(EntityKind::Output, output)?;
        self.send(requests::output_toggle(output));
        Ok(())
    }

    /// Fire a task (momentary).
    pub fn task_activate(&self, task: u16) -> Result<(), Error> {
        self.check_number(EntityKind::Task, task)?;
        self.send(requests::task_activate(task));
        Ok(())
    }

    pub fn x10_on(&self, house: HouseCode, unit: u8) -> Result<(), Error> {
        check_unit(unit)?;
        self.send(requests::plc_on(house.letter(), unit));
        Ok(())
    }

    pub fn x10_off(&self, house: HouseCode, unit: u8) -> Result<(), Error> {
        check_unit(unit)?;
        self.send(requests::plc_off(house.letter(), unit));
        Ok(())
    }

    pub fn x10_toggle(&self, house: HouseCode, unit: u8) -> Result<(), Error> {
        check_unit(unit)?;
        self.send(requests::plc_toggle(house.letter(), unit));
        Ok(())
    }

    /// Set brightness 0..=100. The extremes become plain off and on, the
    /// middle a preset-dim command.
    pub fn x10_set_level(&self, house: HouseCode, unit: u8, level: u8) -> Result<(), Error> {
        check_unit(unit)?;
        if level > 100 {
            return Err(Error::Config(format!("level {level} out of range")));
        }
        match level {
            0 | 1 => self.x10_off(house, unit),
            100 => self.x10_on(house, unit),
            dim => {
                self.send(requests::plc_control(
                    house.letter(),
                    unit,
                    X10Function::PresetDim.code(),
                    dim,
                    0,
                ));
                Ok(())
            }
        }
    }

    pub fn thermostat_set_mode(&self, thermostat: u16, mode: ThermostatMode) -> Result<(), Error> {
        self.check_number(EntityKind::Thermostat, thermostat)?;
        self.send(requests::thermostat_set(thermostat, mode.code(), ThermostatElement::Mode.code()));
        Ok(())
    }

    pub fn thermostat_set_hold(&self, thermostat: u16, hold: bool) -> Result<(), Error> {
        self.check_number(EntityKind::Thermostat, thermostat)?;
        self.send(requests::thermostat_set(
            thermostat,
            u8::from(hold),
            ThermostatElement::Hold.code(),
        ));
        Ok(())
    }

    pub fn thermostat_set_fan(&self, thermostat: u16, fan: ThermostatFan) -> Result<(), Error> {
        self.check_number(EntityKind::Thermostat, thermostat)?;
        self.send(requests::thermostat_set(thermostat, fan.code(), ThermostatElement::Fan.code()));
        Ok(())
    }

    pub fn thermostat_set_setpoint_cool(&self, thermostat: u16, value: u8) -> Result<(), Error> {
        self.check_number(EntityKind::Thermostat, thermostat)?;
        self.send(requests::thermostat_set(
            thermostat,
            value.clamp(1, 99),
            ThermostatElement::SetpointCool.code(),
        ));
        Ok(())
    }

    pub fn thermostat_set_setpoint_heat(&self, thermostat: u16, value: u8) -> Result<(), Error> {
        self.check_number(EntityKind::Thermostat, thermostat)?;
        self.send(requests::thermostat_set(
            thermostat,
            value.clamp(1, 99),
            ThermostatElement::SetpointHeat.code(),
        ));
        Ok(())
    }

    /// Ask the thermostat to report its temperature.
    pub fn thermostat_request_temp(&self, thermostat: u16) -> Result<(), Error> {
        self.check_number(EntityKind::Thermostat, thermostat)?;
        self.send(requests::thermostat_set(thermostat, 0, ThermostatElement::GetTemp.code()));
        Ok(())
    }

    pub fn request_counter_value(&self, counter: u16) -> Result<(), Error> {
        self.check_number(EntityKind::Counter, counter)?;
        self.send(requests::counter_read(counter));
        Ok(())
    }

    pub fn set_counter_value(&self, counter: u16, value: u16) -> Result<(), Error> {
        self.check_number(EntityKind::Counter, counter)?;
        self.send(requests::counter_write(counter, value));
        Ok(())
    }

    pub fn request_setting_value(&self, setting: u16) -> Result<(), Error> {
        self.check_number(EntityKind::Setting, setting)?;
        self.send(requests::value_read(setting));
        Ok(())
    }

    pub fn set_setting_value(&self, setting: u16, value: SettingValue) -> Result<(), Error> {
        self.check_number(EntityKind::Setting, setting)?;
        self.send(requests::value_write(setting, value.encode()));
        Ok(())
    }

    /// Queue an arbitrary frame.
    pub fn send(&self, frame: Frame) {
        self.queue.push(Pending::new(frame));
    }

    /// Queue a frame that retries until a reply starting with `expect`
    /// (tag plus payload prefix) arrives or the budget is exhausted.
    pub fn send_with_retries(
        &self,
        frame: Frame,
        retries: u8,
        retry_delay: Duration,
        expect: &str,
    ) {
        self.queue.push(Pending::new(frame).with_retries(retries, retry_delay, expect));
    }

    /// Write the fast-load snapshot now.
    pub async fn save_snapshot(&self) -> Result<(), Error> {
        let path = self
            .config
            .fastload_file
            .as_ref()
            .ok_or_else(|| Error::Snapshot("no fastload_file configured".into()))?;
        let panel = self.panel.read().await;
        snapshot::save(&panel, path).await
    }

    /// Stop the runtime: persist the snapshot, cancel every task, and
    /// flush the outbound queue without sending.
    pub async fn shutdown(mut self) {
        if self.config.fastload && self.config.fastload_file.is_some() {
            if let Err(e) = self.save_snapshot().await {
                warn!(error = %e, "snapshot save on shutdown failed");
            }
        }
        let _ = self.shutdown_tx.send(true);
        let _ = self.runtime_tx.send(RuntimeState::Disconnected);
        for task in &mut self.tasks {
            if tokio::time::timeout(Duration::from_secs(2), &mut *task).await.is_err() {
                task.abort();
            }
        }
        info!("runtime stopped");
    }

    fn check_number(&self, kind: EntityKind, number: u16) -> Result<(), Error> {
        if usize::from(number).wrapping_sub(1) < kind.capacity() && number >= 1 {
            Ok(())
        } else {
            Err(Error::Config(format!("{kind:?} number {number} out of range")))
        }
    }

    /// Frames dropped from the inbound buffer so far.
    pub fn inbound_dropped(&self) -> u64 {
        self.mailbox.dropped()
    }
}

/// Reader loop: validate each line into a frame and hand it to the
/// mailbox. Checksum and framing failures are counted and dropped here so
/// nothing malformed ever reaches the dispatcher.
async fn read_loop(
    mut source: BoxSource,
    mailbox: Arc<Mailbox>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let mut bad_frames = 0u64;
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return Ok(());
                }
            }
            line = source.next_line() => match line.context("transport read failed")? {
                Some(line) => match Frame::parse(&line) {
                    Ok(frame) => mailbox.push(frame),
                    Err(e) => {
                        bad_frames += 1;
                        debug!(%line, error = %e, bad_frames, "dropping bad frame");
                    }
                },
                None => anyhow::bail!("transport closed"),
            }
        }
    }
}

fn check_unit(unit: u8) -> Result<(), Error> {
    if (1..=16).contains(&unit) {
        Ok(())
    } else {
        Err(Error::Config(format!("unit {unit} out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ZoneState;
    use chrono::Utc;

    #[test]
    fn events_promote_to_default_stream_without_listeners() {
        let registry = CallbackRegistry::new();
        let mut rx = registry.subscribe();
        let mut panel = PanelState::new();
        panel.zones[0].set_state_status(1, 0, Utc::now());
        let change = ChangeRef::new(EntityKind::Zone, 0);
        registry.emit(change, PanelEvent::capture(&panel, change));
        match rx.try_recv().expect("promoted event") {
            PanelEvent::Zone(zone) => {
                assert_eq!(zone.number, 1);
                assert_eq!(zone.state, Some(ZoneState::Open));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn listener_suppresses_promotion() {
        let registry = CallbackRegistry::new();
        let mut rx = registry.subscribe();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = registry.add(
            EntityKind::Output,
            2,
            Arc::new(move |event| sink.lock().unwrap().push(event.number())),
        );

        let mut panel = PanelState::new();
        panel.outputs[2].set_status(true, Utc::now());
        let change = ChangeRef::new(EntityKind::Output, 2);
        registry.emit(change, PanelEvent::capture(&panel, change));

        assert_eq!(*seen.lock().unwrap(), vec![3]);
        assert!(rx.try_recv().is_err());

        // Once removed, the next change is promoted again.
        assert!(registry.remove(id));
        registry.emit(change, PanelEvent::capture(&panel, change));
        assert!(rx.try_recv().is_ok());
    }
}
