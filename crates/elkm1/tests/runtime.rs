//! End-to-end runtime scenarios against a scripted panel
//!
//! Each test wires the runtime to one end of an in-memory duplex stream
//! and plays the panel on the other end. Tests run on the paused tokio
//! clock, so scanner timeouts elapse in virtual time.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use elkm1::entity::{ArmLevel, HouseCode, X10Status, ZoneState, ZoneStatus};
use elkm1::proto::message::requests;
use elkm1::proto::{Frame, MessageKind};
use elkm1::transport::{self, BoxSink};
use elkm1::{Elk, ElkConfig, EntityKind, RuntimeState};

/// The panel half of the link: a request channel fed by a background
/// reader, and the sink for injecting panel frames.
struct PanelSim {
    requests: mpsc::UnboundedReceiver<Frame>,
    sink: BoxSink,
}

impl PanelSim {
    async fn send(&mut self, frame: &Frame) {
        self.sink.send_line(&frame.to_wire()).await.expect("panel send");
    }

    /// Next request of the given kind, discarding others.
    async fn next_request_of(&mut self, kind: MessageKind) -> Frame {
        loop {
            let frame = self.requests.recv().await.expect("request stream open");
            if frame.kind == kind {
                return frame;
            }
        }
    }

    /// Drop everything queued so far.
    fn drain(&mut self) {
        while self.requests.try_recv().is_ok() {}
    }
}

fn test_config() -> ElkConfig {
    let mut config = ElkConfig::new("socket://127.0.0.1:2101");
    config.fastload = false;
    config
}

/// Start the runtime on one end of a duplex pair; return it with the
/// panel half.
async fn start(config: ElkConfig) -> (Elk, PanelSim) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let (client, server) = tokio::io::duplex(16 * 1024);
    let (client_read, client_write) = tokio::io::split(client);
    let (server_read, server_write) = tokio::io::split(server);

    let (source, sink) = transport::pair(client_read, client_write);
    let elk = Elk::with_transport(config, source, sink).await.expect("runtime starts");

    let (mut panel_source, panel_sink) = transport::pair(server_read, server_write);
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok(Some(line)) = panel_source.next_line().await {
            if let Ok(frame) = Frame::parse(&line) {
                if request_tx.send(frame).is_err() {
                    break;
                }
            }
        }
    });

    (elk, PanelSim { requests: request_rx, sink: panel_sink })
}

async fn wait_for_state(elk: &Elk, state: RuntimeState) {
    let mut rx = elk.watch_runtime();
    tokio::time::timeout(Duration::from_secs(1800), async {
        loop {
            if *rx.borrow() == state {
                return;
            }
            rx.changed().await.expect("runtime watch open");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {state:?}"));
}

/// Let queued IO and dispatch settle (virtual time).
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn arm_away_attributes_recent_user_code() {
    let (elk, mut panel) = start(test_config()).await;
    wait_for_state(&elk, RuntimeState::Running).await;

    // Keypad 2 belongs to area 2.
    panel
        .send(&Frame::with_data(MessageKind::KeypadAreaReply, "2200000000000000"))
        .await;
    settle().await;

    // User 5 keys a code at keypad 2, then the panel reports area 2
    // armed away moments later.
    panel
        .send(&Frame::with_data(MessageKind::UserCodeEntered, "00000000000000502"))
        .await;
    settle().await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    panel
        .send(&Frame::with_data(
            MessageKind::ArmingStatusReport,
            "010000004444444400000000",
        ))
        .await;
    settle().await;

    let area = elk.area(2).await.expect("area 2");
    assert_eq!(area.status(), Some(elkm1::entity::AreaStatus::ArmedAway));
    assert_eq!(area.last_armed_by, Some(5));
    assert!(area.last_armed_at.is_some());
    assert_eq!(area.last_armed_at, area.updated_at);
    assert_eq!(area.last_disarmed_at, None);

    let keypad = elk.keypad(2).await.expect("keypad 2");
    assert_eq!(keypad.last_user_num, Some(5));

    // Disarm goes out as an a0 frame with the padded user code.
    panel.drain();
    elk.arm(2, ArmLevel::Disarm, "1234").unwrap();
    let request = panel.next_request_of(MessageKind::Disarm).await;
    assert_eq!(request.data, "2001234");

    elk.shutdown().await;
}

/// One description request per set name, not one per slot.
#[tokio::test(start_paused = true)]
async fn description_scan_skips_empty_slots() {
    let zone_descs: BTreeMap<usize, &str> =
        [(1, "Front Door"), (3, "Hall"), (7, "Garage")].into_iter().collect();
    let zone_requests: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

    let (elk, mut panel) = start(test_config()).await;

    // Script the whole scan so nothing times out.
    let recorded = Arc::clone(&zone_requests);
    let responder = async {
        loop {
            let Some(request) = panel.requests.recv().await else { break };
            for reply in scripted_replies(&request, &zone_descs, &recorded) {
                panel.send(&reply).await;
            }
        }
    };
    tokio::select! {
        _ = responder => panic!("panel script ended early"),
        _ = wait_for_state(&elk, RuntimeState::Running) => {}
    }

    let requested = zone_requests.lock().unwrap().clone();
    assert_eq!(requested, vec![1, 2, 4, 8], "skip-empty traversal");

    assert_eq!(elk.zone(1).await.unwrap().description.as_deref(), Some("Front Door"));
    assert_eq!(elk.zone(3).await.unwrap().description.as_deref(), Some("Hall"));
    assert_eq!(elk.zone(7).await.unwrap().description.as_deref(), Some("Garage"));
    assert_eq!(elk.zone(2).await.unwrap().description, None);

    elk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn retry_is_cancelled_by_expected_reply() {
    let (elk, mut panel) = start(test_config()).await;
    wait_for_state(&elk, RuntimeState::Running).await;
    panel.drain();

    elk.send_with_retries(requests::arming_status(), 3, Duration::from_secs(1), "AS");
    let request = panel.next_request_of(MessageKind::ArmingStatusRequest).await;
    assert_eq!(request.data, "");

    // Reply well inside the retry delay.
    tokio::time::sleep(Duration::from_millis(400)).await;
    panel
        .send(&Frame::with_data(
            MessageKind::ArmingStatusReport,
            "000000001111111100000000",
        ))
        .await;
    settle().await;

    // Long past every retry deadline, no second transmission appears.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(
        panel.requests.try_recv().is_err(),
        "command was retried despite the reply"
    );

    elk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn remote_programming_pauses_and_resumes() {
    let (elk, mut panel) = start(test_config()).await;
    wait_for_state(&elk, RuntimeState::Running).await;

    panel.send(&Frame::with_data(MessageKind::ElkRpStatus, "1")).await;
    wait_for_state(&elk, RuntimeState::Paused).await;
    panel.drain();

    // Commands queued during the pause never reach the wire.
    elk.send(requests::output_status());
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(panel.requests.try_recv().is_err(), "command leaked while paused");

    panel.send(&Frame::with_data(MessageKind::ElkRpStatus, "0")).await;
    wait_for_state(&elk, RuntimeState::Running).await;

    elk.send(requests::version());
    let request = panel.next_request_of(MessageKind::VersionRequest).await;
    assert_eq!(request.kind, MessageKind::VersionRequest);

    elk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn plc_status_routes_through_bank_offset() {
    let (elk, mut panel) = start(test_config()).await;
    wait_for_state(&elk, RuntimeState::Running).await;

    // Bank 1, level nibble 5 at the third unit position.
    let mut data = String::from("1");
    data.push_str("00");
    data.push('5');
    data.push_str(&"0".repeat(61));
    panel.send(&Frame::with_data(MessageKind::PlcStatusReply, data)).await;
    settle().await;

    let device = elk.x10_device(HouseCode::E, 3).await.expect("device E3");
    assert_eq!(device.status, Some(X10Status::Dimmed));
    assert_eq!(device.level, 5);

    elk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zone_update_unpacks_state_and_status_nibble() {
    let (elk, mut panel) = start(test_config()).await;
    wait_for_state(&elk, RuntimeState::Running).await;

    panel.send(&Frame::with_data(MessageKind::ZoneUpdate, "005C")).await;
    settle().await;

    let zone = elk.zone(5).await.expect("zone 5");
    assert_eq!(zone.state, Some(ZoneState::Unconfigured));
    assert_eq!(zone.status, Some(ZoneStatus::Bypassed));

    elk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn task_activation_pulses_then_reverts() {
    let (elk, mut panel) = start(test_config()).await;
    wait_for_state(&elk, RuntimeState::Running).await;

    panel.send(&Frame::with_data(MessageKind::TaskUpdate, "0090")).await;
    settle().await;
    let task = elk.task(9).await.expect("task 9");
    assert_eq!(task.status, elkm1::entity::TaskStatus::On);
    assert!(task.last_activated.is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let task = elk.task(9).await.expect("task 9");
    assert_eq!(task.status, elkm1::entity::TaskStatus::Off);
    assert!(task.last_activated.is_some());

    elk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn invalid_checksum_frames_are_dropped() {
    let (elk, mut panel) = start(test_config()).await;
    wait_for_state(&elk, RuntimeState::Running).await;

    // A corrupted zone update followed by a valid one; only the valid
    // frame lands.
    let mut wire = Frame::with_data(MessageKind::ZoneUpdate, "0061").to_wire();
    wire.replace_range(wire.len() - 2.., "00");
    panel.sink.send_line(&wire).await.unwrap();
    panel.send(&Frame::with_data(MessageKind::ZoneUpdate, "0071")).await;
    settle().await;

    assert_eq!(elk.zone(6).await.unwrap().state, None);
    assert_eq!(elk.zone(7).await.unwrap().state, Some(ZoneState::Open));

    elk.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn callbacks_fire_with_settled_entities() {
    let (elk, mut panel) = start(test_config()).await;
    wait_for_state(&elk, RuntimeState::Running).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    elk.callback_add(EntityKind::Output, 7, move |event| {
        if let elkm1::PanelEvent::Output(output) = event {
            sink.lock().unwrap().push(output.is_on());
        }
    })
    .unwrap();
    let mut promoted = elk.subscribe();

    panel.send(&Frame::with_data(MessageKind::OutputUpdate, "0071")).await;
    panel.send(&Frame::with_data(MessageKind::OutputUpdate, "0081")).await;
    settle().await;

    assert_eq!(*seen.lock().unwrap(), vec![true]);
    // Output 8 had no listener, so it was promoted to the default stream.
    match promoted.try_recv().expect("promoted event") {
        elkm1::PanelEvent::Output(output) => assert_eq!(output.number, 8),
        other => panic!("unexpected event {other:?}"),
    }

    elk.shutdown().await;
}

/// Script the full connect-time scan, recording zone description
/// requests, so the skip-empty traversal can be observed end to end.
fn scripted_replies(
    request: &Frame,
    zone_descs: &BTreeMap<usize, &str>,
    recorded: &Arc<Mutex<Vec<usize>>>,
) -> Vec<Frame> {
    let zeros = |n: usize| "0".repeat(n);
    match request.kind {
        MessageKind::ZoneStatusRequest => {
            vec![Frame::with_data(MessageKind::ZoneStatusReport, zeros(208))]
        }
        MessageKind::AlarmByZoneRequest => {
            vec![Frame::with_data(MessageKind::AlarmByZoneReport, zeros(208))]
        }
        MessageKind::ZoneDefinitionRequest => {
            vec![Frame::with_data(MessageKind::ZoneDefinitionReply, zeros(208))]
        }
        MessageKind::ZonePartitionRequest => {
            vec![Frame::with_data(MessageKind::ZonePartitionReport, zeros(208))]
        }
        MessageKind::OutputStatusRequest => {
            vec![Frame::with_data(MessageKind::OutputStatusReport, zeros(208))]
        }
        MessageKind::ArmingStatusRequest => {
            vec![Frame::with_data(MessageKind::ArmingStatusReport, zeros(24))]
        }
        MessageKind::KeypadAreaRequest => {
            vec![Frame::with_data(MessageKind::KeypadAreaReply, zeros(16))]
        }
        MessageKind::KeypadStatusRequest => {
            let n = &request.data[0..2];
            vec![Frame::with_data(
                MessageKind::KeypadStatusReport,
                format!("{n}00{}0{}", zeros(6), zeros(8)),
            )]
        }
        MessageKind::TempRequest => {
            vec![Frame::with_data(MessageKind::TempReply, format!("{}000", &request.data[0..3]))]
        }
        MessageKind::ThermostatDataRequest => {
            let n = &request.data[0..2];
            vec![Frame::with_data(MessageKind::ThermostatDataReply, format!("{n}{}", zeros(11)))]
        }
        MessageKind::PlcStatusRequest => {
            let bank = &request.data[0..1];
            vec![Frame::with_data(MessageKind::PlcStatusReply, format!("{bank}{}", zeros(64)))]
        }
        MessageKind::CounterRead => {
            let n = &request.data[0..2];
            vec![Frame::with_data(MessageKind::CounterReply, format!("{n}00000"))]
        }
        MessageKind::ValueReadAll => {
            vec![Frame::with_data(
                MessageKind::ValueReadReply,
                format!("00{}", "000000".repeat(20)),
            )]
        }
        MessageKind::VersionRequest => {
            vec![Frame::with_data(
                MessageKind::VersionReply,
                format!("050312010200{}", zeros(36)),
            )]
        }
        MessageKind::DescriptionRequest => {
            let ty: usize = request.data[0..2].parse().unwrap();
            let number: usize = request.data[2..5].parse().unwrap();
            if ty == 0 {
                recorded.lock().unwrap().push(number);
                match zone_descs.range(number..).next() {
                    Some((&slot, name)) => {
                        vec![Frame::with_data(
                            MessageKind::DescriptionReply,
                            format!("00{slot:03}{name: <16}"),
                        )]
                    }
                    None => vec![Frame::with_data(
                        MessageKind::DescriptionReply,
                        format!("00000{: <16}", ""),
                    )],
                }
            } else {
                vec![Frame::with_data(
                    MessageKind::DescriptionReply,
                    format!("{ty:02}000{: <16}", ""),
                )]
            }
        }
        _ => Vec::new(),
    }
}
