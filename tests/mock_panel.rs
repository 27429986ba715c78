//! Integration tests for AsyncSatel against a simulated ETHM module
//!
//! The simulated module listens on a local port, speaks the framed
//! protocol (plain or encrypted) and answers queries from a small
//! in-memory panel model.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tokio_util::codec::Framed;

use satel_integra::codec::{Frame, SatelCodec};
use satel_integra::crypto::EncryptedSession;
use satel_integra::protocol::{DeviceKind, encode_bitmask_le};
use satel_integra::{
    AlarmState, ArmMode, AsyncSatel, EventReceiver, ResultCode, SatelConfig, SatelError,
    SatelEvent, ZoneAttribute,
};

const KEY: &str = "integration1";

/// Panel state as seen by the simulated module.
#[derive(Debug)]
struct PanelSim {
    violated: Vec<u32>,
    armed: Vec<u32>,
    outputs: Vec<u32>,
    command_result: u8,
    monitoring_result: u8,
    /// Commands the module never answers
    silent: Vec<u8>,
    /// Commands the module refuses with a result code
    rejected: Vec<u8>,
    received: Vec<Frame>,
}

impl PanelSim {
    fn new() -> Self {
        Self {
            violated: vec![1],
            armed: vec![1],
            outputs: vec![16],
            command_result: 0x00,
            monitoring_result: 0xFF,
            silent: Vec::new(),
            rejected: Vec::new(),
            received: Vec::new(),
        }
    }

    fn reply(&mut self, request: &Frame) -> Option<Frame> {
        self.received.push(request.clone());
        if self.silent.contains(&request.cmd) {
            return None;
        }
        if self.rejected.contains(&request.cmd) {
            return Some(Frame::new(0xEF, vec![0x08]));
        }

        let reply = match request.cmd {
            0x7F => Frame::new(0xEF, vec![self.monitoring_result]),
            0x00 => bitmask(0x00, &self.violated, 16),
            0x01 | 0x02 | 0x06 => bitmask(request.cmd, &[], 16),
            0x17 => bitmask(0x17, &self.outputs, 16),
            0x09 | 0x0A => bitmask(request.cmd, &self.armed, 4),
            0x0B..=0x14 | 0x2A => bitmask(request.cmd, &[], 4),
            0x7E => Frame::new(0x7E, b"\x0311620160715\x01\xFF".to_vec()),
            0x1A => Frame::new(0x1A, vec![0x20, 0x26, 0x10, 0x16, 0x12, 0x30, 0x45, 0x00]),
            0xEE => {
                let (kind, number) = (request.data[0], request.data[1]);
                let name = match (kind, number) {
                    (1, 1) => "Front door".to_string(),
                    _ => format!("Device {number}"),
                };
                let mut data = vec![kind, number, 0x00];
                data.extend(format!("{name:<16}").bytes());
                Frame::new(0xEE, data)
            }
            cmd if cmd >= 0x80 => Frame::new(0xEF, vec![self.command_result]),
            _ => Frame::new(0xEF, vec![0x08]),
        };
        Some(reply)
    }
}

fn bitmask(cmd: u8, ids: &[u32], len: usize) -> Frame {
    Frame::new(cmd, encode_bitmask_le(ids, len).unwrap())
}

/// Simulated ETHM-1 module accepting any number of connections.
struct MockPanel {
    addr: SocketAddr,
    sim: Arc<Mutex<PanelSim>>,
    push_tx: broadcast::Sender<Frame>,
    drop_tx: watch::Sender<u32>,
    connections: Arc<AtomicUsize>,
}

impl MockPanel {
    async fn start(key: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sim = Arc::new(Mutex::new(PanelSim::new()));
        let (push_tx, _) = broadcast::channel(16);
        let (drop_tx, _) = watch::channel(0u32);
        let connections = Arc::new(AtomicUsize::new(0));

        let key = key.map(str::to_string);
        let accept_sim = sim.clone();
        let accept_push = push_tx.clone();
        let accept_drop = drop_tx.clone();
        let accept_count = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_count.fetch_add(1, Ordering::SeqCst);
                let codec = match &key {
                    Some(key) => SatelCodec::encrypted(Arc::new(Mutex::new(
                        EncryptedSession::with_session_id(key, 0),
                    ))),
                    None => SatelCodec::plain(),
                };
                tokio::spawn(serve(
                    Framed::new(stream, codec),
                    accept_sim.clone(),
                    accept_push.subscribe(),
                    accept_drop.subscribe(),
                ));
            }
        });

        Self {
            addr,
            sim,
            push_tx,
            drop_tx,
            connections,
        }
    }

    fn config(&self) -> SatelConfig {
        self.builder().build()
    }

    fn builder(&self) -> satel_integra::SatelConfigBuilder {
        SatelConfig::builder()
            .host(self.addr.ip().to_string())
            .port(self.addr.port())
            .monitored_zones(vec![1, 2])
            .monitored_outputs(vec![16])
            .partitions(vec![1])
            .connect_timeout_ms(1000)
            .response_timeout_ms(500)
            .reconnect_delay_ms(50)
            .max_reconnect_delay_ms(200)
            .max_connect_retries(0)
    }

    fn sim(&self) -> std::sync::MutexGuard<'_, PanelSim> {
        self.sim.lock().unwrap()
    }

    /// Send an unsolicited frame on every open connection.
    fn push(&self, frame: Frame) {
        self.push_tx.send(frame).unwrap();
    }

    /// Close every open connection from the module side.
    fn drop_connections(&self) {
        self.drop_tx.send_modify(|generation| *generation += 1);
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn serve(
    mut framed: Framed<TcpStream, SatelCodec>,
    sim: Arc<Mutex<PanelSim>>,
    mut push_rx: broadcast::Receiver<Frame>,
    mut drop_rx: watch::Receiver<u32>,
) {
    loop {
        tokio::select! {
            request = framed.next() => {
                let Some(Ok(request)) = request else { break };
                let reply = sim.lock().unwrap().reply(&request);
                if let Some(reply) = reply
                    && framed.send(reply).await.is_err()
                {
                    break;
                }
            }
            Ok(frame) = push_rx.recv() => {
                if framed.send(frame).await.is_err() {
                    break;
                }
            }
            _ = drop_rx.changed() => break,
        }
    }
}

/// Wait for the first event matching `pred`, skipping everything before it.
async fn wait_for(rx: &mut EventReceiver, mut pred: impl FnMut(&SatelEvent) -> bool) -> SatelEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn is_zone_event(event: &SatelEvent, zone: u32, attr: ZoneAttribute) -> bool {
    matches!(event, SatelEvent::ZoneChanged { zone_id, attribute, .. } if *zone_id == zone && *attribute == attr)
}

// ---------------------------------------------------------------------------
// Session start
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_initial_state_after_connect() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::start(panel.config());
    let mut rx = satel.subscribe();

    wait_for(&mut rx, |e| *e == SatelEvent::MonitoringStarted).await;
    let event = wait_for(&mut rx, |e| is_zone_event(e, 1, ZoneAttribute::Violated)).await;
    assert_eq!(
        event,
        SatelEvent::ZoneChanged {
            zone_id: 1,
            attribute: ZoneAttribute::Violated,
            active: true,
            previous: None,
        }
    );
    let event = wait_for(&mut rx, |e| matches!(e, SatelEvent::PartitionChanged { .. })).await;
    match event {
        SatelEvent::PartitionChanged {
            partition_id,
            state,
            previous,
            ..
        } => {
            assert_eq!(partition_id, 1);
            assert_eq!(state, AlarmState::ArmedMode0);
            assert_eq!(previous, None);
        }
        other => panic!("unexpected event {other:?}"),
    }
    wait_for(&mut rx, |e| *e == SatelEvent::Connected).await;

    assert!(satel.is_connected().await);
    assert_eq!(satel.violated_zones().await, vec![1]);
    assert_eq!(satel.active_outputs().await, vec![16]);
    assert_eq!(satel.alarm_state(1).await, Some(AlarmState::ArmedMode0));
    assert!(satel.zone(2).await.unwrap().violated.is_fresh());
    assert_eq!(satel.zone(2).await.unwrap().violated.value(), Some(false));

    // Monitoring is requested before the first refresh
    let first = panel.sim().received[0].clone();
    assert_eq!(first.cmd, 0x7F);
    assert_eq!(first.data.len(), 12);

    satel.close().await;
}

#[tokio::test]
async fn test_encrypted_session() {
    let panel = MockPanel::start(Some(KEY)).await;
    let config = panel.builder().integration_key(KEY).build();
    let satel = AsyncSatel::connect(config).await.unwrap();

    assert!(satel.is_connected().await);
    assert_eq!(satel.violated_zones().await, vec![1]);

    let version = satel.read_version().await.unwrap();
    assert_eq!(version.version, "1.16");
    assert_eq!(version.release_date.to_string(), "2016-07-15");
    assert!(version.settings_in_flash);

    let name = satel.read_device_name(DeviceKind::Zone, 1).await.unwrap();
    assert_eq!(name.name, "Front door");
    assert_eq!(satel.zone(1).await.unwrap().name.as_deref(), Some("Front door"));

    satel.close().await;
}

#[tokio::test]
async fn test_wrong_key_fails() {
    let panel = MockPanel::start(Some(KEY)).await;
    let config = panel.builder().integration_key("otherkey").build();

    let result = AsyncSatel::connect(config).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_read_names_on_connect() {
    let panel = MockPanel::start(None).await;
    let config = panel.builder().read_names(true).build();
    let satel = AsyncSatel::connect(config).await.unwrap();

    assert_eq!(satel.zone(1).await.unwrap().name.as_deref(), Some("Front door"));
    assert_eq!(satel.zone(2).await.unwrap().name.as_deref(), Some("Device 2"));
    assert_eq!(satel.output(16).await.unwrap().name.as_deref(), Some("Device 16"));
    assert_eq!(satel.partition(1).await.unwrap().name.as_deref(), Some("Device 1"));

    satel.close().await;
}

#[tokio::test]
async fn test_read_time() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::connect(panel.config()).await.unwrap();

    let time = satel.read_time().await.unwrap();
    assert_eq!(time.to_string(), "2026-10-16 12:30:45");

    satel.close().await;
}

#[tokio::test]
async fn test_busy_module() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"Busy!\r\n").await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let config = SatelConfig::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .max_connect_retries(0)
        .build();

    let result = AsyncSatel::connect(config).await;
    assert!(matches!(result, Err(SatelError::PanelBusy)));
}

#[tokio::test]
async fn test_monitoring_refused() {
    let panel = MockPanel::start(None).await;
    panel.sim().monitoring_result = 0x01;

    let result = AsyncSatel::connect(panel.config()).await;
    assert!(matches!(result, Err(SatelError::MonitoringRejected)));
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = SatelConfig::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .max_connect_retries(0)
        .build();

    let result = AsyncSatel::connect(config).await;
    assert!(matches!(result, Err(SatelError::Io(_))));
}

// ---------------------------------------------------------------------------
// Monitoring
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pushed_reports_emit_changes() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::start(panel.config());
    let mut rx = satel.subscribe();
    wait_for(&mut rx, |e| *e == SatelEvent::Connected).await;

    panel.push(bitmask(0x00, &[1, 2], 16));
    let event = wait_for(&mut rx, |e| is_zone_event(e, 2, ZoneAttribute::Violated)).await;
    assert_eq!(
        event,
        SatelEvent::ZoneChanged {
            zone_id: 2,
            attribute: ZoneAttribute::Violated,
            active: true,
            previous: Some(false),
        }
    );

    panel.push(bitmask(0x13, &[1], 4));
    let event = wait_for(&mut rx, |e| matches!(e, SatelEvent::PartitionChanged { .. })).await;
    match event {
        SatelEvent::PartitionChanged { state, previous, .. } => {
            assert_eq!(state, AlarmState::Triggered);
            assert_eq!(previous, Some(AlarmState::ArmedMode0));
        }
        other => panic!("unexpected event {other:?}"),
    }

    // Outputs outside the monitored set update state silently
    panel.push(bitmask(0x17, &[16, 20], 16));
    timeout(Duration::from_secs(2), async {
        while satel.output(20).await.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("output 20 never appeared");
    assert_eq!(satel.active_outputs().await, vec![16, 20]);

    satel.close().await;
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_arm_accepted() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::connect(panel.config()).await.unwrap();

    satel.arm("1234", &[1], ArmMode::Mode0).await.unwrap();

    let sent = panel.sim().received.last().cloned().unwrap();
    assert_eq!(sent.cmd, 0x80);
    assert_eq!(
        sent.data,
        vec![0x12, 0x34, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00]
    );

    satel.arm("1234", &[1, 2], ArmMode::Mode3).await.unwrap();
    let sent = panel.sim().received.last().cloned().unwrap();
    assert_eq!(sent.cmd, 0x83);
    assert_eq!(sent.data[8], 0x03);

    satel.close().await;
}

#[tokio::test]
async fn test_command_rejected() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::connect(panel.config()).await.unwrap();

    panel.sim().command_result = 0x05;
    let result = satel.disarm("9999", &[1]).await;
    assert!(matches!(result, Err(SatelError::Rejected(ResultCode::WrongCode))));

    panel.sim().command_result = 0x12;
    let result = satel.arm("9999", &[1], ArmMode::Mode1).await;
    assert!(matches!(result, Err(SatelError::Rejected(ResultCode::CannotArm))));

    satel.close().await;
}

#[tokio::test]
async fn test_output_and_bypass_commands() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::connect(panel.config()).await.unwrap();

    satel.set_output("1234", 16, true).await.unwrap();
    let sent = panel.sim().received.last().cloned().unwrap();
    assert_eq!(sent.cmd, 0x88);
    assert_eq!(sent.data.len(), 8 + 32);
    assert_eq!(sent.data[8 + 1], 0x80);

    satel.set_output("1234", 16, false).await.unwrap();
    assert_eq!(panel.sim().received.last().unwrap().cmd, 0x89);

    satel.bypass_zones("1234", &[3]).await.unwrap();
    assert_eq!(panel.sim().received.last().unwrap().cmd, 0x86);

    satel.unbypass_zones("1234", &[3]).await.unwrap();
    assert_eq!(panel.sim().received.last().unwrap().cmd, 0x87);

    satel.clear_alarm("1234", &[1]).await.unwrap();
    assert_eq!(panel.sim().received.last().unwrap().cmd, 0x85);

    satel.close().await;
}

#[tokio::test]
async fn test_invalid_arguments_not_sent() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::connect(panel.config()).await.unwrap();
    let before = panel.sim().received.len();

    let result = satel.arm("12x4", &[1], ArmMode::Mode0).await;
    assert!(matches!(result, Err(SatelError::InvalidUserCode)));

    let result = satel.disarm("1234", &[33]).await;
    assert!(matches!(result, Err(SatelError::InvalidDeviceId { .. })));

    let result = satel.set_output("1234", 0, true).await;
    assert!(matches!(result, Err(SatelError::InvalidDeviceId { .. })));

    assert_eq!(panel.sim().received.len(), before);
    satel.close().await;
}

#[tokio::test]
async fn test_unanswered_query_times_out() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::connect(panel.config()).await.unwrap();

    panel.sim().silent.push(0x1A);
    let result = satel.read_time().await;
    assert!(matches!(result, Err(SatelError::CommandTimeout { .. })));

    // The session stays usable after a timeout
    assert!(satel.read_version().await.is_ok());

    satel.close().await;
}

#[tokio::test]
async fn test_name_limit_follows_device_kind() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::connect(panel.config()).await.unwrap();
    let before = panel.sim().received.len();

    let result = satel.read_device_name(DeviceKind::Partition, 200).await;
    assert!(matches!(
        result,
        Err(SatelError::InvalidDeviceId { id: 200, max: 32 })
    ));
    let result = satel.read_device_name(DeviceKind::Zone, 257).await;
    assert!(matches!(
        result,
        Err(SatelError::InvalidDeviceId { id: 257, max: 256 })
    ));
    assert_eq!(panel.sim().received.len(), before);

    let name = satel.read_device_name(DeviceKind::Zone, 200).await.unwrap();
    assert_eq!(name.name, "Device 200");

    satel.close().await;
}

#[tokio::test]
async fn test_rejected_report_does_not_hold_back_partitions() {
    let panel = MockPanel::start(None).await;
    panel.sim().rejected.push(0x2A);
    let config = panel.builder().keep_alive_interval_ms(100).build();
    let satel = AsyncSatel::connect(config).await.unwrap();

    assert_eq!(satel.alarm_state(1).await, Some(AlarmState::ArmedMode0));

    // Later keep-alives do not ask for the refused report again
    tokio::time::sleep(Duration::from_millis(400)).await;
    let sim = panel.sim();
    assert_eq!(sim.received.iter().filter(|f| f.cmd == 0x2A).count(), 1);
    assert!(sim.received.iter().any(|f| f.cmd == 0xEE && f.data == [1, 1]));
    drop(sim);

    assert!(satel.is_connected().await);
    satel.close().await;
}

// ---------------------------------------------------------------------------
// Connection supervision
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_reconnect_after_drop() {
    let panel = MockPanel::start(None).await;
    let config = panel.builder().reconnect_delay_ms(300).build();
    let satel = AsyncSatel::start(config);
    let mut rx = satel.subscribe();
    wait_for(&mut rx, |e| *e == SatelEvent::Connected).await;

    panel.drop_connections();
    wait_for(&mut rx, |e| *e == SatelEvent::Disconnected).await;

    assert!(!satel.is_connected().await);
    let zone = satel.zone(1).await.unwrap();
    assert!(zone.violated.is_stale());
    assert_eq!(zone.violated.value(), Some(true));
    assert_eq!(satel.alarm_state(1).await, Some(AlarmState::ArmedMode0));

    let result = satel.arm("1234", &[1], ArmMode::Mode0).await;
    assert!(matches!(result, Err(SatelError::Disconnected)));

    wait_for(&mut rx, |e| *e == SatelEvent::Connected).await;
    assert!(satel.is_connected().await);
    assert!(satel.zone(1).await.unwrap().violated.is_fresh());
    assert_eq!(panel.connections(), 2);

    satel.close().await;
}

#[tokio::test]
async fn test_unanswered_keep_alive_reconnects() {
    let panel = MockPanel::start(None).await;
    let config = panel
        .builder()
        .keep_alive_interval_ms(100)
        .response_timeout_ms(200)
        .build();
    let satel = AsyncSatel::start(config);
    let mut rx = satel.subscribe();
    wait_for(&mut rx, |e| *e == SatelEvent::Connected).await;

    panel.sim().silent.push(0xEE);
    wait_for(&mut rx, |e| *e == SatelEvent::Disconnected).await;
    assert!(
        panel
            .sim()
            .received
            .iter()
            .any(|f| f.cmd == 0xEE && f.data == [1, 1])
    );

    wait_for(&mut rx, |e| *e == SatelEvent::Connected).await;
    assert!(panel.connections() >= 2);

    satel.close().await;
}

#[tokio::test]
async fn test_refused_keep_alive_keeps_session() {
    let panel = MockPanel::start(None).await;
    panel.sim().rejected.push(0xEE);
    let config = panel.builder().keep_alive_interval_ms(100).build();
    let satel = AsyncSatel::connect(config).await.unwrap();
    let mut rx = satel.subscribe();

    tokio::time::sleep(Duration::from_millis(600)).await;

    let keep_alives = panel
        .sim()
        .received
        .iter()
        .filter(|f| f.cmd == 0xEE)
        .count();
    assert!(keep_alives >= 3, "only {keep_alives} keep-alives sent");
    assert!(satel.is_connected().await);
    assert_eq!(panel.connections(), 1);
    assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));

    satel.close().await;
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let panel = MockPanel::start(None).await;
    let satel = AsyncSatel::connect(panel.config()).await.unwrap();
    let mut rx = satel.subscribe();

    satel.close().await;
    wait_for(&mut rx, |e| *e == SatelEvent::Disconnected).await;
    satel.close().await;

    assert!(!satel.is_connected().await);
    assert!(matches!(satel.read_version().await, Err(SatelError::Disconnected)));
    assert!(matches!(
        satel.arm("1234", &[1], ArmMode::Mode0).await,
        Err(SatelError::Disconnected)
    ));

    // No reconnection after close
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(panel.connections(), 1);
}
