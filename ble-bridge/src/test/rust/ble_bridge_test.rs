use ble_bridge::application::services::SESSION_BUFFER;
use ble_bridge::{
    routes, AdapterState, AdvertisingConfig, AdvertisingController, AdvertisingPayload,
    AdvertisingState, AdvertisingStatus, BridgeError, Capability, CentralRole, MetricsReporter, OutboundEvent, PeripheralRole,
    RadioAdapter, RadioEvent, RawDiscovery, Result, ScanIngestion, SightingTable, SubscriberHub,
};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

// ---- fakes ----

#[derive(Default)]
struct FakeCentral {
    feed: Mutex<Option<mpsc::UnboundedReceiver<RadioEvent>>>,
    scans_started: AtomicUsize,
    scans_stopped: AtomicUsize,
}

impl FakeCentral {
    fn with_feed() -> (Arc<Self>, mpsc::UnboundedSender<RadioEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let central = Arc::new(Self {
            feed: Mutex::new(Some(rx)),
            ..Default::default()
        });
        (central, tx)
    }
}

#[async_trait]
impl CentralRole for FakeCentral {
    async fn events(&self) -> Result<BoxStream<'static, RadioEvent>> {
        let rx = self
            .feed
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BridgeError::AdapterStartFailure("feed already taken".to_string()))?;
        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed())
    }

    async fn start_scan(&self) -> Result<()> {
        self.scans_started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.scans_stopped.fetch_add(1, Ordering::SeqCst);
        Err(BridgeError::AdapterStartFailure("not scanning".to_string()))
    }
}

struct FakePeripheral {
    powered: AtomicBool,
    fail_next: AtomicBool,
    advertised: Mutex<Vec<AdvertisingPayload>>,
    stops: AtomicUsize,
}

impl FakePeripheral {
    fn powered() -> Arc<Self> {
        Arc::new(Self {
            powered: AtomicBool::new(true),
            fail_next: AtomicBool::new(false),
            advertised: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        })
    }

    fn last_payload(&self) -> Option<AdvertisingPayload> {
        self.advertised.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PeripheralRole for FakePeripheral {
    async fn state(&self) -> Result<AdapterState> {
        Ok(if self.powered.load(Ordering::SeqCst) {
            AdapterState::PoweredOn
        } else {
            AdapterState::PoweredOff
        })
    }

    async fn advertise(&self, payload: AdvertisingPayload) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::AdapterStartFailure("rejected by adapter".to_string()));
        }
        self.advertised.lock().unwrap().push(payload);
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct CountingMetrics {
    relayed: AtomicUsize,
    dropped: AtomicUsize,
    failures: AtomicUsize,
}

impl MetricsReporter for CountingMetrics {
    fn report_session_opened(&self) {}
    fn report_session_closed(&self) {}

    fn report_advertisement_relayed(&self) {
        self.relayed.fetch_add(1, Ordering::SeqCst);
    }

    fn report_delivery_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }

    fn report_advertising_state(&self, _state: &AdvertisingState) {}

    fn report_advertising_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

struct Bridge {
    radio: Arc<RadioAdapter>,
    hub: Arc<SubscriberHub>,
    metrics: Arc<CountingMetrics>,
}

fn bridge(
    central: Capability<Arc<dyn CentralRole>>,
    peripheral: Capability<Arc<dyn PeripheralRole>>,
) -> Bridge {
    let radio = Arc::new(RadioAdapter::new(central, peripheral, Duration::from_secs(1)));
    let metrics = Arc::new(CountingMetrics::default());
    let controller = Arc::new(AdvertisingController::new(radio.clone(), metrics.clone()));
    let hub = Arc::new(SubscriberHub::new(controller, metrics.clone()));
    Bridge {
        radio,
        hub,
        metrics,
    }
}

fn bridge_with_peripheral(peripheral: &Arc<FakePeripheral>) -> Bridge {
    bridge(
        Capability::Absent("no central in test".to_string()),
        Capability::Present(peripheral.clone() as Arc<dyn PeripheralRole>),
    )
}

async fn open_session(hub: &SubscriberHub) -> (String, mpsc::Receiver<OutboundEvent>) {
    let (id, rx) = hub.connect().await;
    assert!(hub.open_session(&id).await);
    (id, rx)
}

fn json(event: &OutboundEvent) -> serde_json::Value {
    serde_json::from_str(&event.to_json().unwrap()).unwrap()
}

fn discovery(id: &str) -> RawDiscovery {
    RawDiscovery {
        platform_id: Some(id.to_string()),
        local_name: Some("Tag".to_string()),
        rssi: Some(-60),
        ..Default::default()
    }
}

// ---- hub fan-out ----

#[tokio::test]
async fn test_fan_out_reaches_every_open_session() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);

    let mut open = Vec::new();
    for _ in 0..3 {
        open.push(open_session(&b.hub).await);
    }
    let (_pending_id, mut pending_rx) = b.hub.connect().await;
    let (closed_id, mut closed_rx) = open_session(&b.hub).await;
    b.hub.remove_session(&closed_id).await;

    let record = ble_bridge::AdvertisementRecord::from_discovery(
        discovery("dev-1"),
        std::time::SystemTime::now(),
    );
    let delivered = b.hub.publish_advertisement(record).await;

    assert_eq!(delivered, 3);
    for (_, rx) in open.iter_mut() {
        let event = rx.try_recv().unwrap();
        assert_eq!(json(&event)["id"], "dev-1");
    }
    assert!(pending_rx.try_recv().is_err());
    assert!(closed_rx.try_recv().is_err());
    assert_eq!(b.metrics.relayed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_session_drops_instead_of_blocking() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let (_slow, _slow_rx) = open_session(&b.hub).await;
    let (_fast, mut fast_rx) = open_session(&b.hub).await;

    for i in 0..SESSION_BUFFER {
        let record = ble_bridge::AdvertisementRecord::from_discovery(
            discovery(&format!("dev-{i}")),
            std::time::SystemTime::now(),
        );
        b.hub.publish_advertisement(record).await;
        fast_rx.try_recv().unwrap();
    }

    let record = ble_bridge::AdvertisementRecord::from_discovery(
        discovery("overflow"),
        std::time::SystemTime::now(),
    );
    let delivered = b.hub.publish_advertisement(record).await;

    assert_eq!(delivered, 1);
    assert_eq!(json(&fast_rx.try_recv().unwrap())["id"], "overflow");
    assert_eq!(b.metrics.dropped.load(Ordering::SeqCst), 1);
}

// ---- advertising commands ----

#[tokio::test]
async fn test_status_goes_only_to_requester() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let (a, mut a_rx) = open_session(&b.hub).await;
    let (_b, mut b_rx) = open_session(&b.hub).await;

    b.hub.on_message(&a, r#"{"type":"adv.start","config":{"name":"Mine"}}"#).await;
    assert_eq!(
        a_rx.try_recv().unwrap().to_json().unwrap(),
        r#"{"type":"adv.status","status":"advertising"}"#
    );
    assert!(b_rx.try_recv().is_err());

    b.hub.on_message(&a, r#"{"type":"adv.stop"}"#).await;
    assert_eq!(
        a_rx.try_recv().unwrap().to_json().unwrap(),
        r#"{"type":"adv.status","status":"stopped"}"#
    );
    assert!(b_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_status_reply_waits_for_full_buffer() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let (id, mut rx) = open_session(&b.hub).await;

    for i in 0..SESSION_BUFFER {
        let record = ble_bridge::AdvertisementRecord::from_discovery(
            discovery(&format!("dev-{i}")),
            std::time::SystemTime::now(),
        );
        b.hub.publish_advertisement(record).await;
    }

    let hub = b.hub.clone();
    let requester = id.clone();
    let reply = tokio::spawn(async move {
        hub.on_message(&requester, r#"{"type":"adv.stop"}"#).await;
    });

    for _ in 0..SESSION_BUFFER {
        assert_eq!(json(&rx.recv().await.unwrap())["type"], "adv");
    }
    assert_eq!(json(&rx.recv().await.unwrap())["status"], "stopped");
    reply.await.unwrap();
    assert_eq!(b.metrics.dropped.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_start_waiting_for_power() {
    let peripheral = FakePeripheral::powered();
    peripheral.powered.store(false, Ordering::SeqCst);
    let b = bridge_with_peripheral(&peripheral);
    let controller = b.hub.controller().clone();

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start(AdvertisingConfig::new("Late")).await }
    });
    // Let the start reach its power-on poll
    tokio::time::sleep(Duration::from_millis(10)).await;

    let stopped = tokio::time::timeout(Duration::from_millis(100), controller.stop()).await;
    assert_eq!(stopped.unwrap(), AdvertisingStatus::Stopped);

    peripheral.powered.store(true, Ordering::SeqCst);
    let AdvertisingStatus::Error(reason) = pending.await.unwrap() else {
        panic!("cancelled start must not report advertising");
    };
    assert!(reason.contains("superseded"));
    assert!(peripheral.last_payload().is_none());
    assert_eq!(controller.current_state().await, AdvertisingState::Idle);
    assert_eq!(b.metrics.failures.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_times_out_when_adapter_stays_off() {
    let peripheral = FakePeripheral::powered();
    peripheral.powered.store(false, Ordering::SeqCst);
    let b = bridge_with_peripheral(&peripheral);
    let (id, mut rx) = open_session(&b.hub).await;

    b.hub.on_message(&id, r#"{"type":"adv.start"}"#).await;

    let event = json(&rx.try_recv().unwrap());
    assert_eq!(event["status"], "error");
    assert!(event["error"].as_str().unwrap().contains("did not power on"));
    assert_eq!(b.metrics.failures.load(Ordering::SeqCst), 1);
    assert!(peripheral.last_payload().is_none());
}

#[tokio::test]
async fn test_cards_demo_advertises_manufacturer_data() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let (id, mut rx) = open_session(&b.hub).await;

    b.hub
        .on_message(
            &id,
            r#"{"type":"adv.start","config":{"name":"Cards Demo","manufacturerId":76,"manufacturerDataHex":"0102"}}"#,
        )
        .await;

    assert_eq!(
        rx.try_recv().unwrap().to_json().unwrap(),
        r#"{"type":"adv.status","status":"advertising"}"#
    );

    let Some(AdvertisingPayload::Raw(bytes)) = peripheral.last_payload() else {
        panic!("expected raw advertising payload");
    };
    assert_eq!(&bytes[..3], &[0x02, 0x01, 0x06]);
    assert_eq!(&bytes[3..5], &[11, 0x09]);
    assert_eq!(&bytes[5..15], b"Cards Demo");
    assert_eq!(&bytes[15..], &[0x05, 0xFF, 0x4C, 0x00, 0x01, 0x02]);

    assert!(b.hub.controller().current_state().await.is_advertising());
}

#[tokio::test]
async fn test_start_without_config_uses_default_name() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let (id, _rx) = open_session(&b.hub).await;

    b.hub.on_message(&id, r#"{"type":"adv.start"}"#).await;

    assert_eq!(
        peripheral.last_payload(),
        Some(AdvertisingPayload::Named {
            local_name: "Advertiser".to_string(),
            service_uuids: vec![],
        })
    );
}

#[tokio::test]
async fn test_start_without_peripheral_reports_error() {
    let b = bridge(
        Capability::Absent("no central in test".to_string()),
        Capability::Absent("bluez missing".to_string()),
    );
    let (id, mut rx) = open_session(&b.hub).await;

    b.hub.on_message(&id, r#"{"type":"adv.start","config":{"name":"x"}}"#).await;

    let event = json(&rx.try_recv().unwrap());
    assert_eq!(event["status"], "error");
    assert!(event["error"].as_str().unwrap().contains("peripheral role unavailable"));
    assert_eq!(b.metrics.failures.load(Ordering::SeqCst), 1);

    // Stop still succeeds without a peripheral
    b.hub.on_message(&id, r#"{"type":"adv.stop"}"#).await;
    assert_eq!(json(&rx.try_recv().unwrap())["status"], "stopped");
}

#[tokio::test]
async fn test_failed_restart_keeps_previous_advertisement() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let (id, mut rx) = open_session(&b.hub).await;

    b.hub.on_message(&id, r#"{"type":"adv.start","config":{"name":"First"}}"#).await;
    assert_eq!(json(&rx.try_recv().unwrap())["status"], "advertising");

    peripheral.fail_next.store(true, Ordering::SeqCst);
    b.hub.on_message(&id, r#"{"type":"adv.start","config":{"name":"Second"}}"#).await;
    assert_eq!(json(&rx.try_recv().unwrap())["status"], "error");

    let state = b.hub.controller().current_state().await;
    assert_eq!(state.active_config().map(|c| c.name()), Some("First"));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let (id, mut rx) = open_session(&b.hub).await;

    b.hub.on_message(&id, r#"{"type":"adv.start"}"#).await;
    b.hub.on_message(&id, r#"{"type":"adv.stop"}"#).await;
    b.hub.on_message(&id, r#"{"type":"adv.stop"}"#).await;

    assert_eq!(json(&rx.try_recv().unwrap())["status"], "advertising");
    assert_eq!(json(&rx.try_recv().unwrap())["status"], "stopped");
    assert_eq!(json(&rx.try_recv().unwrap())["status"], "stopped");
    assert_eq!(b.hub.controller().current_state().await, AdvertisingState::Idle);
    assert_eq!(peripheral.stops.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_malformed_messages_are_dropped_silently() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let (id, mut rx) = open_session(&b.hub).await;

    for raw in [
        "not json",
        r#"{"type":"adv.pause"}"#,
        r#"{"config":{}}"#,
        r#"{"type":"adv.start","config":{"manufacturerId":70000}}"#,
    ] {
        b.hub.on_message(&id, raw).await;
    }
    assert!(rx.try_recv().is_err());
    assert!(peripheral.last_payload().is_none());

    // Session still usable afterwards
    b.hub.on_message(&id, r#"{"type":"adv.stop"}"#).await;
    assert_eq!(json(&rx.try_recv().unwrap())["status"], "stopped");
}

// ---- scan ingestion ----

#[tokio::test]
async fn test_ingestion_follows_adapter_power() {
    let (central, feed) = FakeCentral::with_feed();
    let b = bridge(
        Capability::Present(central.clone() as Arc<dyn CentralRole>),
        Capability::Absent("none".to_string()),
    );
    let (_id, mut rx) = open_session(&b.hub).await;
    let sightings = Arc::new(RwLock::new(SightingTable::new()));

    let ingestion =
        ScanIngestion::new(b.radio.clone(), b.hub.clone()).with_sightings(sightings.clone());

    feed.send(RadioEvent::StateChanged(AdapterState::PoweredOn)).unwrap();
    feed.send(RadioEvent::Discovered(discovery("dev-1"))).unwrap();
    feed.send(RadioEvent::Discovered(RawDiscovery {
        rssi: Some(-40),
        ..discovery("dev-1")
    }))
    .unwrap();
    feed.send(RadioEvent::StateChanged(AdapterState::PoweredOff)).unwrap();
    drop(feed);

    let events = b.radio.events().await.unwrap();
    ingestion.run(events).await;

    assert_eq!(central.scans_started.load(Ordering::SeqCst), 1);
    assert_eq!(central.scans_stopped.load(Ordering::SeqCst), 1);

    // Every sighting is relayed, duplicates included
    assert_eq!(json(&rx.try_recv().unwrap())["rssi"], -60);
    assert_eq!(json(&rx.try_recv().unwrap())["rssi"], -40);

    let table = sightings.read().await;
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("dev-1").and_then(|r| r.rssi()), Some(-40));
}

#[tokio::test]
async fn test_event_feed_requires_central() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);

    assert!(matches!(
        b.radio.events().await,
        Err(BridgeError::CapabilityUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_record_fields_on_the_wire() {
    let b = bridge(
        Capability::Absent("none".to_string()),
        Capability::Absent("none".to_string()),
    );
    let (_id, mut rx) = open_session(&b.hub).await;
    let ingestion = ScanIngestion::new(b.radio.clone(), b.hub.clone());

    ingestion
        .handle(RadioEvent::Discovered(RawDiscovery {
            address: Some("AA:BB:CC:DD:EE:FF".to_string()),
            manufacturer_data: Some(vec![0x4C, 0x00, 0x01, 0x02]),
            service_uuids: vec!["180f".to_string()],
            ..Default::default()
        }))
        .await;

    let event = json(&rx.try_recv().unwrap());
    assert_eq!(event["type"], "adv");
    assert_eq!(event["id"], "AA:BB:CC:DD:EE:FF");
    assert_eq!(event["name"], "Unknown");
    assert_eq!(event["manufacturer"], "0x4c000102");
    assert_eq!(event["uuids"][0], "180f");
    assert!(event["rssi"].is_null());
    assert!(event["seenAt"].as_u64().unwrap() > 0);
}

// ---- warp routes ----

#[tokio::test]
async fn test_websocket_round_trip() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let filter = routes(b.hub.clone(), None);

    let mut client = warp::test::ws()
        .path("/")
        .handshake(filter)
        .await
        .expect("handshake");

    client.send_text(r#"{"type":"adv.stop"}"#).await;
    let reply = client.recv().await.expect("status reply");
    assert_eq!(reply.to_str().unwrap(), r#"{"type":"adv.status","status":"stopped"}"#);

    let record = ble_bridge::AdvertisementRecord::from_discovery(
        discovery("dev-ws"),
        std::time::SystemTime::now(),
    );
    assert_eq!(b.hub.publish_advertisement(record).await, 1);

    let msg = client.recv().await.expect("advertisement");
    let event: serde_json::Value = serde_json::from_str(msg.to_str().unwrap()).unwrap();
    assert_eq!(event["type"], "adv");
    assert_eq!(event["id"], "dev-ws");
}

#[tokio::test]
async fn test_probe_routes() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let filter = routes(b.hub.clone(), None);

    let res = warp::test::request().path("/livez").reply(&filter).await;
    assert_eq!(res.status(), 200);

    let res = warp::test::request().path("/health").reply(&filter).await;
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["service"], "ble-bridge");

    let res = warp::test::request().path("/metrics").reply(&filter).await;
    assert_eq!(res.status(), 200);

    let res = warp::test::request().path("/devices").reply(&filter).await;
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_devices_route_lists_sightings() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let sightings = Arc::new(RwLock::new(SightingTable::new()));
    sightings
        .write()
        .await
        .record(ble_bridge::AdvertisementRecord::from_discovery(
            discovery("dev-1"),
            std::time::SystemTime::now(),
        ));
    let filter = routes(b.hub.clone(), Some(sightings));

    let res = warp::test::request().path("/devices").reply(&filter).await;

    assert_eq!(res.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "dev-1");
}

#[tokio::test]
async fn test_advertising_route_reports_lifecycle() {
    let peripheral = FakePeripheral::powered();
    let b = bridge_with_peripheral(&peripheral);
    let filter = routes(b.hub.clone(), None);

    b.hub.controller().start(AdvertisingConfig::new("Beacon")).await;

    let res = warp::test::request().path("/advertising").reply(&filter).await;

    assert_eq!(res.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["state"], "advertising");
    assert_eq!(body["localName"], "Beacon");
    assert_eq!(body["failures"], 0);
    assert_eq!(body["transitions"].as_array().unwrap().len(), 1);
    assert_eq!(body["transitions"][0]["from"], "idle");
    assert_eq!(body["transitions"][0]["to"], "advertising");
}
