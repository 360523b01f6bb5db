//! Recording doubles shared by the unit tests.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::event::{Device, DeviceAssignment, DeviceEvent};
use crate::lifecycle::LifecycleComponent;
use crate::mqtt::{BrokerConnectionConfig, MqttSession, MqttTransport, QosLevel};
use crate::routing::Multicaster;
use crate::utils::error::{LifecycleError, RoutingError, TransportError};

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QosLevel,
    pub retain: bool,
}

#[derive(Default)]
struct BrokerState {
    published: Mutex<Vec<Published>>,
    failing_topics: Mutex<HashSet<String>>,
    refuse_connect: AtomicBool,
    fail_disconnect: AtomicBool,
    sessions_dropped: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    configs: Mutex<Vec<BrokerConnectionConfig>>,
}

/// In-process broker stand-in. Clones share the same recorded state.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<BrokerState>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_topic(&self, topic: &str) {
        self.state.failing_topics.lock().unwrap().insert(topic.to_string());
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.state.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.state.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    /// Makes every open session report a lost connection, as if the broker
    /// went away.
    pub fn drop_sessions(&self) {
        self.state.sessions_dropped.store(true, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.state.published.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published().into_iter().map(|p| p.topic).collect()
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<BrokerConnectionConfig> {
        self.state.configs.lock().unwrap().last().cloned()
    }
}

impl MqttTransport for RecordingTransport {
    fn connect(&self, config: &BrokerConnectionConfig) -> Result<Box<dyn MqttSession>, TransportError> {
        self.state.configs.lock().unwrap().push(config.clone());
        if self.state.refuse_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Transport("connection refused".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.sessions_dropped.store(false, Ordering::SeqCst);
        Ok(Box::new(RecordingSession {
            state: self.state.clone(),
            open: AtomicBool::new(true),
        }))
    }
}

struct RecordingSession {
    state: Arc<BrokerState>,
    open: AtomicBool,
}

impl MqttSession for RecordingSession {
    fn publish(&self, topic: &str, payload: &[u8], qos: QosLevel, retain: bool) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        if self.state.failing_topics.lock().unwrap().contains(topic) {
            return Err(TransportError::Persistence(format!("store rejected '{topic}'")));
        }
        self.state.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::SeqCst);
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_disconnect.load(Ordering::SeqCst) {
            return Err(TransportError::Transport("disconnect timed out".to_string()));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.state.sessions_dropped.load(Ordering::SeqCst)
    }
}

/// Multicaster returning a fixed route list, with scriptable lifecycle
/// failures.
#[derive(Default)]
pub struct ScriptedMulticaster {
    pub routes: Vec<String>,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub started: AtomicBool,
    pub stopped: AtomicBool,
}

impl ScriptedMulticaster {
    pub fn with_routes(routes: &[&str]) -> Self {
        Self {
            routes: routes.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl LifecycleComponent for ScriptedMulticaster {
    fn component_name(&self) -> &str {
        "scripted-multicaster"
    }

    fn start(&self) -> Result<(), LifecycleError> {
        if self.fail_start {
            return Err(LifecycleError::Component("multicaster refused to start".to_string()));
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.stopped.store(true, Ordering::SeqCst);
        if self.fail_stop {
            return Err(LifecycleError::Component("multicaster failed to stop".to_string()));
        }
        Ok(())
    }
}

impl Multicaster for ScriptedMulticaster {
    fn calculate_routes(
        &self,
        _event: &DeviceEvent,
        _device: &Device,
        _assignment: &DeviceAssignment,
    ) -> Result<Vec<String>, RoutingError> {
        Ok(self.routes.clone())
    }
}

/// Minimal MQTT 3.1.1 peer on a loopback socket. Accepts one client, answers
/// CONNECT and PINGREQ, counts PUBLISH packets and never acknowledges them.
pub struct LoopbackBroker {
    pub port: u16,
    publishes: Arc<AtomicUsize>,
}

impl LoopbackBroker {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let publishes = Arc::new(AtomicUsize::new(0));
        let counter = publishes.clone();
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                serve(stream, &counter);
            }
        });
        Self { port, publishes }
    }

    pub fn publishes(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    /// Polls until `count` publishes arrived or `timeout` elapsed.
    pub fn wait_for_publishes(&self, count: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        while self.publishes() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        self.publishes()
    }

    pub fn config(&self) -> BrokerConnectionConfig {
        let mut config = BrokerConnectionConfig::new("127.0.0.1", self.port);
        config.keep_alive = Duration::from_secs(5);
        config.connect_timeout = Duration::from_secs(5);
        config
    }
}

fn serve(mut stream: TcpStream, publishes: &AtomicUsize) {
    loop {
        let mut header = [0u8; 1];
        if stream.read_exact(&mut header).is_err() {
            return;
        }
        let Some(length) = read_remaining_length(&mut stream) else {
            return;
        };
        let mut body = vec![0u8; length];
        if stream.read_exact(&mut body).is_err() {
            return;
        }
        let reply: &[u8] = match header[0] >> 4 {
            1 => &[0x20, 0x02, 0x00, 0x00],
            3 => {
                publishes.fetch_add(1, Ordering::SeqCst);
                &[]
            }
            12 => &[0xD0, 0x00],
            14 => return,
            _ => &[],
        };
        if !reply.is_empty() && stream.write_all(reply).is_err() {
            return;
        }
    }
}

fn read_remaining_length(stream: &mut TcpStream) -> Option<usize> {
    let mut length = 0usize;
    for shift in [0, 7, 14, 21] {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).ok()?;
        length |= ((byte[0] & 0x7F) as usize) << shift;
        if byte[0] & 0x80 == 0 {
            return Some(length);
        }
    }
    None
}
