//! `rumqttc`-backed transport
//!
//! Uses the synchronous `rumqttc::Client`. Each session owns one thread that
//! drives the protocol event loop; `connect` blocks until the broker answers
//! the CONNECT with a CONNACK or the configured connect timeout elapses.
//! After a successful connect, dropped connections are retried by the event
//! loop and reflected in `is_connected` until the session is disconnected.
//!
//! Publishing waits for room in the outgoing request queue. Disconnecting never
//! waits longer than [`SHUTDOWN_GRACE`] for the event loop; a loop still busy
//! after that is detached and exits on its next notification.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rumqttc::{
    Client, ClientError, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet,
    TlsConfiguration, Transport,
};
use tracing::{debug, info, warn};

use crate::mqtt::config::{BrokerConnectionConfig, Protocol};
use crate::mqtt::qos::QosLevel;
use crate::mqtt::transport::{MqttSession, MqttTransport};
use crate::utils::error::{ConfigurationError, TransportError};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on how long `disconnect` waits for the event loop to exit.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RumqttTransport {
    request_capacity: usize,
}

impl Default for RumqttTransport {
    fn default() -> Self {
        Self {
            request_capacity: 64,
        }
    }
}

impl RumqttTransport {
    /// `request_capacity` bounds the outgoing request queue of each session.
    pub fn new(request_capacity: usize) -> Self {
        Self {
            request_capacity: request_capacity.max(1),
        }
    }

    pub fn mqtt_options(config: &BrokerConnectionConfig) -> Result<MqttOptions, ConfigurationError> {
        config.validate()?;

        let mut options = MqttOptions::new(config.client_id.clone(), config.hostname.clone(), config.port);
        options.set_clean_session(config.clean_session);
        options.set_keep_alive(config.keep_alive);

        if let Some(credentials) = &config.credentials {
            options.set_credentials(
                credentials.username.clone(),
                credentials.password.clone().unwrap_or_default(),
            );
        }

        if config.protocol == Protocol::Tls {
            let trust_store = config
                .tls
                .trust_store
                .as_ref()
                .ok_or(ConfigurationError::MissingTrustStore)?;
            let ca = read_material(&trust_store.path)?;

            let client_auth = match &config.tls.key_store {
                Some(key_store) => {
                    // one PEM file carries both the certificate chain and the key
                    let pem = read_material(&key_store.path)?;
                    Some((pem.clone(), pem))
                }
                None => None,
            };

            let stores = [&config.tls.trust_store, &config.tls.key_store];
            if stores
                .iter()
                .any(|store| store.as_ref().is_some_and(|s| s.password.is_some()))
            {
                warn!("store passwords are ignored, TLS material must be unencrypted PEM");
            }

            options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth,
            }));
        }

        Ok(options)
    }
}

fn read_material(path: &str) -> Result<Vec<u8>, ConfigurationError> {
    fs::read(path).map_err(|source| ConfigurationError::TlsMaterial {
        path: path.to_string(),
        source,
    })
}

impl MqttTransport for RumqttTransport {
    fn connect(&self, config: &BrokerConnectionConfig) -> Result<Box<dyn MqttSession>, TransportError> {
        let options = Self::mqtt_options(config)?;
        let (client, connection) = Client::new(options, self.request_capacity);

        let connected = Arc::new(AtomicBool::new(false));
        let closing = Arc::new(AtomicBool::new(false));
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        // dropped by the worker on exit, which wakes a waiting `close`
        let (exit_tx, exit_rx) = mpsc::channel::<()>();

        let worker = {
            let connected = connected.clone();
            let closing = closing.clone();
            thread::Builder::new()
                .name(format!("mqtt-{}", config.client_id))
                .spawn(move || {
                    let _exit = exit_tx;
                    drive_event_loop(connection, connected, closing, ack_tx)
                })
                .map_err(|e| TransportError::Transport(format!("event loop thread: {e}")))?
        };

        let session = RumqttSession {
            client,
            connected,
            closing,
            worker: Mutex::new(Some(Worker {
                handle: worker,
                exited: exit_rx,
            })),
        };

        match ack_rx.recv_timeout(config.connect_timeout) {
            Ok(Ok(())) => Ok(Box::new(session)),
            Ok(Err(reason)) => Err(TransportError::Transport(reason)),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::ConnectTimeout(config.connect_timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Transport(
                "event loop exited before the broker answered".to_string(),
            )),
        }
        // on the error paths `session` drops here, which stops its event loop
    }
}

fn drive_event_loop(
    mut connection: Connection,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    ack_tx: SyncSender<Result<(), String>>,
) {
    let mut ack = Some(ack_tx);
    for notification in connection.iter() {
        if closing.load(Ordering::SeqCst) {
            break;
        }
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                let accepted = connack.code == ConnectReturnCode::Success;
                connected.store(accepted, Ordering::SeqCst);
                let reply = if accepted {
                    Ok(())
                } else {
                    Err(format!("broker refused connection: {:?}", connack.code))
                };
                match ack.take() {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None if accepted => info!("Reconnected to MQTT broker."),
                    None => warn!(code = ?connack.code, "broker refused reconnect"),
                }
                if !accepted {
                    break;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                break;
            }
            Ok(_) => {}
            Err(err) => {
                connected.store(false, Ordering::SeqCst);
                if let Some(tx) = ack.take() {
                    let _ = tx.send(Err(err.to_string()));
                    break;
                }
                warn!(error = %err, "MQTT connection lost, retrying");
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
    debug!("MQTT event loop exited");
}

struct Worker {
    handle: JoinHandle<()>,
    exited: Receiver<()>,
}

struct RumqttSession {
    client: Client,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    worker: Mutex<Option<Worker>>,
}

impl RumqttSession {
    fn close(&self) -> Result<(), TransportError> {
        if self.closing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.connected.store(false, Ordering::SeqCst);
        // a full request queue only delays the DISCONNECT packet; the loop
        // still stops on its next notification because `closing` is set
        let result = self.client.try_disconnect().map_err(TransportError::from);
        if let Err(err) = &result {
            warn!(error = %err, "DISCONNECT not queued, stopping event loop without it");
        }

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            match worker.exited.recv_timeout(SHUTDOWN_GRACE) {
                Err(RecvTimeoutError::Timeout) => {
                    warn!(grace = ?SHUTDOWN_GRACE, "MQTT event loop still busy, detaching it");
                }
                _ => {
                    if worker.handle.join().is_err() {
                        warn!("MQTT event loop thread panicked");
                    }
                }
            }
        }
        result
    }
}

impl MqttSession for RumqttSession {
    fn publish(&self, topic: &str, payload: &[u8], qos: QosLevel, retain: bool) -> Result<(), TransportError> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        // blocks while the request queue is full
        match self.client.publish(topic, qos.into(), retain, payload.to_vec()) {
            Ok(()) => Ok(()),
            // the event loop is gone, nothing will ever take the message
            Err(ClientError::Request(_)) => Err(TransportError::Persistence(format!(
                "event loop stopped, message for '{topic}' was not queued"
            ))),
            Err(err) => Err(TransportError::Client(err)),
        }
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        self.close()
    }

    fn is_connected(&self) -> bool {
        !self.closing.load(Ordering::SeqCst) && self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for RumqttSession {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "MQTT session dropped without clean disconnect");
        }
    }
}
