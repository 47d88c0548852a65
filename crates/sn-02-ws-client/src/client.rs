//! Reconnecting real-time client.
//!
//! The client is the source of truth for subscriptions: the hub forgets
//! them when a connection drops, so every successful connection re-joins
//! the default room and re-sends everything the caller asked for.

use crate::config::ClientConfig;
use crate::connector::{Connection, Connector, TungsteniteConnector};
use crate::dispatch::{ListenerHandle, ListenerRegistry};
use crate::error::{ClientError, ListenerError};
use crate::state::{ConnectionState, ReconnectPolicy, ReconnectTracker, RetryDecision};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use shared_types::{ClientMessage, Envelope, Topic};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How a single connection ended.
enum SessionEnd {
    Stopped,
    Lost(ClientError),
    Rejected(ClientError),
}

pub struct RealtimeClient {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    listeners: ListenerRegistry,
    subscriptions: Mutex<BTreeSet<Topic>>,
    rooms: Mutex<BTreeSet<Topic>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    state: watch::Sender<ConnectionState>,
    stop: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<Result<(), ClientError>>>>,
    /// Every state set, in order; the watch channel only keeps the latest
    #[cfg(test)]
    transitions: Mutex<Vec<ConnectionState>>,
}

impl RealtimeClient {
    /// Client over real WebSockets.
    pub fn new(config: ClientConfig) -> Arc<Self> {
        Self::with_connector(config, Arc::new(TungsteniteConnector))
    }

    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            config,
            connector,
            listeners: ListenerRegistry::new(),
            subscriptions: Mutex::new(BTreeSet::new()),
            rooms: Mutex::new(BTreeSet::new()),
            outbound: Mutex::new(None),
            state,
            stop: Mutex::new(None),
            task: Mutex::new(None),
            #[cfg(test)]
            transitions: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Start the connection loop. No-op while one is already running.
    pub fn connect(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        *self.stop.lock() = Some(stop_tx);
        *task = Some(tokio::spawn(Arc::clone(self).connection_loop(stop_rx)));
    }

    /// Stop the loop and close the current connection. Does not enter
    /// FAILED.
    pub fn disconnect(&self) {
        if let Some(stop) = self.stop.lock().take() {
            let _ = stop.send(true);
        }
    }

    /// Wait for the connection loop to end. Returns the terminal error when
    /// the client gave up or was rejected.
    pub async fn wait(&self) -> Result<(), ClientError> {
        let task = self.task.lock().take();
        match task {
            Some(task) => task
                .await
                .map_err(|e| ClientError::Transport(format!("connection task: {}", e)))?,
            None => Ok(()),
        }
    }

    /// Register a callback for one inbound message type.
    pub fn on<F>(&self, kind: impl Into<String>, callback: F) -> ListenerHandle
    where
        F: Fn(&Envelope) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.listeners.on(kind, callback)
    }

    /// Subscribe to a topic now and after every reconnect.
    pub fn subscribe(&self, topic: Topic) {
        self.subscriptions.lock().insert(topic.clone());
        self.send_if_connected(ClientMessage::Subscribe(topic));
    }

    pub fn unsubscribe(&self, topic: &Topic) {
        self.subscriptions.lock().remove(topic);
        self.send_if_connected(ClientMessage::Unsubscribe(topic.clone()));
    }

    /// Join a room now and after every reconnect.
    pub fn join_room(&self, room: Topic) {
        self.rooms.lock().insert(room.clone());
        self.send_if_connected(ClientMessage::JoinRoom(room));
    }

    pub fn leave_room(&self, room: &Topic) {
        self.rooms.lock().remove(room);
        self.send_if_connected(ClientMessage::LeaveRoom(room.clone()));
    }

    pub fn subscriptions(&self) -> Vec<Topic> {
        self.subscriptions.lock().iter().cloned().collect()
    }

    /// Send one message on the live connection.
    pub fn send(&self, message: &ClientMessage) -> Result<(), ClientError> {
        let text = message.to_envelope().to_json()?;
        let outbound = self.outbound.lock();
        let tx = outbound.as_ref().ok_or(ClientError::NotConnected)?;
        tx.send(text).map_err(|_| ClientError::NotConnected)
    }

    fn send_if_connected(&self, message: ClientMessage) {
        if let Err(e) = self.send(&message) {
            debug!(error = %e, "Deferred until connected");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        #[cfg(test)]
        self.transitions.lock().push(state);
        self.state.send_replace(state);
    }

    /// Messages sent right after connecting: default room, remembered
    /// rooms, then remembered subscriptions.
    fn greeting(&self) -> Vec<ClientMessage> {
        let mut messages = Vec::new();
        if let Some(room) = &self.config.default_room {
            match Topic::from_str(room) {
                Ok(topic) => messages.push(ClientMessage::JoinRoom(topic)),
                Err(e) => warn!(room = %room, error = %e, "Invalid default room"),
            }
        }
        messages.extend(self.rooms.lock().iter().cloned().map(ClientMessage::JoinRoom));
        messages.extend(
            self.subscriptions
                .lock()
                .iter()
                .cloned()
                .map(ClientMessage::Subscribe),
        );
        messages
    }

    async fn connection_loop(
        self: Arc<Self>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<(), ClientError> {
        let mut tracker = ReconnectTracker::new(ReconnectPolicy {
            delay: self.config.reconnect_delay,
            max_attempts: self.config.max_attempts,
        });
        let url = self.config.connect_url();

        loop {
            self.set_state(ConnectionState::Connecting);

            let attempt = tokio::select! {
                result = self.connector.connect(&url) => result,
                _ = stop.changed() => {
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }
            };

            match attempt {
                Ok(connection) => {
                    tracker.on_connected();
                    self.set_state(ConnectionState::Connected);
                    info!(url = %self.config.url, "Connected");

                    match self.run_session(connection, &mut stop).await {
                        SessionEnd::Stopped => {
                            self.set_state(ConnectionState::Disconnected);
                            info!("Disconnected");
                            return Ok(());
                        }
                        SessionEnd::Rejected(e) => {
                            warn!(error = %e, "Hub rejected the connection");
                            self.set_state(ConnectionState::Failed);
                            return Err(e);
                        }
                        SessionEnd::Lost(e) => warn!(error = %e, "Connection lost"),
                    }
                }
                Err(e @ ClientError::Rejected(_)) => {
                    warn!(error = %e, "Hub refused the credentials");
                    self.set_state(ConnectionState::Failed);
                    return Err(e);
                }
                Err(e) => warn!(attempt = tracker.failures() + 1, error = %e, "Connect failed"),
            }

            match tracker.on_failure() {
                RetryDecision::RetryAfter(delay) => {
                    self.set_state(ConnectionState::ReconnectWait);
                    debug!(delay = ?delay, failures = tracker.failures(), "Reconnecting");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = stop.changed() => {
                            self.set_state(ConnectionState::Disconnected);
                            return Ok(());
                        }
                    }
                }
                RetryDecision::GiveUp { attempts } => {
                    warn!(attempts, "Reconnection failed, giving up");
                    self.set_state(ConnectionState::Failed);
                    return Err(ClientError::ReconnectExhausted { attempts });
                }
            }
        }
    }

    async fn run_session(
        &self,
        connection: Connection,
        stop: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let Connection {
            mut sink,
            mut stream,
        } = connection;

        let (tx, mut rx) = mpsc::unbounded_channel();
        *self.outbound.lock() = Some(tx);

        let end = 'session: {
            for message in self.greeting() {
                let sent = match message.to_envelope().to_json() {
                    Ok(text) => sink.send(text).await,
                    Err(e) => Err(e.into()),
                };
                if let Err(e) = sent {
                    break 'session SessionEnd::Lost(e);
                }
            }

            loop {
                tokio::select! {
                    Some(text) = rx.recv() => {
                        if let Err(e) = sink.send(text).await {
                            break 'session SessionEnd::Lost(e);
                        }
                    }
                    item = stream.next() => match item {
                        Some(Ok(text)) => self.handle_inbound(&text),
                        Some(Err(e @ ClientError::Rejected(_))) => break 'session SessionEnd::Rejected(e),
                        Some(Err(e)) => break 'session SessionEnd::Lost(e),
                        None => break 'session SessionEnd::Lost(ClientError::Closed),
                    },
                    _ = stop.changed() => {
                        let _ = sink.close().await;
                        break 'session SessionEnd::Stopped;
                    }
                }
            }
        };

        *self.outbound.lock() = None;
        end
    }

    fn handle_inbound(&self, text: &str) {
        match Envelope::parse(text) {
            Ok(envelope) => {
                self.listeners.dispatch(&envelope);
            }
            Err(e) => debug!(error = %e, "Ignoring malformed frame"),
        }
    }
}
