// Session loop: single consumer of transport, tick and UI events

mod dispatcher;

pub use dispatcher::{Dispatcher, Effect, Unhandled};

use crate::command::{instructions, Command, CommandBuilder};
use crate::config::RoomsyncConfig;
use crate::message::{decode, DecodeError, Instruction, SetupContents};
use crate::state::{RoomSnapshot, RoomState};
use crate::timer::{Tick, TimerEngine};
use crate::transport::{Transport, TransportEvent};
use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, trace, warn};

/// How long a notification stays on screen
pub const NOTIFICATION_DURATION: Duration = Duration::from_secs(3);

/// Upper bound on the goodbye message and transport flush at teardown
const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

/// Everything the session loop reacts to, in arrival order
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Transport(TransportEvent),
    Tick(Tick),
    /// UI-driven outbound command
    Command(Command),
    /// Drop all room data and restart the timers
    ResetConfig,
    Shutdown,
}

impl From<TransportEvent> for SessionEvent {
    fn from(event: TransportEvent) -> Self {
        SessionEvent::Transport(event)
    }
}

impl From<Tick> for SessionEvent {
    fn from(tick: Tick) -> Self {
        SessionEvent::Tick(tick)
    }
}

/// Operator-facing message, fire and forget
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub message: String,
    /// Optional action button label
    pub action: String,
    #[serde(skip)]
    pub duration: Duration,
}

/// Counters for dropped and applied events
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub messages_applied: u64,
    pub decode_errors: u64,
    pub invalid_messages: u64,
    pub ticks_applied: u64,
    pub stale_ticks: u64,
    pub sends_failed: u64,
}

/// Create the session event channel
pub fn channel(capacity: usize) -> (mpsc::Sender<SessionEvent>, mpsc::Receiver<SessionEvent>) {
    mpsc::channel(capacity)
}

/// One client session against the back-end.
///
/// Owns the room state, the timer engine and the outbound builder. All
/// mutations happen on the task running `run`, one event at a time.
pub struct Session<T> {
    room: RoomState,
    dispatcher: Dispatcher,
    commands: CommandBuilder,
    transport: T,
    timers: TimerEngine<SessionEvent>,
    tick_quantum_ms: u64,
    connected: bool,
    stats: SessionStats,
    /// Weak so the channel closes once every handle and transport is gone
    events_tx: mpsc::WeakSender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    notifications: broadcast::Sender<Notification>,
    snapshots: watch::Sender<RoomSnapshot>,
}

impl<T: Transport> Session<T> {
    pub fn new(
        config: &RoomsyncConfig,
        transport: T,
        events_tx: &mpsc::Sender<SessionEvent>,
        events_rx: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        let room = RoomState::new();
        let (notifications, _) = broadcast::channel(100);
        let (snapshots, _) = watch::channel(room.snapshot());
        let period = Duration::from_millis(config.timer.period_ms);

        Self {
            room,
            dispatcher: Dispatcher::new(&config.client.id, &config.client.upstream_id),
            commands: CommandBuilder::new(&config.client.id, &config.client.outbound_topic),
            transport,
            timers: TimerEngine::new(events_tx, period),
            tick_quantum_ms: config.timer.period_ms,
            connected: false,
            stats: SessionStats::default(),
            events_tx: events_tx.downgrade(),
            events_rx,
            notifications,
            snapshots,
        }
    }

    /// Handle for UI consumers and lifecycle control.
    ///
    /// `None` once every sender of the session channel has been dropped.
    pub fn handle(&self) -> Option<SessionHandle> {
        Some(SessionHandle {
            events: self.events_tx.upgrade()?,
            notifications: self.notifications.clone(),
            snapshots: self.snapshots.subscribe(),
        })
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn room(&self) -> &RoomState {
        &self.room
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn timers_running(&self) -> bool {
        self.timers.is_running()
    }

    /// Apply a setup document outside of the message flow (startup config)
    pub fn apply_setup(&mut self, setup: &SetupContents) {
        self.room.apply_setup(setup);
        self.publish_snapshot();
    }

    /// Process events until `Shutdown` or until every sender is gone, then
    /// tear down.
    ///
    /// Returns the session so its final state can be inspected.
    pub async fn run(mut self) -> Self {
        info!(client = %self.commands.client_id(), "Session started");

        while let Some(event) = self.events_rx.recv().await {
            if event == SessionEvent::Shutdown {
                break;
            }
            self.handle_event(event).await;
        }

        self.teardown().await;
        self
    }

    /// Handle a single event and publish the resulting snapshot
    pub async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transport(TransportEvent::Message { topic, payload }) => {
                self.on_message(&topic, &payload).await;
            }
            SessionEvent::Transport(TransportEvent::Connected) => self.on_connect().await,
            SessionEvent::Transport(TransportEvent::Offline) => self.on_offline(),
            SessionEvent::Tick(tick) => self.on_tick(tick),
            SessionEvent::Command(command) => self.send(command).await,
            SessionEvent::ResetConfig => self.reset_config(),
            SessionEvent::Shutdown => self.teardown().await,
        }
        self.publish_snapshot();
    }

    async fn on_message(&mut self, topic: &str, payload: &[u8]) {
        debug!(
            topic = %topic,
            "received message: {}",
            String::from_utf8_lossy(payload)
        );

        let envelope = match decode(payload) {
            Ok(envelope) => envelope,
            Err(DecodeError::UnknownType(kind)) => {
                self.stats.invalid_messages += 1;
                error!(topic = %topic, "received invalid message type {}", kind);
                return;
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                error!(topic = %topic, error = %e, "Failed to decode message, dropping");
                return;
            }
        };

        match self.dispatcher.dispatch(&mut self.room, envelope) {
            Ok(effects) => {
                self.stats.messages_applied += 1;
                for effect in effects {
                    match effect {
                        Effect::Notify(message) => self.notify(message, ""),
                        Effect::Send(command) => self.send(command).await,
                    }
                }
            }
            Err(unhandled) => {
                self.stats.invalid_messages += 1;
                error!(topic = %topic, "{}", unhandled);
            }
        }
    }

    /// Request setup, announce ourselves, and (re)start the countdown
    async fn on_connect(&mut self) {
        if self.connected {
            debug!("Already connected, ignoring repeated connect event");
            return;
        }
        self.connected = true;
        info!("Connected to broker");

        self.send(Command::Instruction(vec![instructions::send_setup()]))
            .await;
        self.send(Command::Connection(true)).await;
        self.timers.start();
    }

    fn on_offline(&mut self) {
        self.connected = false;
        error!("Connection to broker lost");
        self.room.devices_mut().set_connection_all(false);
    }

    fn on_tick(&mut self, tick: Tick) {
        if !self.timers.accepts(tick) {
            self.stats.stale_ticks += 1;
            trace!(generation = tick.generation, "Dropping tick from stopped source");
            return;
        }
        self.stats.ticks_applied += 1;
        self.room.tick(self.tick_quantum_ms);
    }

    /// Drop all room data and restart the countdown with fresh timers
    fn reset_config(&mut self) {
        self.timers.stop();
        self.room = RoomState::new();
        self.timers.start();
        info!("Room state reset");
    }

    async fn send(&mut self, command: Command) {
        let envelope = self.commands.build(command);
        if !self.commands.publish(&self.transport, &envelope).await {
            self.stats.sends_failed += 1;
        }
    }

    fn notify(&self, message: String, action: &str) {
        info!(action = %action, "notification: {}", message);
        let _ = self.notifications.send(Notification {
            message,
            action: action.to_string(),
            duration: NOTIFICATION_DURATION,
        });
    }

    /// Stop the tick source, then say goodbye. Both steps are best effort
    /// with respect to the transport.
    async fn teardown(&mut self) {
        self.timers.stop();

        let goodbye = async {
            self.send(Command::Connection(false)).await;
            if let Err(e) = self.transport.close().await {
                warn!(error = %e, "Failed to close transport");
            }
        };
        if tokio::time::timeout(TEARDOWN_GRACE, goodbye).await.is_err() {
            warn!("Transport unresponsive during teardown, giving up");
        }
        self.connected = false;
        self.publish_snapshot();
        info!("Session stopped");
    }

    fn publish_snapshot(&self) {
        self.snapshots.send_replace(self.room.snapshot());
    }
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    notifications: broadcast::Sender<Notification>,
    snapshots: watch::Receiver<RoomSnapshot>,
}

impl SessionHandle {
    async fn submit(&self, event: SessionEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| anyhow!("Session is no longer running"))
    }

    pub async fn send_instruction(&self, instructions: Vec<Instruction>) -> Result<()> {
        self.submit(SessionEvent::Command(Command::Instruction(instructions)))
            .await
    }

    pub async fn send_status(&self, start: impl Into<Value>, stop: impl Into<Value>) -> Result<()> {
        self.submit(SessionEvent::Command(Command::Status {
            start: start.into(),
            stop: stop.into(),
        }))
        .await
    }

    pub async fn send_connection(&self, connected: bool) -> Result<()> {
        self.submit(SessionEvent::Command(Command::Connection(connected)))
            .await
    }

    pub async fn reset_config(&self) -> Result<()> {
        self.submit(SessionEvent::ResetConfig).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.submit(SessionEvent::Shutdown).await
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Latest room snapshot
    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch receiver that changes after every handled event
    pub fn watch(&self) -> watch::Receiver<RoomSnapshot> {
        self.snapshots.clone()
    }
}
