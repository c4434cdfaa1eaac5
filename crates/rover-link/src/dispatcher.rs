//! Central dispatch loop.
//!
//! The dispatcher is the only component that touches both the link and
//! the grid model. It owns:
//! - the `GridModel` and the `RunTracker` for the current session,
//! - the inbound framer (reset on every connection change),
//! - the registry of notification subscribers.
//!
//! Inbound: link chunk → framer → decode → model → notifications.
//! Outbound: `request_*` → encode → `LinkSession::write`.
//!
//! Model updates and the notifications they produce happen under one
//! write lock, so every subscriber sees changes in commit order. That lock
//! is never held across a write to the link.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rover_core::{
    report_entries, GridModel, ModelChange, Obstacle, ObstacleId, Orientation, OutboundCommand,
    Pose, PresetEntry, Primitive, ProtocolEvent, RunKind, RunPhase, RunTracker, Turn,
    OBSTACLE_COUNT,
};
use rover_protocol::{decode, encode, encode_obstacle_report, Framer, FramingMode};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{DriveConfig, LinkConfig};
use crate::connector::Connector;
use crate::error::{DispatchError, LinkError};
use crate::session::LinkSession;
use crate::types::{
    ConnectionState, LinkEvent, LinkEventRx, Notification, NotificationRx, ObserverRegistry,
    SubscriberId,
};

/// State tied to one controller session.
#[derive(Debug, Default)]
struct Session {
    model: GridModel,
    run: RunTracker,
    run_started: Option<Instant>,
}

impl Session {
    /// Apply one decoded event and describe what it changed.
    fn apply(&mut self, event: ProtocolEvent) -> Result<Vec<Notification>, DispatchError> {
        if let ProtocolEvent::StatusUpdate { text, terminal } = event {
            let mut out = vec![Notification::StatusText { text, terminal }];
            if let Some(kind) = self.run.status(terminal) {
                out.push(self.run_completed(kind));
            }
            return Ok(out);
        }

        let from_target = matches!(event, ProtocolEvent::TargetRecognized { .. });
        let changes = self.model.apply_event(event)?;

        let mut out = Vec::with_capacity(changes.len());
        for change in changes {
            match change {
                ModelChange::Pose(pose) => out.push(Notification::PoseChanged(pose)),
                ModelChange::Obstacle { id, obstacle } => {
                    out.push(Notification::ObstacleChanged { id, obstacle });
                    if from_target {
                        if let Some(kind) = self.run.target_recognized(id) {
                            out.push(self.run_completed(kind));
                        }
                    }
                }
                ModelChange::TargetRetry { id } => out.push(Notification::TargetRetry { id }),
            }
        }
        Ok(out)
    }

    fn start_run(&mut self, kind: RunKind) {
        self.run.start(kind);
        self.run_started = Some(Instant::now());
        info!("{:?} run started", kind);
    }

    fn run_completed(&mut self, kind: RunKind) -> Notification {
        let elapsed_ms = self
            .run_started
            .take()
            .map(|started| u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        info!("{:?} run completed in {} ms", kind, elapsed_ms);
        Notification::RunCompleted { kind, elapsed_ms }
    }
}

struct Shared {
    link: LinkSession,
    drive: DriveConfig,
    session: RwLock<Session>,
    observers: ObserverRegistry,
    next_subscriber: AtomicU64,
}

/// Handle to the dispatcher. Clones share the same session.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Build a dispatcher over a fresh link session.
    ///
    /// Nothing is processed until [`Dispatcher::run`] is driven with the
    /// returned event receiver; [`Dispatcher::spawn`] does both.
    pub fn new(
        connector: Arc<dyn Connector>,
        link_config: LinkConfig,
        drive: DriveConfig,
    ) -> (Dispatcher, LinkEventRx) {
        let (link, events) = LinkSession::new(connector, link_config);
        let shared = Shared {
            link,
            drive,
            session: RwLock::new(Session::default()),
            observers: Arc::new(RwLock::new(Default::default())),
            next_subscriber: AtomicU64::new(1),
        };

        (
            Dispatcher {
                shared: Arc::new(shared),
            },
            events,
        )
    }

    /// Build a dispatcher and run its loop on a new task.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        link_config: LinkConfig,
        drive: DriveConfig,
    ) -> (Dispatcher, JoinHandle<()>) {
        let (dispatcher, events) = Dispatcher::new(connector, link_config, drive);
        let runner = dispatcher.clone();
        let handle = tokio::spawn(async move {
            runner.run(events).await;
        });
        (dispatcher, handle)
    }

    /// Process link events until the link side goes away.
    pub async fn run(self, mut events: LinkEventRx) {
        let config = self.shared.link.config();
        let mut framer = Framer::new(config.framing, config.max_frame_len);

        while let Some(event) = events.recv().await {
            match event {
                LinkEvent::StateChanged { state, remote_id } => {
                    if framer.pending() > 0 {
                        debug!("Dropping {} bytes of a partial message", framer.pending());
                    }
                    framer.reset();

                    let _session = self.shared.session.write().await;
                    self.publish(Notification::ConnectionStateChanged { state, remote_id })
                        .await;
                }
                LinkEvent::Inbound(chunk) => {
                    let overflows = framer.overflows();
                    let frames = framer.push(&chunk);
                    if framer.overflows() > overflows {
                        warn!(
                            "Discarded a message longer than {} bytes",
                            config.max_frame_len
                        );
                    }
                    for frame in frames {
                        self.handle_frame(frame).await;
                    }
                }
            }
        }

        info!("Dispatcher loop shutting down (link events closed)");
    }

    async fn handle_frame(&self, text: String) {
        let mut session = self.shared.session.write().await;
        self.publish(Notification::Received(text.clone())).await;

        let event = match decode(&text) {
            Ok(event) => event,
            Err(source) => {
                self.reject(DispatchError::Decode { text, source }).await;
                return;
            }
        };
        debug!("Decoded {:?}", event);

        match session.apply(event) {
            Ok(notifications) => {
                for notification in notifications {
                    self.publish(notification).await;
                }
            }
            Err(err) => self.reject(err).await,
        }
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    /// Register a new observer. Notifications arrive in commit order; the
    /// observer is dropped from the registry once its receiver is closed.
    pub async fn subscribe(&self) -> NotificationRx {
        let id = SubscriberId(self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        let mut guard = self.shared.observers.write().await;
        guard.insert(id, tx);
        rx
    }

    async fn publish(&self, notification: Notification) {
        let closed: Vec<SubscriberId> = {
            let guard = self.shared.observers.read().await;
            guard
                .iter()
                .filter(|(_, tx)| tx.send(notification.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };

        if !closed.is_empty() {
            let mut guard = self.shared.observers.write().await;
            for id in closed {
                debug!("Subscriber {} went away", id.0);
                guard.remove(&id);
            }
        }
    }

    async fn reject(&self, err: DispatchError) {
        warn!("Dropped: {}", err);
        self.publish(Notification::Rejected(err.to_string())).await;
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.link.state()
    }

    pub fn remote_id(&self) -> Option<String> {
        self.shared.link.remote_id()
    }

    pub fn framing(&self) -> FramingMode {
        self.shared.link.config().framing
    }

    pub async fn pose(&self) -> Pose {
        self.shared.session.read().await.model.pose()
    }

    pub async fn obstacles(&self) -> [Obstacle; OBSTACLE_COUNT] {
        *self.shared.session.read().await.model.obstacles()
    }

    pub async fn run_phase(&self) -> RunPhase {
        self.shared.session.read().await.run.phase()
    }

    /// Current arrangement, ready for a preset store.
    pub async fn preset_entries(&self) -> Vec<PresetEntry> {
        self.shared.session.read().await.model.preset_entries()
    }

    // -------------------------------------------------------------------------
    // Link
    // -------------------------------------------------------------------------

    pub async fn request_connect(&self, remote_id: &str) -> Result<(), LinkError> {
        self.shared.link.connect(remote_id).await
    }

    pub fn request_disconnect(&self) {
        self.shared.link.disconnect();
    }

    /// Encode and write one command.
    ///
    /// Returns whether it went out. Sending while disconnected is not an
    /// error; the command is simply dropped.
    pub async fn send(&self, cmd: &OutboundCommand) -> bool {
        let mut payload = Vec::with_capacity(64);
        encode(cmd, &mut payload);
        self.send_payload(payload).await
    }

    /// Send free text, e.g. from the console's `say` command.
    pub async fn send_text(&self, text: &str) -> bool {
        self.send(&OutboundCommand::Text(text.to_string())).await
    }

    async fn send_payload(&self, mut payload: Vec<u8>) -> bool {
        payload.extend_from_slice(self.framing().terminator());

        match self.shared.link.write(&payload).await {
            Ok(()) => {
                debug!("Sent {:?}", String::from_utf8_lossy(&payload).trim_end());
                true
            }
            Err(LinkError::NotConnected) => {
                debug!("Not connected; dropped {:?}", String::from_utf8_lossy(&payload).trim_end());
                false
            }
            Err(e) => {
                error!("Send failed: {}", e);
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Manual arrow buttons.
    ///
    /// The raw drive code always goes out (when connected), and the model
    /// follows locally either way. Forward/reverse move `straight_cells`;
    /// the left/right buttons (`LF`/`RF`) turn in place. Any other
    /// primitive moves by its table geometry.
    pub async fn request_manual_drive(&self, primitive: Primitive) -> Result<Pose, DispatchError> {
        let drive = &self.shared.drive;
        let magnitude = if primitive.is_straight() {
            drive.straight_wire
        } else {
            drive.turn_wire
        };

        let sent = self
            .send(&OutboundCommand::RawDrive {
                primitive,
                magnitude,
            })
            .await;
        debug!("Manual {} (sent: {})", primitive.code(), sent);

        let mut session = self.shared.session.write().await;
        let result = match primitive {
            Primitive::ArcLeftForward => Ok(session.model.turn_in_place(Turn::Left)),
            Primitive::ArcRightForward => Ok(session.model.turn_in_place(Turn::Right)),
            p if p.is_straight() => session.model.apply_drive(p, drive.straight_cells),
            p => session.model.apply_drive(p, 0),
        };

        match result {
            Ok(pose) => {
                self.publish(Notification::PoseChanged(pose)).await;
                Ok(pose)
            }
            Err(e) => {
                let err = DispatchError::from(e);
                self.reject_local(&err).await;
                Err(err)
            }
        }
    }

    /// Report every obstacle slot to the vehicle.
    pub async fn request_send_obstacles(&self) -> bool {
        let entries = report_entries(self.shared.session.read().await.model.obstacles());
        let mut payload = Vec::with_capacity(64);
        let reported = encode_obstacle_report(&entries, &mut payload);

        if !self.send_payload(payload).await {
            return false;
        }
        self.shared
            .session
            .write()
            .await
            .run
            .obstacles_reported(reported);
        info!("Reported {} obstacles", reported);
        true
    }

    /// Start the image-recognition run.
    pub async fn request_algorithm_start(&self) -> bool {
        self.start_run(OutboundCommand::AlgorithmStart, RunKind::ImageRecognition)
            .await
    }

    /// Start the shortest-path run.
    pub async fn request_shortest_path_start(&self) -> bool {
        self.start_run(OutboundCommand::ShortestPathStart, RunKind::ShortestPath)
            .await
    }

    async fn start_run(&self, cmd: OutboundCommand, kind: RunKind) -> bool {
        if !self.send(&cmd).await {
            return false;
        }
        let mut session = self.shared.session.write().await;
        session.start_run(kind);
        self.publish(Notification::RunStarted(kind)).await;
        true
    }

    // -------------------------------------------------------------------------
    // Local edits
    // -------------------------------------------------------------------------

    pub async fn place_obstacle(
        &self,
        id: u8,
        x: i32,
        y: i32,
        orientation: Orientation,
    ) -> Result<Obstacle, DispatchError> {
        self.edit_obstacle(id, |model, id| {
            model.set_obstacle_manual(id, x, y, orientation)
        })
        .await
    }

    pub async fn rotate_obstacle(&self, id: u8, turn: Turn) -> Result<Obstacle, DispatchError> {
        self.edit_obstacle(id, |model, id| model.rotate_obstacle(id, turn))
            .await
    }

    /// Put an obstacle back in the tray.
    pub async fn remove_obstacle(&self, id: u8) -> Result<Obstacle, DispatchError> {
        self.edit_obstacle(id, |model, id| model.remove_obstacle(id))
            .await
    }

    async fn edit_obstacle<F>(&self, id: u8, edit: F) -> Result<Obstacle, DispatchError>
    where
        F: FnOnce(&mut GridModel, u8) -> Result<Obstacle, rover_core::ModelError>,
    {
        let mut session = self.shared.session.write().await;

        let result = ObstacleId::new(id).and_then(|obstacle_id| {
            edit(&mut session.model, id).map(|obstacle| (obstacle_id, obstacle))
        });

        match result {
            Ok((id, obstacle)) => {
                self.publish(Notification::ObstacleChanged { id, obstacle })
                    .await;
                Ok(obstacle)
            }
            Err(e) => {
                let err = DispatchError::from(e);
                self.reject_local(&err).await;
                Err(err)
            }
        }
    }

    /// Vehicle to start, obstacles to the tray, run forgotten.
    pub async fn reset(&self) {
        let mut session = self.shared.session.write().await;
        let changes = session.model.reset();
        session.run.reset();
        session.run_started = None;
        info!("Model reset");

        for change in changes {
            let notification = match change {
                ModelChange::Pose(pose) => Notification::PoseChanged(pose),
                ModelChange::Obstacle { id, obstacle } => {
                    Notification::ObstacleChanged { id, obstacle }
                }
                ModelChange::TargetRetry { id } => Notification::TargetRetry { id },
            };
            self.publish(notification).await;
        }
    }

    /// Replace the obstacle arrangement with a saved one.
    pub async fn load_preset(&self, entries: &[PresetEntry]) -> Result<(), DispatchError> {
        let mut session = self.shared.session.write().await;

        match session.model.load_preset(entries) {
            Ok(changes) => {
                for change in changes {
                    if let ModelChange::Obstacle { id, obstacle } = change {
                        self.publish(Notification::ObstacleChanged { id, obstacle })
                            .await;
                    }
                }
                Ok(())
            }
            Err(e) => {
                let err = DispatchError::from(e);
                self.reject_local(&err).await;
                Err(err)
            }
        }
    }

    async fn reject_local(&self, err: &DispatchError) {
        warn!("Local edit rejected: {}", err);
        self.publish(Notification::Rejected(err.to_string())).await;
    }
}
