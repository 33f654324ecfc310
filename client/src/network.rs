//! Client session coordination: joining, mirroring snapshots and sending
//! intents

use crate::game::{Applied, MirrorState};
use log::{debug, error, info, warn};
use shared::protocol::{self, GameMessage};
use shared::{
    Bounds, Direction, EventKind, ParticipantId, Renderer, SessionCode, SessionError, Transport,
    TransportEvent,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Lifecycle of a joined session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    Idle,
    Joining,
    /// Attached, no snapshot applied yet
    Mirroring,
    Running,
    Ended,
}

impl ClientPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientPhase::Idle => "idle",
            ClientPhase::Joining => "joining",
            ClientPhase::Mirroring => "mirroring",
            ClientPhase::Running => "running",
            ClientPhase::Ended => "ended",
        }
    }
}

/// Passive participant: mirrors host snapshots and forwards local intents
pub struct ClientSession<T: Transport> {
    transport: T,
    renderer: Box<dyn Renderer>,
    phase: ClientPhase,
    code: Option<SessionCode>,
    local_id: Option<ParticipantId>,
    /// Origin of the first applied snapshot
    host_id: Option<ParticipantId>,
    /// Set once a snapshot contained the local snake
    local_seen: bool,
    mirror: MirrorState,
    attached: bool,
}

impl<T: Transport> ClientSession<T> {
    pub fn new(transport: T, renderer: Box<dyn Renderer>, bounds: Bounds) -> Self {
        Self {
            transport,
            renderer,
            phase: ClientPhase::Idle,
            code: None,
            local_id: None,
            host_id: None,
            local_seen: false,
            mirror: MirrorState::new(bounds),
            attached: false,
        }
    }

    /// Validates `raw_code` and attaches to the session.
    ///
    /// A malformed code fails with `InvalidSessionCode` before anything is
    /// sent; a transport failure leaves the session `Idle` so the caller can
    /// retry.
    pub async fn join(&mut self, raw_code: &str) -> Result<ParticipantId, SessionError> {
        if self.phase != ClientPhase::Idle {
            return Err(self.phase_error(ClientPhase::Idle));
        }
        let code = SessionCode::parse(raw_code)?;

        self.phase = ClientPhase::Joining;
        let id = match self.transport.join(&code).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to join {}: {}", code, e);
                self.phase = ClientPhase::Idle;
                return Err(e.into());
            }
        };

        info!("Joined session {} as {}", code, id);
        self.attached = true;
        self.code = Some(code);
        self.local_id = Some(id.clone());
        self.phase = ClientPhase::Mirroring;
        Ok(id)
    }

    /// Applies one inbound transport event. Returns what happened to the
    /// snapshot it carried, if any.
    ///
    /// The origin of the first applied snapshot is taken as the host, and
    /// only a `Left` from that id ends the session. A host that leaves
    /// before sending anything is noticed when the transport closes.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<Applied> {
        if !matches!(self.phase, ClientPhase::Mirroring | ClientPhase::Running) {
            debug!("Ignoring {:?} event while {}", event.kind, self.phase.as_str());
            return None;
        }

        match event.kind {
            EventKind::Game => match protocol::decode(&event.payload) {
                Ok(GameMessage::State(snapshot)) => {
                    let applied = self.mirror.apply_snapshot(snapshot);
                    if applied == Applied::Replaced {
                        self.after_snapshot(&event.origin);
                    }
                    Some(applied)
                }
                Ok(GameMessage::Input { .. }) => {
                    warn!("Ignoring input payload from {}", event.origin);
                    None
                }
                Err(e) => {
                    warn!("Malformed payload #{} from {}: {}", event.message_id, event.origin, e);
                    None
                }
            },
            EventKind::Left if self.host_id.as_ref() == Some(&event.origin) => {
                info!("Host {} left, session over", event.origin);
                self.phase = ClientPhase::Ended;
                None
            }
            EventKind::Left => {
                debug!("Participant {} left", event.origin);
                None
            }
            EventKind::Joined => None,
        }
    }

    fn after_snapshot(&mut self, origin: &ParticipantId) {
        if self.phase == ClientPhase::Mirroring {
            info!("First snapshot received from host {}, game running", origin);
            self.host_id = Some(origin.clone());
            self.phase = ClientPhase::Running;
        }

        let present = self
            .local_id
            .as_ref()
            .map_or(false, |id| self.mirror.snake(id).is_some());
        if present {
            self.local_seen = true;
        } else if self.local_seen {
            info!("Local snake no longer in the session");
        }
    }

    /// Handles every event already queued on the transport without waiting.
    /// Returns how many were handled.
    pub fn poll_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.transport.try_next_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Sends `direction` to the host right away. Nothing is coalesced on
    /// this side; the host keeps the last one per tick.
    pub fn send_intent(&mut self, direction: Direction) -> Result<(), SessionError> {
        if !matches!(self.phase, ClientPhase::Mirroring | ClientPhase::Running) {
            return Err(self.phase_error(ClientPhase::Running));
        }
        let payload = protocol::encode(&GameMessage::Input { direction })?;
        self.transport.transmit(payload)?;
        Ok(())
    }

    /// Draws the mirror once a snapshot has been applied
    pub fn frame(&mut self) {
        if self.phase != ClientPhase::Running {
            return;
        }
        if let Some(local) = self.local_id.as_ref() {
            self.renderer
                .draw(self.mirror.snakes(), self.mirror.food(), local);
        }
    }

    /// True once the local snake is dead, or was mirrored before and has
    /// since been dropped from the session
    pub fn is_game_over(&self) -> bool {
        let Some(id) = self.local_id.as_ref() else {
            return false;
        };
        match self.mirror.snake(id) {
            Some(snake) => !snake.is_alive(),
            None => self.local_seen,
        }
    }

    /// Detaches from the session
    pub async fn leave(&mut self) {
        if self.attached {
            self.transport.leave().await;
            self.attached = false;
        }
        if self.phase != ClientPhase::Ended {
            info!("Left session");
        }
        self.phase = ClientPhase::Ended;
    }

    /// Mirrors the session until the host leaves or the transport closes
    pub async fn run(
        &mut self,
        mut intents: mpsc::UnboundedReceiver<Direction>,
    ) -> Result<(), SessionError> {
        if !matches!(self.phase, ClientPhase::Mirroring | ClientPhase::Running) {
            return Err(self.phase_error(ClientPhase::Mirroring));
        }

        let mut frames = interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.phase != ClientPhase::Ended {
            tokio::select! {
                event = self.transport.next_event() => {
                    match event {
                        Some(event) => {
                            self.handle_event(event);
                        }
                        None => {
                            info!("Transport closed");
                            break;
                        }
                    }
                },

                Some(direction) = intents.recv() => {
                    if let Err(e) = self.send_intent(direction) {
                        error!("Failed to send intent {}: {}", direction, e);
                    }
                },

                _ = frames.tick() => {
                    self.frame();
                },
            }
        }

        self.leave().await;
        Ok(())
    }

    fn phase_error(&self, expected: ClientPhase) -> SessionError {
        SessionError::InvalidPhase {
            expected: expected.as_str(),
            actual: self.phase.as_str(),
        }
    }

    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    pub fn session_code(&self) -> Option<&SessionCode> {
        self.code.as_ref()
    }

    pub fn local_id(&self) -> Option<&ParticipantId> {
        self.local_id.as_ref()
    }

    /// The host, known once its first snapshot has been applied
    pub fn host_id(&self) -> Option<&ParticipantId> {
        self.host_id.as_ref()
    }

    pub fn mirror(&self) -> &MirrorState {
        &self.mirror
    }
}
