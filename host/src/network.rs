//! Host session coordination: transport events, local input and the tick loop

use crate::game::{GameSession, TickReport};
use crate::participants::ParticipantRegistry;
use crate::scheduler::TickScheduler;
use log::{debug, error, info, warn};
use shared::protocol::{self, GameMessage};
use shared::{
    Direction, EventKind, GameConfig, ParticipantId, Renderer, SessionCode, SessionError,
    Transport, TransportEvent,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Frame cadence of the run loop, roughly 60 Hz
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Lifecycle of a hosted session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Idle,
    /// Session open, waiting for enough participants
    Hosting,
    Running,
    Ended,
}

impl HostPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            HostPhase::Idle => "idle",
            HostPhase::Hosting => "hosting",
            HostPhase::Running => "running",
            HostPhase::Ended => "ended",
        }
    }
}

/// Authoritative session coordinator owning the game, the participant
/// registry and the transport
pub struct HostSession<T: Transport> {
    transport: T,
    renderer: Box<dyn Renderer>,
    config: GameConfig,
    phase: HostPhase,
    code: Option<SessionCode>,
    local_id: Option<ParticipantId>,
    game: Option<GameSession>,
    registry: ParticipantRegistry,
    scheduler: TickScheduler,
    attached: bool,
}

impl<T: Transport> HostSession<T> {
    pub fn new(transport: T, renderer: Box<dyn Renderer>, config: GameConfig) -> Self {
        let registry = ParticipantRegistry::new(config.max_participants);
        let scheduler = TickScheduler::new(config.tick_interval);
        Self {
            transport,
            renderer,
            config,
            phase: HostPhase::Idle,
            code: None,
            local_id: None,
            game: None,
            registry,
            scheduler,
            attached: false,
        }
    }

    /// Opens a session on the transport and creates the game with the host's
    /// own snake and an initial food item.
    ///
    /// Goes straight to `Running` when the host alone satisfies
    /// `min_participants`.
    pub async fn host(&mut self) -> Result<SessionCode, SessionError> {
        self.expect_phase(HostPhase::Idle)?;
        self.config.validate()?;

        self.phase = HostPhase::Hosting;
        let (code, host_id) = match self.transport.host().await {
            Ok(opened) => opened,
            Err(e) => {
                warn!("Failed to open session: {}", e);
                self.phase = HostPhase::Idle;
                return Err(e.into());
            }
        };
        self.attached = true;

        let game = match GameSession::new(&self.config, host_id.clone()) {
            Ok(game) => game,
            Err(e) => {
                self.phase = HostPhase::Ended;
                return Err(e.into());
            }
        };
        let now = Instant::now();
        self.registry.add(host_id.clone(), true, now);
        self.game = Some(game);
        self.code = Some(code.clone());
        self.local_id = Some(host_id.clone());
        info!("Hosting session {} as {}", code, host_id);

        self.maybe_start(now);
        Ok(code)
    }

    /// Applies one inbound transport event
    pub fn handle_event(&mut self, event: TransportEvent, now: Instant) -> Result<(), SessionError> {
        if !matches!(self.phase, HostPhase::Hosting | HostPhase::Running) {
            debug!("Ignoring {:?} event while {}", event.kind, self.phase.as_str());
            return Ok(());
        }

        match event.kind {
            EventKind::Joined => self.handle_join(event.origin, now),
            EventKind::Game => {
                self.handle_payload(&event, now);
                Ok(())
            }
            EventKind::Left => {
                self.handle_leave(&event.origin);
                Ok(())
            }
        }
    }

    /// Handles every event already queued on the transport without waiting.
    /// Returns how many were handled.
    pub fn poll_events(&mut self, now: Instant) -> Result<usize, SessionError> {
        let mut handled = 0;
        while let Some(event) = self.transport.try_next_event() {
            self.handle_event(event, now)?;
            handled += 1;
        }
        Ok(handled)
    }

    fn handle_join(&mut self, id: ParticipantId, now: Instant) -> Result<(), SessionError> {
        if self.registry.contains(&id) {
            debug!("Duplicate join from {}", id);
            return Ok(());
        }
        if !self.registry.add(id.clone(), false, now) {
            warn!(
                "Session full ({} participants), ignoring join from {}",
                self.registry.max_participants(),
                id
            );
            return Ok(());
        }

        let added = match self.game.as_mut() {
            Some(game) => game.add_participant(&id),
            None => Ok(false),
        };
        if let Err(e) = added {
            error!("No room on the grid after {} joined: {}", id, e);
            self.phase = HostPhase::Ended;
            return Err(e.into());
        }

        info!("{} joined ({} participants)", id, self.registry.len());
        self.broadcast_snapshot();
        self.maybe_start(now);
        Ok(())
    }

    fn handle_payload(&mut self, event: &TransportEvent, now: Instant) {
        if !self.registry.contains(&event.origin) {
            warn!("Payload from unknown participant {}", event.origin);
            return;
        }
        self.registry.touch(&event.origin, now);

        match protocol::decode(&event.payload) {
            Ok(GameMessage::Input { direction }) => {
                debug!("Intent {} from {}", direction, event.origin);
                self.registry.record_intent(&event.origin, direction, now);
            }
            Ok(GameMessage::State(_)) => {
                warn!("Ignoring state payload from client {}", event.origin);
            }
            Err(e) => {
                warn!(
                    "Malformed payload #{} from {}: {}",
                    event.message_id, event.origin, e
                );
            }
        }
    }

    fn handle_leave(&mut self, id: &ParticipantId) {
        let known = self.registry.remove(id);
        if let Some(game) = self.game.as_mut() {
            game.remove_participant(id);
        }
        if known {
            info!("{} left ({} participants)", id, self.registry.len());
        }
    }

    /// Records the host player's own intent
    pub fn set_local_intent(&mut self, direction: Direction, now: Instant) {
        if let Some(id) = self.local_id.clone() {
            self.registry.record_intent(&id, direction, now);
        }
    }

    /// Called once per rendered frame. Runs at most one tick when one is due,
    /// then draws. Returns the report of the tick that ran, if any.
    pub fn frame(&mut self, now: Instant) -> Result<Option<TickReport>, SessionError> {
        let mut report = None;
        if self.phase == HostPhase::Running && self.scheduler.poll(now) {
            report = Some(self.tick(now)?);
        }

        if let (Some(game), Some(local)) = (self.game.as_ref(), self.local_id.as_ref()) {
            self.renderer.draw(game.snakes(), Some(game.food()), local);
        }
        Ok(report)
    }

    /// Advances the game one step and broadcasts the resulting snapshot.
    ///
    /// Idle eviction and the all-dead check run after the broadcast.
    pub fn tick(&mut self, now: Instant) -> Result<TickReport, SessionError> {
        self.expect_phase(HostPhase::Running)?;

        let inputs = self.registry.take_intents();
        let stepped = match self.game.as_mut() {
            Some(game) => game.step(&inputs),
            None => return Err(self.phase_error(HostPhase::Running)),
        };
        let report = match stepped {
            Ok(report) => report,
            Err(e) => {
                error!("Ending session: {}", e);
                self.phase = HostPhase::Ended;
                return Err(e.into());
            }
        };

        self.broadcast_snapshot();

        if let Some(timeout) = self.config.idle_timeout {
            for id in self.registry.check_timeouts(timeout, now) {
                info!("Evicting idle participant {}", id);
                if let Some(game) = self.game.as_mut() {
                    game.remove_participant(&id);
                }
            }
        }

        if self.config.end_when_all_dead && self.game.as_ref().map_or(false, GameSession::all_dead) {
            info!("All snakes are dead, session over after tick {}", report.tick);
            self.phase = HostPhase::Ended;
        }

        Ok(report)
    }

    /// Leaves the transport and ends the session. Snapshots already sent
    /// may still arrive at clients.
    pub async fn stop(&mut self) {
        if self.attached {
            self.transport.leave().await;
            self.attached = false;
        }
        if self.phase != HostPhase::Ended {
            info!("Host stopped");
        }
        self.phase = HostPhase::Ended;
    }

    /// Drives the session until it ends: transport events, local intents and
    /// frames are all handled on this one task.
    pub async fn run(
        &mut self,
        mut intents: mpsc::UnboundedReceiver<Direction>,
    ) -> Result<(), SessionError> {
        if self.phase == HostPhase::Idle {
            self.host().await?;
        }

        let mut frames = interval(FRAME_INTERVAL.min(self.config.tick_interval));
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut result = Ok(());

        while self.phase != HostPhase::Ended {
            tokio::select! {
                event = self.transport.next_event() => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.handle_event(event, Instant::now()) {
                                result = Err(e);
                                break;
                            }
                        }
                        None => {
                            info!("Transport closed");
                            break;
                        }
                    }
                },

                Some(direction) = intents.recv() => {
                    self.set_local_intent(direction, Instant::now());
                },

                _ = frames.tick() => {
                    if let Err(e) = self.frame(Instant::now()) {
                        result = Err(e);
                        break;
                    }
                },
            }
        }

        self.stop().await;
        result
    }

    fn broadcast_snapshot(&mut self) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        let message = GameMessage::State(game.snapshot());
        match protocol::encode(&message) {
            Ok(payload) => {
                if let Err(e) = self.transport.transmit(payload) {
                    error!("Failed to broadcast tick {}: {}", game.tick(), e);
                }
            }
            Err(e) => error!("Failed to encode snapshot: {}", e),
        }
    }

    fn maybe_start(&mut self, now: Instant) {
        if self.phase == HostPhase::Hosting && self.registry.len() >= self.config.min_participants {
            info!("Starting game with {} participants", self.registry.len());
            self.phase = HostPhase::Running;
            self.scheduler.start(now);
        }
    }

    fn expect_phase(&self, expected: HostPhase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(self.phase_error(expected))
        }
    }

    fn phase_error(&self, expected: HostPhase) -> SessionError {
        SessionError::InvalidPhase {
            expected: expected.as_str(),
            actual: self.phase.as_str(),
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    pub fn session_code(&self) -> Option<&SessionCode> {
        self.code.as_ref()
    }

    pub fn local_id(&self) -> Option<&ParticipantId> {
        self.local_id.as_ref()
    }

    pub fn game(&self) -> Option<&GameSession> {
        self.game.as_ref()
    }

    /// Mutable game access for staging scenarios
    pub fn game_mut(&mut self) -> Option<&mut GameSession> {
        self.game.as_mut()
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::{Cell, FoodItem, FoodKind, LocalRelay, LocalTransport, NullRenderer, TransportError};
    use std::sync::{Arc, Mutex};
    use tokio_test::{assert_err, assert_ok};

    /// Counts draw calls
    struct CountingRenderer(Arc<Mutex<usize>>);

    impl Renderer for CountingRenderer {
        fn draw(
            &mut self,
            _snakes: &std::collections::BTreeMap<ParticipantId, shared::GridSnake>,
            _food: Option<&FoodItem>,
            _local: &ParticipantId,
        ) {
            *self.0.lock().unwrap() += 1;
        }
    }

    fn session(relay: &LocalRelay, config: GameConfig) -> HostSession<LocalTransport> {
        HostSession::new(relay.connect(), Box::new(NullRenderer), config)
    }

    fn drain_states(transport: &mut LocalTransport) -> Vec<shared::Snapshot> {
        let mut states = Vec::new();
        while let Some(event) = transport.try_next_event() {
            if let Ok(GameMessage::State(snapshot)) = protocol::decode(&event.payload) {
                states.push(snapshot);
            }
        }
        states
    }

    #[tokio::test]
    async fn test_host_waits_for_second_participant() {
        let relay = LocalRelay::seeded(1);
        let mut host = session(&relay, GameConfig::default().with_seed(1));
        let code = assert_ok!(host.host().await);
        assert_eq!(host.phase(), HostPhase::Hosting);
        assert_eq!(host.session_code(), Some(&code));

        let mut guest = relay.connect();
        let guest_id = guest.join(&code).await.unwrap();
        let event = host.transport.next_event().await.unwrap();
        assert_ok!(host.handle_event(event, Instant::now()));

        assert_eq!(host.phase(), HostPhase::Running);
        assert!(host.game().unwrap().snake(&guest_id).is_some());

        // the join triggers an immediate snapshot
        let states = drain_states(&mut guest);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].tick, 0);
        assert_eq!(states[0].snakes.len(), 2);
    }

    #[tokio::test]
    async fn test_solo_host_runs_immediately() {
        let relay = LocalRelay::seeded(2);
        let mut host = session(&relay, GameConfig::solo().with_seed(2));
        assert_ok!(host.host().await);
        assert_eq!(host.phase(), HostPhase::Running);
    }

    #[tokio::test]
    async fn test_host_twice_is_invalid_phase() {
        let relay = LocalRelay::seeded(3);
        let mut host = session(&relay, GameConfig::solo());
        host.host().await.unwrap();
        let err = assert_err!(host.host().await);
        assert!(matches!(
            err,
            SessionError::InvalidPhase {
                expected: "idle",
                actual: "running"
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_hosting() {
        let relay = LocalRelay::seeded(4);
        let config = GameConfig {
            tick_interval: Duration::ZERO,
            ..GameConfig::default()
        };
        let mut host = session(&relay, config);
        assert!(matches!(host.host().await, Err(SessionError::Config(_))));
        assert_eq!(host.phase(), HostPhase::Idle);
        assert_eq!(relay.session_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_returns_to_idle() {
        struct RefusingTransport;

        #[async_trait::async_trait]
        impl Transport for RefusingTransport {
            async fn host(&mut self) -> Result<(SessionCode, ParticipantId), TransportError> {
                Err(TransportError::Rejected("relay offline".into()))
            }
            async fn join(&mut self, _code: &SessionCode) -> Result<ParticipantId, TransportError> {
                Err(TransportError::Rejected("relay offline".into()))
            }
            async fn next_event(&mut self) -> Option<TransportEvent> {
                None
            }
            fn try_next_event(&mut self) -> Option<TransportEvent> {
                None
            }
            fn transmit(&mut self, _payload: serde_json::Value) -> Result<(), TransportError> {
                Err(TransportError::NotConnected)
            }
            async fn leave(&mut self) {}
        }

        let mut host = HostSession::new(RefusingTransport, Box::new(NullRenderer), GameConfig::default());
        let err = assert_err!(host.host().await);
        assert!(matches!(err, SessionError::ConnectionFailure(_)));
        assert_eq!(host.phase(), HostPhase::Idle);
    }

    #[tokio::test]
    async fn test_client_inputs_steer_snakes() {
        let relay = LocalRelay::seeded(5);
        let mut host = session(&relay, GameConfig::default().with_seed(5));
        let code = host.host().await.unwrap();
        let mut guest = relay.connect();
        let guest_id = guest.join(&code).await.unwrap();
        let join = host.transport.next_event().await.unwrap();
        host.handle_event(join, Instant::now()).unwrap();
        // keep the food out of the way
        host.game_mut()
            .unwrap()
            .set_food(FoodItem::new(Cell::new(30, 20), FoodKind::Normal));

        guest.transmit(json!({"kind": "input", "direction": "up"})).unwrap();
        guest.transmit(json!({"input": {"x": 0, "y": 1}})).unwrap();
        host.poll_events(Instant::now()).unwrap();

        let report = host.tick(Instant::now()).unwrap();
        assert_eq!(report.tick, 1);
        // last write wins: down
        let head = host.game().unwrap().snake(&guest_id).unwrap().head();
        assert_eq!(head, Some(Cell::new(5, 10)));

        let states = drain_states(&mut guest);
        assert_eq!(states.last().unwrap().tick, 1);
    }

    #[tokio::test]
    async fn test_malformed_and_state_payloads_are_ignored() {
        let relay = LocalRelay::seeded(6);
        let mut host = session(&relay, GameConfig::default().with_seed(6));
        let code = host.host().await.unwrap();
        let mut guest = relay.connect();
        guest.join(&code).await.unwrap();
        let join = host.transport.next_event().await.unwrap();
        host.handle_event(join, Instant::now()).unwrap();

        guest.transmit(json!({"hello": "world"})).unwrap();
        guest.transmit(json!({"input": "sideways"})).unwrap();
        let snapshot = host.game().unwrap().snapshot();
        guest
            .transmit(protocol::encode(&GameMessage::State(snapshot)).unwrap())
            .unwrap();

        assert_eq!(assert_ok!(host.poll_events(Instant::now())), 3);
        assert_eq!(host.phase(), HostPhase::Running);
    }

    #[tokio::test]
    async fn test_leave_removes_participant() {
        let relay = LocalRelay::seeded(7);
        let mut host = session(&relay, GameConfig::default().with_seed(7));
        let code = host.host().await.unwrap();
        let mut guest = relay.connect();
        let guest_id = guest.join(&code).await.unwrap();
        let join = host.transport.next_event().await.unwrap();
        host.handle_event(join, Instant::now()).unwrap();

        guest.leave().await;
        let left = host.transport.next_event().await.unwrap();
        host.handle_event(left, Instant::now()).unwrap();

        assert!(!host.registry().contains(&guest_id));
        let game = host.game().unwrap();
        assert!(game.snake(&guest_id).is_none());
        assert_eq!(game.scoreboard().len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_limits_joins() {
        let relay = LocalRelay::seeded(8);
        let config = GameConfig {
            max_participants: 2,
            ..GameConfig::default().with_seed(8)
        };
        let mut host = session(&relay, config);
        let code = host.host().await.unwrap();

        let mut first = relay.connect();
        let mut second = relay.connect();
        first.join(&code).await.unwrap();
        let late_id = second.join(&code).await.unwrap();
        host.poll_events(Instant::now()).unwrap();

        assert_eq!(host.registry().len(), 2);
        assert!(host.game().unwrap().snake(&late_id).is_none());
    }

    #[tokio::test]
    async fn test_idle_participant_is_evicted() {
        let relay = LocalRelay::seeded(9);
        let config = GameConfig {
            idle_timeout: Some(Duration::from_secs(5)),
            ..GameConfig::default().with_seed(9)
        };
        let mut host = session(&relay, config);
        let code = host.host().await.unwrap();
        let mut guest = relay.connect();
        let guest_id = guest.join(&code).await.unwrap();
        let start = Instant::now();
        let join = host.transport.next_event().await.unwrap();
        host.handle_event(join, start).unwrap();

        host.tick(start + Duration::from_secs(1)).unwrap();
        assert!(host.registry().contains(&guest_id));

        host.tick(start + Duration::from_secs(6)).unwrap();
        assert!(!host.registry().contains(&guest_id));
        assert!(host.game().unwrap().snake(&guest_id).is_none());
        // the host itself is never evicted
        assert_eq!(host.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_frame_gates_ticks_and_draws() {
        let relay = LocalRelay::seeded(10);
        let draws = Arc::new(Mutex::new(0));
        let mut host = HostSession::new(
            relay.connect(),
            Box::new(CountingRenderer(Arc::clone(&draws))),
            GameConfig::solo().with_seed(10),
        );
        host.host().await.unwrap();
        let start = Instant::now();
        host.scheduler.start(start);

        assert!(host.frame(start + Duration::from_millis(16)).unwrap().is_none());
        let report = host.frame(start + Duration::from_millis(120)).unwrap();
        assert_eq!(report.map(|r| r.tick), Some(1));
        assert!(host.frame(start + Duration::from_millis(136)).unwrap().is_none());
        assert_eq!(*draws.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_all_dead_ends_session() {
        let relay = LocalRelay::seeded(11);
        let mut host = session(&relay, GameConfig::solo().with_seed(11));
        host.host().await.unwrap();

        // heading right from (5,5) the wall is 35 ticks away
        let start = Instant::now();
        let mut ticks = 0;
        while host.phase() == HostPhase::Running {
            host.tick(start).unwrap();
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(host.phase(), HostPhase::Ended);
        assert!(host.game().unwrap().all_dead());
        assert!(assert_err!(host.tick(start)).to_string().contains("running"));
    }

    #[tokio::test]
    async fn test_run_loop_ends_when_snakes_die() {
        let relay = LocalRelay::seeded(12);
        let config = GameConfig {
            tick_interval: Duration::from_millis(1),
            ..GameConfig::solo().with_seed(12)
        };
        let mut host = session(&relay, config);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Direction::Up).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(10), host.run(rx)).await;
        assert_ok!(assert_ok!(outcome));
        assert_eq!(host.phase(), HostPhase::Ended);
        assert_eq!(relay.session_count(), 0);
    }
}
